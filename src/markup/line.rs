//! Per-line compilation: alignment prefix, inline tags, embedded elements.
//!
//! Lines are parsed in two phases. The scanner walks the line once,
//! producing text runs and embedded-element directives while tracking
//! emphasis; assembly then turns the runs into directives. Emphasis is a
//! line-level property: a line containing any `<b>` span prints emphasized.

use super::CompileOptions;
use crate::error::{ImageError, MarkupError};
use crate::job::PrintDirective;
use crate::protocol::text::Alignment;
use crate::render::RasterBitmap;

/// Default QR module size in dots when `size` is absent.
const DEFAULT_QR_SIZE: u8 = 4;

/// Default barcode height in dots when `height` is absent (about 8mm).
const DEFAULT_BARCODE_HEIGHT: u8 = 64;

/// Default barcode symbology when `type` is absent.
const DEFAULT_BARCODE_TYPE: &str = "ean13";

/// Compile one markup line into zero or more directives.
pub(super) fn compile_line(
    line: &str,
    options: &CompileOptions,
) -> Result<Vec<PrintDirective>, MarkupError> {
    let (align, rest) = take_alignment(line);

    // Rule lines: nothing but dashes (three or more).
    let trimmed = rest.trim();
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return Ok(vec![PrintDirective::Rule]);
    }

    let scan = scan_line(rest, options)?;

    let mut out = Vec::new();
    for item in scan.items {
        match item {
            Item::Text(content) => {
                if !content.trim().is_empty() {
                    out.push(PrintDirective::AlignedText {
                        align,
                        bold: scan.saw_bold,
                        content,
                    });
                }
            }
            Item::Element(directive) => out.push(directive),
        }
    }

    // A genuinely empty line advances the paper. A line whose only element
    // was an optional image that got skipped prints nothing at all.
    if out.is_empty() && !scan.had_element && !scan.saw_bold {
        out.push(PrintDirective::LineFeed);
    }

    Ok(out)
}

/// Strip a leading `[L]`/`[C]`/`[R]` alignment tag. Default is left.
fn take_alignment(line: &str) -> (Alignment, &str) {
    match column_tag(line) {
        Some(align) => (align, &line[3..]),
        None => (Alignment::Left, line),
    }
}

/// Recognize an alignment/column tag at the start of `s`.
fn column_tag(s: &str) -> Option<Alignment> {
    let bytes = s.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'[' && bytes[2] == b']' {
        match bytes[1] {
            b'L' => Some(Alignment::Left),
            b'C' => Some(Alignment::Center),
            b'R' => Some(Alignment::Right),
            _ => None,
        }
    } else {
        None
    }
}

enum Item {
    Text(String),
    Element(PrintDirective),
}

struct LineScan {
    items: Vec<Item>,
    saw_bold: bool,
    had_element: bool,
}

/// Walk the line content, splitting text runs from inline tags.
///
/// Column tags inside the line are column breaks: the tag is consumed and
/// the following text is appended verbatim to the same run, preserving the
/// literal padding the markup carries.
fn scan_line(content: &str, options: &CompileOptions) -> Result<LineScan, MarkupError> {
    let mut items = Vec::new();
    let mut text = String::new();
    let mut saw_bold = false;
    let mut bold_open = false;
    let mut had_element = false;
    let mut rest = content;

    while !rest.is_empty() {
        if column_tag(rest).is_some() {
            // Column break: alignment of the run is fixed by the line's
            // leading tag; the column text follows with its own padding.
            rest = &rest[3..];
            continue;
        }

        if is_tag_start(rest) {
            let (tag, after) = take_tag(rest)?;
            rest = after;
            match tag {
                Tag::Open { name, attrs } => match name.as_str() {
                    "b" => {
                        if !attrs.is_empty() {
                            return Err(MarkupError::UnknownTag(name));
                        }
                        saw_bold = true;
                        bold_open = true;
                    }
                    "img" | "qrcode" | "barcode" => {
                        had_element = true;
                        let (payload, after_close) = take_element_body(rest, &name)?;
                        rest = after_close;
                        if !text.is_empty() {
                            items.push(Item::Text(std::mem::take(&mut text)));
                        }
                        if let Some(directive) = element(&name, &attrs, payload, options)? {
                            items.push(Item::Element(directive));
                        }
                    }
                    _ => return Err(MarkupError::UnknownTag(name)),
                },
                Tag::Close(name) => match name.as_str() {
                    "b" if bold_open => bold_open = false,
                    _ => return Err(MarkupError::UnknownTag(format!("/{name}"))),
                },
            }
            continue;
        }

        // Literal character.
        if let Some(ch) = rest.chars().next() {
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    if bold_open {
        return Err(MarkupError::UnterminatedTag("b".to_string()));
    }
    if !text.is_empty() {
        items.push(Item::Text(text));
    }

    Ok(LineScan {
        items,
        saw_bold,
        had_element,
    })
}

/// A `<` opens a tag only when followed by a name or `/`; a lone `<` in
/// receipt text stays literal.
fn is_tag_start(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/')
}

#[derive(Debug)]
enum Tag {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close(String),
}

/// Parse the tag at the start of `s` (which begins with `<`), returning the
/// tag and the remainder after `>`.
fn take_tag(s: &str) -> Result<(Tag, &str), MarkupError> {
    let inner = &s[1..];
    let Some(end) = inner.find('>') else {
        let name: String = inner
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        return Err(MarkupError::UnterminatedTag(name));
    };
    let body = &inner[..end];
    let rest = &inner[end + 1..];

    if let Some(name) = body.strip_prefix('/') {
        return Ok((Tag::Close(name.to_string()), rest));
    }

    let (name, attr_text) = match body.find(char::is_whitespace) {
        Some(split) => (&body[..split], body[split..].trim()),
        None => (body, ""),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MarkupError::UnknownTag(body.to_string()));
    }

    let attrs = parse_attrs(attr_text)
        .ok_or_else(|| MarkupError::UnknownTag(name.to_string()))?;
    Ok((
        Tag::Open {
            name: name.to_string(),
            attrs,
        },
        rest,
    ))
}

/// Parse `name='value'` attribute pairs. Returns `None` on malformed input.
fn parse_attrs(mut s: &str) -> Option<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            return Some(attrs);
        }
        let eq = s.find('=')?;
        let name = s[..eq].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let value_part = s[eq + 1..].strip_prefix('\'')?;
        let close = value_part.find('\'')?;
        attrs.push((name.to_string(), value_part[..close].to_string()));
        s = &value_part[close + 1..];
    }
}

/// Consume the body of an embedded element up to its close tag.
fn take_element_body<'a>(s: &'a str, name: &str) -> Result<(&'a str, &'a str), MarkupError> {
    let close = format!("</{name}>");
    let Some(pos) = s.find(&close) else {
        return Err(MarkupError::UnterminatedTag(name.to_string()));
    };
    Ok((&s[..pos], &s[pos + close.len()..]))
}

/// Build the directive for one embedded element.
///
/// Returns `None` only for an empty `<img>` payload under the optional-image
/// policy.
fn element(
    name: &str,
    attrs: &[(String, String)],
    payload: &str,
    options: &CompileOptions,
) -> Result<Option<PrintDirective>, MarkupError> {
    match name {
        "img" => {
            if !attrs.is_empty() {
                return Err(MarkupError::UnknownTag(name.to_string()));
            }
            let payload = payload.trim();
            if payload.is_empty() {
                if options.image_optional {
                    return Ok(None);
                }
                return Err(MarkupError::Image(ImageError::InvalidImage(
                    "empty image payload".to_string(),
                )));
            }
            Ok(Some(PrintDirective::RasterImage(RasterBitmap::from_hex(
                payload,
            )?)))
        }
        "qrcode" => {
            let mut size = DEFAULT_QR_SIZE;
            for (attr, value) in attrs {
                match attr.as_str() {
                    "size" => {
                        size = value
                            .parse()
                            .map_err(|_| MarkupError::UnknownTag(name.to_string()))?;
                    }
                    _ => return Err(MarkupError::UnknownTag(name.to_string())),
                }
            }
            Ok(Some(PrintDirective::QrCode {
                data: payload.to_string(),
                size,
            }))
        }
        "barcode" => {
            let mut symbology = DEFAULT_BARCODE_TYPE.to_string();
            let mut height = DEFAULT_BARCODE_HEIGHT;
            for (attr, value) in attrs {
                match attr.as_str() {
                    "type" => symbology = value.to_lowercase(),
                    "height" => {
                        height = value
                            .parse()
                            .map_err(|_| MarkupError::UnknownTag(name.to_string()))?;
                    }
                    _ => return Err(MarkupError::UnknownTag(name.to_string())),
                }
            }
            Ok(Some(PrintDirective::Barcode {
                symbology,
                data: payload.to_string(),
                height,
            }))
        }
        _ => Err(MarkupError::UnknownTag(name.to_string())),
    }
}

// ============================================================================
// TESTS
// ============================================================================
