//! Scanning of JSX-style component tags inside HTML blocks.

use crate::ast::{AttrValue, Attribute};

/// An opening tag found at the start of some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    /// Bytes consumed, including the final `>`
    pub len: usize,
}

/// Scan an opening tag (`<Name attr="x">` or `<Name />`) at the start of `text`.
///
/// Attribute values may span lines and contain `>` inside quotes or braces.
pub fn scan_open_tag(text: &str) -> Option<OpenTag> {
    let rest = text.strip_prefix('<')?;
    let name_len = tag_name_len(rest)?;
    let name = rest[..name_len].to_string();

    let bytes = text.as_bytes();
    let mut pos = 1 + name_len;
    let mut attributes = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                return Some(OpenTag {
                    name,
                    attributes,
                    self_closing: false,
                    len: pos + 1,
                });
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                return Some(OpenTag {
                    name,
                    attributes,
                    self_closing: true,
                    len: pos + 2,
                });
            }
            _ => {}
        }

        let (attribute, consumed) = scan_attribute(&text[pos..])?;
        attributes.push(attribute);
        pos += consumed;
    }
}

/// Match a line consisting only of a closing tag, returning the tag name.
pub fn closing_tag(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix("</")?.strip_suffix('>')?.trim_end();
    let len = tag_name_len(inner)?;
    (len == inner.len()).then_some(inner)
}

/// Length of a tag name at the start of `text`.
fn tag_name_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let len = chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
        .map_or(text.len(), |(i, _)| i);
    Some(len)
}

fn scan_attribute(text: &str) -> Option<(Attribute, usize)> {
    let bytes = text.as_bytes();
    let name_end = text
        .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
        .unwrap_or(text.len());
    if name_end == 0 {
        return None;
    }
    let name = text[..name_end].to_string();

    if bytes.get(name_end) != Some(&b'=') {
        return Some((
            Attribute {
                name,
                value: AttrValue::Flag,
            },
            name_end,
        ));
    }

    let value_start = name_end + 1;
    match bytes.get(value_start)? {
        quote @ (b'"' | b'\'') => {
            let close = text[value_start + 1..].find(*quote as char)?;
            let value = &text[value_start + 1..value_start + 1 + close];
            Some((
                Attribute {
                    name,
                    value: AttrValue::Literal(value.to_string()),
                },
                value_start + close + 2,
            ))
        }
        b'{' => {
            let close = matching_brace(&text[value_start..])?;
            let value = &text[value_start + 1..value_start + close];
            Some((
                Attribute {
                    name,
                    value: AttrValue::Expression(value.to_string()),
                },
                value_start + close + 1,
            ))
        }
        _ => None,
    }
}

/// Index of the brace closing the one at the start of `text`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Render attributes as they appear inside a tag, with a leading space.
pub fn format_attributes(attributes: &[Attribute]) -> String {
    let mut out = String::new();
    for attribute in attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        match &attribute.value {
            AttrValue::Literal(value) if value.contains('"') => {
                out.push_str(&format!("='{value}'"));
            }
            AttrValue::Literal(value) => out.push_str(&format!("=\"{value}\"")),
            AttrValue::Expression(expr) => out.push_str(&format!("={{{expr}}}")),
            AttrValue::Flag => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_tag_with_attributes() {
        let tag = scan_open_tag(r#"<Details title="Set up" opened scope={["cloud"]}>rest"#).unwrap();

        assert_eq!(tag.name, "Details");
        assert!(!tag.self_closing);
        assert_eq!(
            tag.attributes,
            vec![
                Attribute::literal("title", "Set up"),
                Attribute {
                    name: "opened".to_string(),
                    value: AttrValue::Flag,
                },
                Attribute {
                    name: "scope".to_string(),
                    value: AttrValue::Expression(r#"["cloud"]"#.to_string()),
                },
            ]
        );
        assert_eq!(&r#"<Details title="Set up" opened scope={["cloud"]}>rest"#[tag.len..], "rest");
    }

    #[test]
    fn scans_self_closing_tag_over_lines() {
        let tag = scan_open_tag("<Image\n  src=\"a.png\"\n/>").unwrap();

        assert!(tag.self_closing);
        assert_eq!(tag.attributes, vec![Attribute::literal("src", "a.png")]);
    }

    #[test]
    fn rejects_non_tags() {
        assert!(scan_open_tag("<!-- comment -->").is_none());
        assert!(scan_open_tag("< spaced>").is_none());
        assert!(scan_open_tag("<Unclosed attr=\"x\"").is_none());
    }

    #[test]
    fn matches_closing_tags() {
        assert_eq!(closing_tag("</Details>"), Some("Details"));
        assert_eq!(closing_tag("  </Tabs >"), Some("Tabs"));
        assert_eq!(closing_tag("</Details> trailing"), None);
    }

    #[test]
    fn formats_attributes() {
        let attributes = vec![
            Attribute::literal("title", "A"),
            Attribute::literal("quote", "say \"hi\""),
            Attribute {
                name: "n".to_string(),
                value: AttrValue::Expression("1".to_string()),
            },
        ];

        assert_eq!(
            format_attributes(&attributes),
            r#" title="A" quote='say "hi"' n={1}"#
        );
    }
}
