//! Parameter grammar for inclusion markers and partial defaults.
//!
//! Assignment lists look like `key1="value one" key2="value \"two\""`. Values
//! are always wrapped in double quotes; single quotes inside a value are
//! literal characters.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::error::ParamError;

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*)\s*\}\}").expect("Invalid placeholder regex")
});

/// Ordered parameter assignments with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments(IndexMap<String, String>);

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a value, returning the previous one for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer these assignments over `defaults`; keys present here win.
    pub fn over(&self, defaults: &Assignments) -> Assignments {
        let mut bound = defaults.clone();
        for (key, value) in self.iter() {
            bound.insert(key, value);
        }
        bound
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Assignments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between assignments; `separated` is false right after a closing quote
    Outside { separated: bool },
    InKey,
    ExpectQuote,
    InValue,
    Escaped,
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-')
}

/// Parse a whitespace-separated list of `key="value"` assignments.
///
/// `\"` and `\\` inside a value are unescaped; any other backslash is kept.
pub fn parse_assignments(input: &str) -> Result<Assignments, ParamError> {
    let malformed = || ParamError::Malformed {
        input: input.to_string(),
    };

    let mut assignments = Assignments::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut state = State::Outside { separated: true };

    for c in input.chars() {
        state = match state {
            State::Outside { separated } => {
                if c.is_whitespace() {
                    State::Outside { separated: true }
                } else if !separated {
                    return Err(malformed());
                } else if c == '"' || c == '\'' {
                    return Err(ParamError::MissingKey {
                        input: input.to_string(),
                    });
                } else if is_key_start(c) {
                    key.push(c);
                    State::InKey
                } else {
                    return Err(malformed());
                }
            }
            State::InKey => {
                if is_key_char(c) {
                    key.push(c);
                    State::InKey
                } else if c == '=' {
                    State::ExpectQuote
                } else {
                    return Err(malformed());
                }
            }
            State::ExpectQuote => match c {
                '"' => State::InValue,
                '\'' => {
                    return Err(ParamError::SingleQuoted {
                        input: input.to_string(),
                    })
                }
                _ => return Err(malformed()),
            },
            State::InValue => match c {
                '\\' => State::Escaped,
                '"' => {
                    let k = std::mem::take(&mut key);
                    if assignments.0.contains_key(&k) {
                        return Err(ParamError::DuplicateKey {
                            key: k,
                            input: input.to_string(),
                        });
                    }
                    assignments.insert(k, std::mem::take(&mut value));
                    State::Outside { separated: false }
                }
                _ => {
                    value.push(c);
                    State::InValue
                }
            },
            State::Escaped => {
                match c {
                    '"' | '\\' => value.push(c),
                    _ => {
                        value.push('\\');
                        value.push(c);
                    }
                }
                State::InValue
            }
        };
    }

    match state {
        State::Outside { .. } => Ok(assignments),
        State::InKey | State::ExpectQuote => Err(malformed()),
        State::InValue | State::Escaped => Err(ParamError::Unterminated {
            input: input.to_string(),
        }),
    }
}

/// Parse a single double-quoted value such as `"This is a 'string'"`.
pub fn parse_quoted_value(input: &str) -> Result<String, ParamError> {
    let trimmed = input.trim();
    if trimmed.starts_with('\'') {
        return Err(ParamError::SingleQuoted {
            input: input.to_string(),
        });
    }
    if !trimmed.starts_with('"') {
        return Err(ParamError::Malformed {
            input: input.to_string(),
        });
    }

    let assignments = parse_assignments(&format!("value={trimmed}")).map_err(|e| match e {
        ParamError::Malformed { .. } => ParamError::Malformed {
            input: input.to_string(),
        },
        _ => ParamError::Unterminated {
            input: input.to_string(),
        },
    })?;
    Ok(assignments.get("value").unwrap_or_default().to_string())
}

/// Render assignments in the form [`parse_assignments`] accepts.
pub fn serialize_assignments(assignments: &Assignments) -> String {
    assignments
        .iter()
        .map(|(key, value)| {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            format!("{key}=\"{escaped}\"")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A parsed `(!path key="value"!)` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    /// Target path, relative to the version root
    pub path: String,
    pub params: Assignments,
}

impl Inclusion {
    /// Parse a complete marker. Surrounding whitespace is ignored.
    pub fn parse(marker: &str) -> Result<Self, ParamError> {
        let not_inclusion = || ParamError::NotInclusion {
            input: marker.to_string(),
        };

        let inner = marker
            .trim()
            .strip_prefix("(!")
            .and_then(|rest| rest.strip_suffix("!)"))
            .ok_or_else(not_inclusion)?
            .trim();

        let (path, params) = match inner.split_once(char::is_whitespace) {
            Some((path, params)) => (path, params),
            None => (inner, ""),
        };
        if path.is_empty() || path.contains(['"', '\'', '=']) {
            return Err(not_inclusion());
        }

        Ok(Self {
            path: path.to_string(),
            params: parse_assignments(params)?,
        })
    }
}

/// Find the byte ranges of inclusion markers in `text`.
///
/// A marker ends at the first `!)` that is not inside a double-quoted value.
pub fn find_markers(text: &str) -> Vec<std::ops::Range<usize>> {
    let bytes = text.as_bytes();
    let mut markers = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find("(!") {
        let start = pos + found;
        let mut i = start + 2;
        let mut in_quote = false;
        let mut end = None;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' if in_quote => i += 1,
                b'"' => in_quote = !in_quote,
                b'\n' => break,
                b'!' if !in_quote && bytes.get(i + 1) == Some(&b')') => {
                    end = Some(i + 2);
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        match end {
            Some(end) => {
                markers.push(start..end);
                pos = end;
            }
            None => pos = start + 2,
        }
    }
    markers
}

/// A partial's first-line defaults block, split from its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSource<'a> {
    pub defaults: Assignments,
    /// Source following the defaults block (the whole source if there is none)
    pub body: &'a str,
}

/// Split a `{{ key="value" }}` defaults block from the first line of `source`.
///
/// A first line wrapped in `{{ }}` that is not a valid assignment list is not
/// a defaults block and stays part of the body.
pub fn split_defaults(source: &str) -> Result<PartialSource<'_>, ParamError> {
    if source.is_empty() {
        return Err(ParamError::EmptySource);
    }

    let first_len = source.find('\n').map_or(source.len(), |i| i + 1);
    let first = source[..first_len].trim();

    let block = first
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .and_then(|inner| parse_assignments(inner.trim()).ok());

    Ok(match block {
        Some(defaults) => PartialSource {
            defaults,
            body: &source[first_len..],
        },
        None => PartialSource {
            defaults: Assignments::new(),
            body: source,
        },
    })
}

/// Parse only the defaults of a partial.
pub fn parse_defaults(source: &str) -> Result<Assignments, ParamError> {
    split_defaults(source).map(|partial| partial.defaults)
}

/// Replace `{{ name }}` placeholders with bound values.
///
/// Returns the substituted text and the names of placeholders left unbound,
/// which stay in the text verbatim.
pub fn substitute_placeholders(text: &str, bound: &Assignments) -> (String, Vec<String>) {
    let mut unbound = Vec::new();
    let substituted = PLACEHOLDER_REGEX.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match bound.get(name) {
            Some(value) => value.to_string(),
            None => {
                if !unbound.iter().any(|n| n == name) {
                    unbound.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });
    (substituted.into_owned(), unbound)
}
