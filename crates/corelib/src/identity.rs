//! Object identities and their string form.
//!
//! An identity renders as `name` or `category/name`. Backslash escapes
//! protect `/`, `\`, quotes and control characters:
//!
//! ```text
//! test                 name "test"
//! admin/Properties     category "admin", name "Properties"
//! a\/b                 name "a/b"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub category: String,
}

/// How non-ASCII characters are written by [`Identity::to_string_mode`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ToStringMode {
    /// Keep printable non-ASCII characters as they are.
    #[default]
    Unicode,
    /// Escape every non-ASCII character as `\uXXXX` or `\UXXXXXXXX`.
    Ascii,
}

impl Identity {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }

    pub fn to_string_mode(&self, mode: ToStringMode) -> String {
        let mut out = String::new();
        if !self.category.is_empty() {
            escape_into(&mut out, &self.category, mode);
            out.push('/');
        }
        escape_into(&mut out, &self.name, mode);
        out
    }

    /// Parse the string form of an identity.
    pub fn parse(input: &str) -> Result<Self> {
        let parse_error = |reason: &str| {
            Error::configuration(format!("invalid identity `{}`: {}", input, reason))
        };

        let mut separator = None;
        let mut chars = input.char_indices();
        while let Some((index, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '/' if separator.is_some() => return Err(parse_error("unescaped `/` in name")),
                '/' => separator = Some(index),
                _ => {}
            }
        }

        let (category, name) = match separator {
            Some(index) => (unescape(&input[..index]), unescape(&input[index + 1..])),
            None => (Ok(String::new()), unescape(input)),
        };
        let category = category.map_err(|reason| parse_error(&reason))?;
        let name = name.map_err(|reason| parse_error(&reason))?;
        if name.is_empty() {
            return Err(parse_error("empty name"));
        }
        Ok(Self { name, category })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_mode(ToStringMode::Unicode))
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Identity::parse(s)
    }
}

fn escape_into(out: &mut String, value: &str, mode: ToStringMode) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if c.is_ascii_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c if c.is_ascii() || mode == ToStringMode::Unicode => out.push(c),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push_str(&format!("\\U{:08X}", c as u32)),
        }
    }
}

fn unescape(value: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or("trailing backslash")?;
        let decoded = match escaped {
            '\\' | '/' | '\'' | '"' | '?' => escaped,
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0b}',
            'u' | 'U' => {
                let width = if escaped == 'u' { 4 } else { 8 };
                let digits: String = chars.by_ref().take(width).collect();
                if digits.len() != width {
                    return Err(format!("truncated `\\{}` escape", escaped));
                }
                u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid code point `{}`", digits))?
            }
            other => return Err(format!("unknown escape `\\{}`", other)),
        };
        out.push(decoded);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Identity::parse("test").unwrap(), Identity::new("test", ""));
        assert_eq!(
            Identity::parse("admin/Properties").unwrap(),
            Identity::new("Properties", "admin")
        );
        assert_eq!(Identity::parse("a\\/b").unwrap(), Identity::new("a/b", ""));
        assert_eq!(Identity::parse("/x").unwrap(), Identity::new("x", ""));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Identity::parse("").is_err());
        assert!(Identity::parse("cat/").is_err());
        assert!(Identity::parse("a/b/c").is_err());
        assert!(Identity::parse("bad\\q").is_err());
        assert!(Identity::parse("x\\u12").is_err());
    }

    #[test]
    fn test_escaping_round_trips() {
        let id = Identity::new("tab\there/quote\"", "caf\u{e9}");
        let text = id.to_string();
        assert_eq!(text, "caf\u{e9}/tab\\there\\/quote\\\"");
        assert_eq!(text.parse::<Identity>().unwrap(), id);

        let ascii = id.to_string_mode(ToStringMode::Ascii);
        assert!(ascii.starts_with("caf\\u00E9/"));
        assert_eq!(Identity::parse(&ascii).unwrap(), id);

        let emoji = Identity::new("\u{1F600}", "");
        assert_eq!(emoji.to_string_mode(ToStringMode::Ascii), "\\U0001F600");
    }
}
