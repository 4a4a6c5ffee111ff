//! Go struct tag parsing.
//!
//! A tag is a space separated list of `key:"value"` pairs. Keys are any run
//! of non-space, non-control characters other than `:` and `"`, so route
//! prefix keys such as `@get` are valid keys.

use std::fmt;

/// Parsed struct tag, entries kept in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag {
    entries: Vec<(String, String)>,
}

impl StructTag {
    /// First value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tag syntax error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    pub offset: usize,
    pub reason: &'static str,
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.offset)
    }
}

impl std::error::Error for TagError {}

/// Parse the unquoted content of a struct tag.
pub fn parse_tag(raw: &str) -> Result<StructTag, TagError> {
    let bytes = raw.as_bytes();
    let mut entries = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let key_start = i;
        while i < bytes.len()
            && bytes[i] > b' '
            && bytes[i] != b':'
            && bytes[i] != b'"'
            && bytes[i] != 0x7f
        {
            i += 1;
        }
        if i == key_start {
            return Err(TagError {
                offset: i,
                reason: "expected tag key",
            });
        }
        if i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            return Err(TagError {
                offset: i,
                reason: "expected `:\"` after tag key",
            });
        }
        let key = &raw[key_start..i];
        i += 2;

        let value_start = i;
        while i < bytes.len() && bytes[i] != b'"' {
            if bytes[i] == b'\\' {
                i += 1;
            }
            i += 1;
        }
        if i >= bytes.len() {
            return Err(TagError {
                offset: value_start,
                reason: "unterminated tag value",
            });
        }
        let value = unescape(&raw[value_start..i]);
        i += 1;

        entries.push((key.to_string(), value));
    }

    Ok(StructTag { entries })
}

/// Resolve the escapes of a Go interpreted string body.
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
