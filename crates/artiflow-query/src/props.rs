use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pattern::split_with_escape;

/// How a comma inside a property value is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommaMode {
    /// `k=a,b` is one property whose value is `a,b`.
    Join,
    /// `k=a,b` is two properties, `k=a` and `k=b`.
    Split,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key:   String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key:   key.into(),
            value: value.into(),
        }
    }
}

/// Ordered `key=value` list parsed from `k1=v1;k2=v2`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    /// Parses `;`-separated `key=value` entries. `\` escapes `;`, `,` and `=`.
    ///
    /// ```
    /// use artiflow_query::{CommaMode, Properties};
    ///
    /// let props = Properties::parse("a=1,2;b=x", CommaMode::Split).unwrap();
    /// assert_eq!(props.len(), 3);
    /// assert_eq!(props.to_string(), "a=1;a=2;b=x");
    /// ```
    pub fn parse(input: &str, mode: CommaMode) -> Result<Self> {
        let mut properties = Vec::new();
        for entry in split_raw(input, ';') {
            if entry.is_empty() {
                continue;
            }
            let Some(idx) = find_unescaped(&entry, '=') else {
                return Err(Error::InvalidProperty(entry));
            };
            let key = unescape(&entry[..idx]);
            if key.trim().is_empty() {
                return Err(Error::InvalidProperty(entry));
            }
            let raw_value = &entry[idx + 1..];
            match mode {
                CommaMode::Join => properties.push(Property::new(key, unescape(raw_value))),
                CommaMode::Split => {
                    for value in split_with_escape(raw_value, ',') {
                        properties.push(Property::new(key.clone(), value));
                    }
                }
            }
        }
        Ok(Self(properties))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn push(&mut self, property: Property) { self.0.push(property); }

    /// URL-escaped `k=v` pairs joined by `;`, for the storage API.
    pub fn to_encoded_string(&self) -> String {
        self.0
            .iter()
            .map(|p| format!("{}={}", query_escape(&p.key), query_escape(&p.value)))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// `;k=v` matrix parameters appended to a deploy URL.
    pub fn to_matrix_params(&self) -> String {
        self.0
            .iter()
            .map(|p| format!(";{}={}", query_escape(&p.key), query_escape(&p.value)))
            .collect()
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}={}", p.key, p.value)?;
        }
        Ok(())
    }
}

impl From<Vec<Property>> for Properties {
    fn from(value: Vec<Property>) -> Self { Self(value) }
}

impl IntoIterator for Properties {
    type Item = Property;
    type IntoIter = std::vec::IntoIter<Property>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

/// Comma-joined, URL-escaped property keys for a delete request.
pub fn encode_delete_keys(keys: &str) -> String {
    keys.split(',')
        .filter(|k| !k.is_empty())
        .map(query_escape)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn query_escape(value: &str) -> String { url::form_urlencoded::byte_serialize(value.as_bytes()).collect() }

/// Splits on `separator` but keeps escape sequences in place so later
/// stages can still see escaped `=` and `,`.
fn split_raw(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            if c != separator {
                current.push('\\');
            }
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
}

fn find_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == needle => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(input: &str) -> String { split_with_escape(input, '\0').concat() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_commas() {
        let props = Properties::parse("a=1,2;b=x=y", CommaMode::Join).unwrap();
        let collected: Vec<_> = props.iter().cloned().collect();
        assert_eq!(collected, vec![Property::new("a", "1,2"), Property::new("b", "x=y")]);
    }

    #[test]
    fn test_parse_escapes() {
        let props = Properties::parse(r"a=1\;2;b\=c=3;d=4\,5", CommaMode::Split).unwrap();
        let collected: Vec<_> = props.into_iter().collect();
        assert_eq!(
            collected,
            vec![
                Property::new("a", "1;2"),
                Property::new("b=c", "3"),
                Property::new("d", "4,5"),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_missing_value_separator() {
        assert!(matches!(
            Properties::parse("a=1;broken", CommaMode::Join),
            Err(Error::InvalidProperty(p)) if p == "broken"
        ));
        assert!(Properties::parse("=1", CommaMode::Join).is_err());
        assert!(Properties::parse("", CommaMode::Join).unwrap().is_empty());
    }

    #[test]
    fn test_encoding() {
        let props = Properties::parse("build name=my build;v=1/2", CommaMode::Join).unwrap();
        assert_eq!(props.to_encoded_string(), "build+name=my+build;v=1%2F2");
        assert_eq!(props.to_matrix_params(), ";build+name=my+build;v=1%2F2");
        assert_eq!(encode_delete_keys("a,b c"), "a,b+c");
    }
}
