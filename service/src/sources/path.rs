//! Accessors into parsed JSON documents.
//!
//! A [`PayloadPath`] is written as dot-separated keys, each optionally
//! followed by one or more `[N]` indices:
//!
//! - `legislators`
//! - `results[0].members`
//! - `data.items[2][0]`
//!
//! The empty string addresses the document root.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// One step of a [`PayloadPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed accessor into a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty key at position {0}")]
    EmptyKey(usize),

    #[error("unterminated index at position {0}")]
    UnterminatedIndex(usize),

    #[error("invalid index '{index}' at position {position}")]
    InvalidIndex { index: String, position: usize },

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

impl PayloadPath {
    /// The path addressing the document root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk `value` along this path.
    ///
    /// Returns `None` as soon as a key is missing, an index is out of bounds,
    /// or a segment is applied to a value of the wrong kind.
    #[must_use]
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Key(key) => current.as_object()?.get(key),
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Parse a path expression.
    ///
    /// # Errors
    /// Returns a [`PathError`] describing the first offending position.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        let mut chars = input.char_indices().peekable();
        let mut key = String::new();
        let mut key_start = 0;
        // Set after `]`, where only `.` or another `[` may follow.
        let mut after_index = false;

        if input.is_empty() {
            return Ok(Self::root());
        }

        while let Some((position, ch)) = chars.next() {
            match ch {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(PathError::EmptyKey(key_start));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    key_start = position + 1;
                    if chars.peek().is_none() {
                        return Err(PathError::EmptyKey(key_start));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if segments.is_empty() && position != 0 {
                        return Err(PathError::EmptyKey(key_start));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(inner);
                    }
                    if !closed {
                        return Err(PathError::UnterminatedIndex(position));
                    }
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| PathError::InvalidIndex {
                            index: digits.clone(),
                            position,
                        })?;
                    segments.push(Segment::Index(index));
                    after_index = true;
                }
                ']' => return Err(PathError::UnexpectedChar { ch, position }),
                _ => {
                    if after_index {
                        return Err(PathError::UnexpectedChar { ch, position });
                    }
                    key.push(ch);
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }

        Ok(Self { segments })
    }
}

impl FromStr for PayloadPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PayloadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_string())
    }

    #[test]
    fn parses_nested_index_path() {
        let path = PayloadPath::parse("results[0].members").expect("parse");
        assert_eq!(
            path.segments(),
            &[key("results"), Segment::Index(0), key("members")]
        );
    }

    #[test]
    fn parses_single_key() {
        let path = PayloadPath::parse("legislators").expect("parse");
        assert_eq!(path.segments(), &[key("legislators")]);
    }

    #[test]
    fn empty_string_is_root() {
        let path = PayloadPath::parse("").expect("parse");
        assert!(path.is_root());
        let doc = json!([1, 2]);
        assert_eq!(path.resolve(&doc), Some(&doc));
    }

    #[test]
    fn leading_index_addresses_root_array() {
        let path = PayloadPath::parse("[1].name").expect("parse");
        let doc = json!([{"name": "a"}, {"name": "b"}]);
        assert_eq!(path.resolve(&doc), Some(&json!("b")));
    }

    #[test]
    fn consecutive_indices() {
        let path = PayloadPath::parse("data.items[2][0]").expect("parse");
        assert_eq!(
            path.segments(),
            &[key("data"), key("items"), Segment::Index(2), Segment::Index(0)]
        );
    }

    #[test]
    fn resolves_propublica_shape() {
        let doc = json!({"results": [{"members": [{"id": "A1"}]}]});
        let path = PayloadPath::parse("results[0].members").expect("parse");
        assert_eq!(path.resolve(&doc), Some(&json!([{"id": "A1"}])));
    }

    #[test]
    fn resolve_misses_return_none() {
        let doc = json!({"results": []});
        let cases = ["results[0].members", "missing", "results.members", "results[3]"];
        for case in cases {
            let path = PayloadPath::parse(case).expect("parse");
            assert_eq!(path.resolve(&doc), None, "case '{case}'");
        }
    }

    #[test]
    fn rejects_malformed_paths() {
        let cases = [
            ("a..b", "double dot"),
            (".a", "leading dot"),
            ("a.", "trailing dot"),
            ("a[", "unterminated"),
            ("a[x]", "non-numeric index"),
            ("a[-1]", "negative index"),
            ("a]", "stray bracket"),
            ("a[0]b", "key glued to index"),
        ];
        for (input, desc) in cases {
            assert!(
                PayloadPath::parse(input).is_err(),
                "case '{desc}' ({input}) should fail"
            );
        }
    }

    #[test]
    fn display_round_trips_canonical_form() {
        let path = PayloadPath::parse("results[0].members").expect("parse");
        assert_eq!(path.to_string(), "results[0].members");
    }

    proptest! {
        #[test]
        fn parse_never_panics(input in ".{0,40}") {
            let _ = PayloadPath::parse(&input);
        }

        #[test]
        fn display_then_parse_is_identity(
            keys in prop::collection::vec("[a-z_]{1,8}", 1..5),
            index in prop::option::of(0usize..20),
        ) {
            let mut text = keys.join(".");
            if let Some(i) = index {
                text.push_str(&format!("[{i}]"));
            }
            let parsed = PayloadPath::parse(&text).expect("generated path parses");
            prop_assert_eq!(PayloadPath::parse(&parsed.to_string()).expect("reparse"), parsed);
        }
    }
}
