//! Expectation patterns and the captures they produce.

use crate::error::Result;
use regex::bytes::Regex;
use std::fmt;
use std::ops::Range;

/// A compiled expectation.
///
/// Patterns are regular expressions matched against raw bytes, so lines that
/// are not valid UTF-8 can still be matched. The empty pattern is special: it
/// means "no response expected" and matches anything at offset zero.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    /// Compile `source`. An empty string yields the empty pattern.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let regex = if source.is_empty() {
            None
        } else {
            Some(Regex::new(&source)?)
        };
        Ok(Self { source, regex })
    }

    /// The pattern that expects nothing.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            regex: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    /// Search `haystack` for the first match.
    pub fn find(&self, haystack: &[u8]) -> Option<Found> {
        let Some(regex) = &self.regex else {
            return Some(Found {
                span: 0..0,
                captures: Captures::default(),
            });
        };
        let caps = regex.captures(haystack)?;
        let whole = caps.get(0)?;
        let groups = (1..caps.len())
            .map(|i| caps.get(i).map(|m| lossy(m.as_bytes())))
            .collect();
        let names = regex
            .capture_names()
            .skip(1)
            .map(|name| name.map(str::to_owned))
            .collect();
        Some(Found {
            span: whole.range(),
            captures: Captures {
                matched: lossy(whole.as_bytes()),
                groups,
                names,
            },
        })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A successful search: where the match sits in the haystack and what it captured.
#[derive(Debug, Clone)]
pub struct Found {
    pub span: Range<usize>,
    pub captures: Captures,
}

/// Text captured by a match.
///
/// Group indices follow regex conventions: group 0 is the whole match
/// ([`matched`](Self::matched)), numbered groups start at 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    matched: String,
    groups: Vec<Option<String>>,
    names: Vec<Option<String>>,
}

impl Captures {
    /// The text of the whole match.
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// The text of group `index` (1-based), if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return Some(&self.matched);
        }
        self.groups.get(index - 1)?.as_deref()
    }

    /// The text of the group called `name`.
    pub fn name(&self, name: &str) -> Option<&str> {
        let index = self
            .names
            .iter()
            .position(|candidate| candidate.as_deref() == Some(name))?;
        self.groups.get(index)?.as_deref()
    }

    /// Number of capture groups, not counting the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over the numbered groups in order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.groups.iter().map(Option::as_deref)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_matches_immediately() {
        let pattern = Pattern::new("").unwrap();
        assert!(pattern.is_empty());
        let found = pattern.find(b"anything").unwrap();
        assert_eq!(found.span, 0..0);
        assert!(found.captures.is_empty());
    }

    #[test]
    fn test_plain_match_has_no_groups() {
        let found = Pattern::new("OK").unwrap().find(b"xxOK").unwrap();
        assert_eq!(found.span, 2..4);
        assert_eq!(found.captures.matched(), "OK");
        assert_eq!(found.captures.len(), 0);
    }

    #[test]
    fn test_numbered_and_named_groups() {
        let pattern = Pattern::new(r"\+CSQ: (?P<rssi>\d+),(\d+)").unwrap();
        let found = pattern.find(b"+CSQ: 21,99").unwrap();
        let caps = found.captures;
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.get(1), Some("21"));
        assert_eq!(caps.get(2), Some("99"));
        assert_eq!(caps.name("rssi"), Some("21"));
        assert_eq!(caps.name("missing"), None);
        assert_eq!(caps.iter().collect::<Vec<_>>(), vec![Some("21"), Some("99")]);
    }

    #[test]
    fn test_optional_group_absent() {
        let found = Pattern::new(r"OK(,(\d))?").unwrap().find(b"OK").unwrap();
        assert_eq!(found.captures.get(1), None);
        assert_eq!(found.captures.get(2), None);
    }

    #[test]
    fn test_no_match() {
        assert!(Pattern::new("ERROR").unwrap().find(b"OK").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Pattern::new("(unclosed").is_err());
    }
}
