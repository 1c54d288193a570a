//! Query parameters captured from the upgrade request.

use std::collections::HashMap;

/// Decoded `key=value` pairs from a connection URL's query string.
///
/// Repeated keys keep the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    /// Parses a raw (still percent-encoded) query string.
    pub fn parse(raw: &str) -> Self {
        Self(
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the value for `key` if present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Interprets `key` as a boolean flag (`true`/`1`, case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decodes_percent_escapes() {
        let q = QueryParams::parse(
            "room=R1&username=alice&deckUrl=https%3A%2F%2Farchidekt.com%2Fdecks%2F1",
        );
        assert_eq!(q.get("room"), Some("R1"));
        assert_eq!(q.get("username"), Some("alice"));
        assert_eq!(q.get("deckUrl"), Some("https://archidekt.com/decks/1"));
    }

    #[test]
    fn test_non_empty_skips_blank_values() {
        let q = QueryParams::parse("room=&username=bob");
        assert_eq!(q.get("room"), Some(""));
        assert_eq!(q.non_empty("room"), None);
        assert_eq!(q.non_empty("username"), Some("bob"));
    }

    #[test]
    fn test_flag() {
        let q = QueryParams::parse("spectator=TRUE&other=0");
        assert!(q.flag("spectator"));
        assert!(!q.flag("other"));
        assert!(!q.flag("missing"));
    }
}
