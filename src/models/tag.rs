//! Tag maps and precedence-aware merging
//!
//! Tables, fields and views carry tags as an unordered key/value map. A `BTreeMap` is used
//! so rendering and serialization are deterministic.
//!
//! Older project files stored tags as a list of strings. Those entries are parsed with
//! [`Tag`] and folded into the map at load time:
//! - Simple: `"pii"` becomes `pii = ""`
//! - Pair: `"owner:data-team"` becomes `owner = "data-team"`
//! - List: `"domains:[sales, finance]"` becomes `domains = "sales,finance"`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tag map attached to schema entities
pub type TagMap = BTreeMap<String, String>;

/// Merge two tag maps where `overrides` wins on key collision.
///
/// Keys only present in `base` are inherited; keys present in both keep the value from
/// `overrides`. Neither input is modified.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::tag::{merge_tags, TagMap};
///
/// let pk: TagMap = [("pii".to_string(), "false".to_string()), ("domain".to_string(), "sales".to_string())].into();
/// let fk: TagMap = [("pii".to_string(), "true".to_string())].into();
///
/// let merged = merge_tags(&pk, &fk);
/// assert_eq!(merged["pii"], "true");
/// assert_eq!(merged["domain"], "sales");
/// ```
pub fn merge_tags(base: &TagMap, overrides: &TagMap) -> TagMap {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// A single legacy list-form tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Bare keyword (e.g., "pii")
    Simple(String),
    /// `key:value` (e.g., "owner:data-team")
    Pair(String, String),
    /// `key:[v1, v2]` (e.g., "domains:[sales, finance]")
    List(String, Vec<String>),
}

impl Tag {
    /// Convert into a map entry.
    pub fn into_entry(self) -> (String, String) {
        match self {
            Tag::Simple(key) => (key, String::new()),
            Tag::Pair(key, value) => (key, value),
            Tag::List(key, values) => (key, values.join(",")),
        }
    }
}

impl FromStr for Tag {
    type Err = ();

    /// Parse a legacy tag string.
    ///
    /// Anything that is not a clean pair or list (for example several colons without
    /// brackets) degrades to a Simple tag instead of failing. Only blank input is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(());
        }

        let Some((key, rest)) = s.split_once(':') else {
            return Ok(Tag::Simple(s.to_string()));
        };
        let key = key.trim();
        let rest = rest.trim();

        if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let values: Vec<String> = inner
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if !key.is_empty() && !values.is_empty() {
                return Ok(Tag::List(key.to_string(), values));
            }
        } else if !rest.contains(':') && !key.is_empty() && !rest.is_empty() {
            return Ok(Tag::Pair(key.to_string(), rest.to_string()));
        }

        Ok(Tag::Simple(s.to_string()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Simple(s) => write!(f, "{}", s),
            Tag::Pair(key, value) => write!(f, "{}:{}", key, value),
            Tag::List(key, values) => write!(f, "{}:[{}]", key, values.join(", ")),
        }
    }
}

/// Fold legacy tag strings into a map; later entries overwrite earlier ones.
pub fn tags_from_legacy_list<'a, I>(entries: I) -> TagMap
where
    I: IntoIterator<Item = &'a str>,
{
    entries
        .into_iter()
        .filter_map(|entry| Tag::from_str(entry).ok())
        .map(Tag::into_entry)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn merge_keeps_override_values() {
        let base = map(&[("a", "1"), ("b", "2")]);
        let overrides = map(&[("b", "own"), ("c", "3")]);
        let merged = merge_tags(&base, &overrides);
        assert_eq!(merged, map(&[("a", "1"), ("b", "own"), ("c", "3")]));
    }

    #[test]
    fn merge_with_empty_sides() {
        let base = map(&[("a", "1")]);
        assert_eq!(merge_tags(&base, &TagMap::new()), base);
        assert_eq!(merge_tags(&TagMap::new(), &base), base);
    }

    #[test]
    fn parses_legacy_forms() {
        assert_eq!(Tag::from_str("pii").unwrap(), Tag::Simple("pii".into()));
        assert_eq!(
            Tag::from_str("owner:data-team").unwrap(),
            Tag::Pair("owner".into(), "data-team".into())
        );
        assert_eq!(
            Tag::from_str("domains:[sales,  finance ]").unwrap(),
            Tag::List("domains".into(), vec!["sales".into(), "finance".into()])
        );
        assert_eq!(
            Tag::from_str("a:b:c").unwrap(),
            Tag::Simple("a:b:c".into())
        );
        assert!(Tag::from_str("  ").is_err());
    }

    #[test]
    fn legacy_list_to_map() {
        let tags = tags_from_legacy_list(["pii", "owner:data-team", "domains:[a, b]", ""]);
        assert_eq!(
            tags,
            map(&[("pii", ""), ("owner", "data-team"), ("domains", "a,b")])
        );
    }

    #[test]
    fn display_round_trips_list() {
        let tag = Tag::List("k".into(), vec!["x".into(), "y".into()]);
        assert_eq!(tag.to_string(), "k:[x, y]");
    }
}
