//! Cache key encoding.
//!
//! Keys have the shape `{collection}:{id}:{fingerprint}`. Listings use id `0`.
//! The fingerprint is `{status}:{tag,tag,...}` when any filter applies and the
//! empty string otherwise. Every key of a collection shares the
//! `{collection}:` prefix, which is what invalidation deletes by.

use std::fmt;

/// Entity collections with their own key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    News,
    Tag,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Tag => "tag",
        }
    }

    /// Namespace shared by every key of this collection.
    pub fn prefix(self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query filter as seen by the key encoder.
///
/// Tag names keep caller order. Empty status and empty tag names are dropped
/// on construction, so `[""]` and "no tags" produce the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    status: Option<String>,
    tags: Vec<String>,
}

impl FilterSpec {
    pub fn new<S, I, T>(status: Option<S>, tags: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let status = status
            .map(Into::<String>::into)
            .filter(|value| !value.is_empty());
        let tags = tags
            .into_iter()
            .map(Into::<String>::into)
            .filter(|name| !name.is_empty())
            .collect();
        Self { status, tags }
    }

    /// Filter matching every record.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.tags.is_empty()
    }

    pub fn fingerprint(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(
            "{}:{}",
            self.status.as_deref().unwrap_or_default(),
            self.tags.join(",")
        )
    }
}

/// Fully encoded cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn encode(collection: Collection, id: i64, filter: &FilterSpec) -> Self {
        Self(format!(
            "{}{}:{}",
            collection.prefix(),
            id,
            filter.fingerprint()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn belongs_to(&self, collection: Collection) -> bool {
        self.0.starts_with(&collection.prefix())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(collection: Collection, id: i64, filter: &FilterSpec) -> String {
        CacheKey::encode(collection, id, filter).as_str().to_string()
    }

    #[test]
    fn listing_without_filter() {
        assert_eq!(key(Collection::News, 0, &FilterSpec::none()), "news:0:");
        assert_eq!(key(Collection::Tag, 0, &FilterSpec::none()), "tag:0:");
    }

    #[test]
    fn single_record_key() {
        assert_eq!(key(Collection::News, 7, &FilterSpec::none()), "news:7:");
    }

    #[test]
    fn status_only_filter() {
        let filter = FilterSpec::new(Some("draft"), Vec::<String>::new());
        assert_eq!(key(Collection::News, 0, &filter), "news:0:draft:");
    }

    #[test]
    fn tags_only_filter() {
        let filter = FilterSpec::new(None::<String>, ["Topic1", "Topic2"]);
        assert_eq!(key(Collection::News, 0, &filter), "news:0::Topic1,Topic2");
    }

    #[test]
    fn status_and_tags_filter() {
        let filter = FilterSpec::new(Some("publish"), ["Topic1"]);
        assert_eq!(key(Collection::News, 0, &filter), "news:0:publish:Topic1");
    }

    #[test]
    fn single_empty_tag_matches_no_filter() {
        let empty = FilterSpec::new(None::<String>, [""]);
        assert_eq!(empty, FilterSpec::none());
        assert_eq!(key(Collection::News, 0, &empty), "news:0:");

        let with_status = FilterSpec::new(Some("draft"), [""]);
        let status_only = FilterSpec::new(Some("draft"), Vec::<String>::new());
        assert_eq!(
            key(Collection::News, 0, &with_status),
            key(Collection::News, 0, &status_only)
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let first = FilterSpec::new(Some("draft"), ["a", "b"]);
        let second = FilterSpec::new(Some("draft".to_string()), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            CacheKey::encode(Collection::News, 0, &first),
            CacheKey::encode(Collection::News, 0, &second)
        );
    }

    #[test]
    fn tag_order_is_significant() {
        let forward = FilterSpec::new(None::<String>, ["a", "b"]);
        let reversed = FilterSpec::new(None::<String>, ["b", "a"]);
        assert_ne!(
            key(Collection::News, 0, &forward),
            key(Collection::News, 0, &reversed)
        );
    }

    #[test]
    fn keys_carry_collection_prefix() {
        let news = CacheKey::encode(Collection::News, 3, &FilterSpec::none());
        assert!(news.belongs_to(Collection::News));
        assert!(!news.belongs_to(Collection::Tag));
        assert_eq!(Collection::Tag.prefix(), "tag:");
    }
}
