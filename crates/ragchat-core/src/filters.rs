//! Metadata filters narrowing the retrieval search space.
//!
//! Filters use a fixed key vocabulary and are forwarded verbatim to the
//! retrieval service; the client performs no semantic validation beyond
//! trimming, sanitization and the key vocabulary itself.

use crate::message::SourceDocument;
use crate::sanitize::sanitize;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// The fixed vocabulary of filter keys recognized by the retrieval
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Product,
    DocumentType,
    Model,
    Category,
    Department,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Product,
        FilterKey::DocumentType,
        FilterKey::Model,
        FilterKey::Category,
        FilterKey::Department,
    ];

    /// The wire name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::DocumentType => "document-type",
            Self::Model => "model",
            Self::Category => "category",
            Self::Department => "department",
        }
    }

    /// Parses a wire name. Unrecognized names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.as_str() == raw)
    }
}

/// A validated set of search filters.
///
/// Invariant: no key ever maps to an empty string, and an empty set
/// serializes to an empty JSON object (never to null keys).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: BTreeMap<FilterKey, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter set from raw user fields.
    ///
    /// Each recognized key is included only when its value is non-empty
    /// after sanitization and trimming; unrecognized or empty keys are
    /// silently dropped, never defaulted in as wildcards.
    pub fn apply<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = Self::new();
        for (key, value) in raw {
            if let Some(key) = FilterKey::parse(key) {
                set.insert(key, value);
            }
        }
        set
    }

    /// Inserts one filter value, sanitized and trimmed. Returns whether
    /// the value was kept.
    pub fn insert(&mut self, key: FilterKey, value: &str) -> bool {
        let cleaned = sanitize(value);
        if cleaned.is_empty() {
            return false;
        }
        self.values.insert(key, cleaned);
        true
    }

    pub fn remove(&mut self, key: FilterKey) -> Option<String> {
        self.values.remove(&key)
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }

    /// Computes advisory filter-match diagnostics for one document.
    ///
    /// A key matches when the corresponding document metadata field
    /// contains the filter value as a case-insensitive substring. Keys
    /// with no counterpart metadata field report `false`. The result is
    /// display-time information only and never used to discard
    /// documents; the server's filtering decision is authoritative.
    pub fn match_document(&self, document: &SourceDocument) -> BTreeMap<FilterKey, bool> {
        self.values
            .iter()
            .map(|(key, value)| {
                let matched = metadata_field(document, *key)
                    .map(|field| field.to_lowercase().contains(&value.to_lowercase()))
                    .unwrap_or(false);
                (*key, matched)
            })
            .collect()
    }
}

/// The document metadata field a filter key is checked against, when
/// one exists.
fn metadata_field(document: &SourceDocument, key: FilterKey) -> Option<&str> {
    match key {
        FilterKey::Product => Some(&document.product),
        FilterKey::DocumentType => Some(&document.document_type),
        FilterKey::Model | FilterKey::Category | FilterKey::Department => None,
    }
}

impl Serialize for FilterSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_serializes_to_empty_object() {
        let set = FilterSet::new();
        assert_eq!(serde_json::to_string(&set).unwrap(), "{}");
    }

    #[test]
    fn apply_drops_empty_and_unknown_keys() {
        let set = FilterSet::apply([
            ("product", "  Widget  "),
            ("document-type", ""),
            ("model", "   "),
            ("flavour", "vanilla"),
            ("category", "billing"),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(FilterKey::Product), Some("Widget"));
        assert_eq!(set.get(FilterKey::Category), Some("billing"));
        assert_eq!(set.get(FilterKey::DocumentType), None);
        assert_eq!(set.get(FilterKey::Model), None);
    }

    #[test]
    fn no_key_ever_maps_to_an_empty_string() {
        let mut set = FilterSet::new();
        assert!(!set.insert(FilterKey::Product, "   "));
        assert!(set.is_empty());
        assert!(set.iter().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn values_are_sanitized() {
        let set = FilterSet::apply([("product", "acme<script>x</script>")]);
        let value = set.get(FilterKey::Product).unwrap();
        assert!(!value.to_lowercase().contains("<script"));
    }

    #[test]
    fn serializes_with_wire_key_names() {
        let set = FilterSet::apply([("document-type", "manual"), ("product", "acme")]);
        let json: serde_json::Value = serde_json::to_value(&set).unwrap();
        assert_eq!(json["document-type"], "manual");
        assert_eq!(json["product"], "acme");
    }

    #[test]
    fn match_document_is_case_insensitive_substring() {
        let doc = SourceDocument {
            document_name: "guide.pdf".into(),
            document_type: "User Manual".into(),
            product: "ACME Widget 3000".into(),
            source_uri: "s3://docs/guide.pdf".into(),
            score: 0.5,
            content: None,
        };

        let set = FilterSet::apply([
            ("product", "widget"),
            ("document-type", "policy"),
            ("category", "billing"),
        ]);
        let matches = set.match_document(&doc);

        assert_eq!(matches[&FilterKey::Product], true);
        assert_eq!(matches[&FilterKey::DocumentType], false);
        // No counterpart metadata field: reported as unmatched.
        assert_eq!(matches[&FilterKey::Category], false);
    }
}
