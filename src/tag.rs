//! Parsed markup tag context.

use std::collections::BTreeMap;

use crate::css::StyleMap;

/// Attribute names the pipeline and its handlers read.
pub mod attr {
    /// Link target reference.
    pub const HREF: &str = "href";
    /// Named destination.
    pub const NAME: &str = "name";
    /// Element identifier, used as a destination name when `name` is absent.
    pub const ID: &str = "id";
    /// Inline style declarations.
    pub const STYLE: &str = "style";
    /// Space separated class list.
    pub const CLASS: &str = "class";
}

/// Attribute map with ASCII-lowercased keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<String, String>,
}

impl Attributes {
    /// Create an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute. The key is lowercased; later values replace earlier ones.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up an attribute. `key` is matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key.bytes().any(|b| b.is_ascii_uppercase()) {
            return self
                .values
                .get(&key.to_ascii_lowercase())
                .map(String::as_str);
        }
        self.values.get(key).map(String::as_str)
    }

    /// Whether an attribute is present (possibly with an empty value).
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k.as_ref(), v);
        }
        attrs
    }
}

/// One open markup element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased local tag name.
    pub name: String,
    /// Source attributes.
    pub attributes: Attributes,
    /// Resolved style. Populated by the cascade, mutable during `on_start`.
    pub style: StyleMap,
    /// Whether whitespace inside this tag is preserved (preformatted context).
    pub preserve_whitespace: bool,
}

impl Tag {
    /// Create a tag with a lowercased name.
    pub fn new(name: &str, attributes: Attributes) -> Self {
        Self {
            name: local_name(name).to_ascii_lowercase(),
            attributes,
            style: StyleMap::new(),
            preserve_whitespace: false,
        }
    }

    /// Shorthand for an attribute lookup.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// Destination name: `name`, falling back to `id`.
    pub fn destination_name(&self) -> Option<&str> {
        self.attr(attr::NAME)
            .or_else(|| self.attr(attr::ID))
            .filter(|name| !name.is_empty())
    }

    /// Whether this tag name opens a preformatted context.
    pub fn is_preformatted(&self) -> bool {
        matches!(
            self.name.as_str(),
            "pre" | "code" | "kbd" | "samp" | "textarea"
        )
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_keys_are_case_normalized() {
        let attrs = Attributes::new().with("HREF", "#top").with("Name", "x");
        assert_eq!(attrs.get("href"), Some("#top"));
        assert_eq!(attrs.get("HREF"), Some("#top"));
        assert_eq!(attrs.get("name"), Some("x"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn tag_name_drops_namespace_prefix() {
        let tag = Tag::new("xhtml:A", Attributes::new());
        assert_eq!(tag.name, "a");
    }

    #[test]
    fn destination_name_prefers_name_over_id() {
        let both = Tag::new("a", Attributes::new().with("id", "i").with("name", "n"));
        assert_eq!(both.destination_name(), Some("n"));
        let id_only = Tag::new("a", Attributes::new().with("id", "i"));
        assert_eq!(id_only.destination_name(), Some("i"));
        let empty = Tag::new("a", Attributes::new().with("name", ""));
        assert_eq!(empty.destination_name(), None);
    }
}
