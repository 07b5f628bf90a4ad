//! Pipeline options and configuration provider lookup.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provider key for the base path/URL prepended to relative link references.
pub const GLOBAL_LINK_ROOT: &str = "GLOBAL_LINK_ROOT";

/// Key/value configuration lookup threaded through the pipeline.
pub trait ConfigProvider: Send + Sync {
    /// Look up a configuration value by key.
    fn get(&self, key: &str) -> Option<&str>;
}

/// In-memory configuration provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapConfigProvider {
    values: BTreeMap<String, String>,
}

impl MapConfigProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous one.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ConfigProvider for MapConfigProvider {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Hard limits applied by the pipeline driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Maximum open-tag depth. Deeper tags are flattened into their ancestor.
    pub max_nesting: usize,
    /// Max bytes allowed for a single inline `style="..."` attribute payload.
    pub max_inline_style_bytes: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_nesting: 64,
            max_inline_style_bytes: 16 * 1024,
        }
    }
}

/// Pipeline driver options.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Hard limits.
    pub limits: PipelineLimits,
    /// Optional configuration provider. `None` disables link-root prefixing.
    pub provider: Option<Arc<dyn ConfigProvider>>,
}

impl PipelineOptions {
    /// Attach a configuration provider.
    pub fn with_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attach a provider holding only [`GLOBAL_LINK_ROOT`].
    pub fn with_link_root(self, root: impl Into<String>) -> Self {
        let provider = MapConfigProvider::new().with_value(GLOBAL_LINK_ROOT, root);
        self.with_provider(Arc::new(provider))
    }

    /// Override limits.
    pub fn with_limits(mut self, limits: PipelineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Configured link root, when a provider is present and has the key.
    pub fn link_root(&self) -> Option<&str> {
        self.provider
            .as_deref()
            .and_then(|provider| provider.get(GLOBAL_LINK_ROOT))
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("limits", &self.limits)
            .field("has_provider", &self.provider.is_some())
            .field("link_root", &self.link_root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_root_absent_without_provider() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.link_root(), None);
    }

    #[test]
    fn link_root_absent_when_provider_lacks_key() {
        let provider = MapConfigProvider::new().with_value("OTHER", "x");
        let opts = PipelineOptions::default().with_provider(Arc::new(provider));
        assert_eq!(opts.link_root(), None);
    }

    #[test]
    fn link_root_reads_provider_value() {
        let opts = PipelineOptions::default().with_link_root("https://example.com/");
        assert_eq!(opts.link_root(), Some("https://example.com/"));
    }
}
