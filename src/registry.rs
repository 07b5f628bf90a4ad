//! Tag name to handler dispatch.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::handler::TagHandler;
use crate::handlers::{
    AnchorHandler, IgnoreHandler, InlineHandler, LineBreakHandler, ParagraphHandler,
};

/// Maps lowercased tag names to handlers, with a fallback for unknown tags.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn TagHandler>>,
    fallback: Arc<dyn TagHandler>,
}

impl HandlerRegistry {
    /// Empty registry; every tag resolves to an inline pass-through handler.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            fallback: Arc::new(InlineHandler),
        }
    }

    /// Registry with the built-in XHTML handlers.
    pub fn html_default() -> Self {
        let mut registry = Self::new();
        let block: Arc<dyn TagHandler> = Arc::new(ParagraphHandler);
        let inline: Arc<dyn TagHandler> = Arc::new(InlineHandler);
        let ignore: Arc<dyn TagHandler> = Arc::new(IgnoreHandler);
        registry.register("a", Arc::new(AnchorHandler));
        registry.register("br", Arc::new(LineBreakHandler));
        for tag in [
            "p",
            "div",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "li",
            "blockquote",
            "pre",
            "figcaption",
            "section",
            "article",
        ] {
            registry.register(tag, Arc::clone(&block));
        }
        for tag in [
            "span", "b", "strong", "i", "em", "cite", "var", "dfn", "u", "ins", "s", "strike",
            "del", "code", "kbd", "samp", "tt", "small", "sup", "sub",
        ] {
            registry.register(tag, Arc::clone(&inline));
        }
        for tag in ["script", "style", "head", "title", "noscript"] {
            registry.register(tag, Arc::clone(&ignore));
        }
        registry
    }

    /// Register (or replace) the handler for `tag`.
    pub fn register(&mut self, tag: &str, handler: Arc<dyn TagHandler>) {
        self.handlers.insert(tag.to_ascii_lowercase(), handler);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(mut self, tag: &str, handler: Arc<dyn TagHandler>) -> Self {
        self.register(tag, handler);
        self
    }

    /// Replace the fallback handler for unregistered tags.
    pub fn with_fallback(mut self, handler: Arc<dyn TagHandler>) -> Self {
        self.fallback = handler;
        self
    }

    /// Handler registered for `tag`, if any.
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn TagHandler>> {
        self.handlers.get(tag)
    }

    /// Handler for `tag`, falling back for unregistered names.
    pub fn resolve(&self, tag: &str) -> Arc<dyn TagHandler> {
        self.handlers
            .get(tag)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Handler used for unregistered tags and text outside any tag.
    pub fn fallback(&self) -> &Arc<dyn TagHandler> {
        &self.fallback
    }

    /// Whether `tag` has an explicit registration.
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::html_default()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(k, v)| (k, v.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_dispatches_by_family() {
        let registry = HandlerRegistry::html_default();
        assert_eq!(registry.resolve("a").name(), "anchor");
        assert_eq!(registry.resolve("h3").name(), "paragraph");
        assert_eq!(registry.resolve("strong").name(), "inline");
        assert_eq!(registry.resolve("script").name(), "ignore");
        assert_eq!(registry.resolve("br").name(), "line-break");
    }

    #[test]
    fn unknown_tags_use_fallback() {
        let registry = HandlerRegistry::html_default();
        assert!(!registry.contains("marquee"));
        let handler = registry.resolve("marquee");
        assert_eq!(handler.name(), "inline");
        assert!(!handler.owns_stack());
    }

    #[test]
    fn registration_is_case_insensitive_and_replaces() {
        let registry = HandlerRegistry::new().with_handler("A", Arc::new(IgnoreHandler));
        assert_eq!(registry.resolve("a").name(), "ignore");
        let registry = registry.with_handler("a", Arc::new(AnchorHandler));
        assert_eq!(registry.resolve("a").name(), "anchor");
    }
}
