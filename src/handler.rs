//! Tag handler contract.

use crate::config::PipelineOptions;
use crate::error::PipelineError;
use crate::output::OutputUnit;
use crate::tag::Tag;

/// Result of a handler callback.
pub type HandlerResult = Result<Vec<OutputUnit>, PipelineError>;

/// Per-call context passed to handlers.
///
/// Configuration reaches handlers only through this value, never through
/// ambient state.
#[derive(Clone, Copy, Debug)]
pub struct HandlerContext<'a> {
    options: &'a PipelineOptions,
    depth: usize,
}

impl<'a> HandlerContext<'a> {
    /// Create a context over pipeline options.
    pub fn new(options: &'a PipelineOptions) -> Self {
        Self { options, depth: 0 }
    }

    /// Same context at another open-tag depth.
    pub fn at_depth(self, depth: usize) -> Self {
        Self { depth, ..self }
    }

    /// Pipeline options.
    pub fn options(&self) -> &'a PipelineOptions {
        self.options
    }

    /// Configured link root, if any.
    pub fn link_root(&self) -> Option<&'a str> {
        self.options.link_root()
    }

    /// Number of open tags enclosing the current one.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Behavior for one family of tags.
///
/// Handlers must not do geometry-dependent work directly; anything that needs
/// the final vertical write position is returned as a deferred unit.
pub trait TagHandler: Send + Sync {
    /// Called when the tag opens, after its style is resolved.
    ///
    /// May mutate `tag.style`; the change is visible to this tag's content
    /// and to its descendants. Returned units precede any child content.
    fn on_start(&self, _ctx: &HandlerContext<'_>, _tag: &mut Tag) -> HandlerResult {
        Ok(Vec::new())
    }

    /// Called once per text run while this tag is the innermost open tag
    /// (or the innermost tag not flattened by nesting limits).
    fn on_content(&self, ctx: &HandlerContext<'_>, tag: &Tag, text: &str) -> HandlerResult;

    /// Called when the tag closes with every unit accumulated for it.
    ///
    /// Non stack-owning handlers always receive an empty list.
    fn on_end(
        &self,
        ctx: &HandlerContext<'_>,
        tag: &Tag,
        accumulated: Vec<OutputUnit>,
    ) -> HandlerResult;

    /// Whether this tag starts its own accumulation frame.
    fn owns_stack(&self) -> bool;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str {
        "handler"
    }
}
