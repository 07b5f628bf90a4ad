//! Non-rendered tags such as `script`, `style` and `head`.

use crate::handler::{HandlerContext, HandlerResult, TagHandler};
use crate::output::OutputUnit;
use crate::tag::Tag;

/// Swallows its text and everything its descendants produce.
///
/// Owns a frame so descendant output is captured and then dropped; deferred
/// units inside an ignored subtree never run.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreHandler;

impl TagHandler for IgnoreHandler {
    fn on_content(&self, _ctx: &HandlerContext<'_>, _tag: &Tag, _text: &str) -> HandlerResult {
        Ok(Vec::new())
    }

    fn on_end(
        &self,
        _ctx: &HandlerContext<'_>,
        tag: &Tag,
        accumulated: Vec<OutputUnit>,
    ) -> HandlerResult {
        if !accumulated.is_empty() {
            log::debug!(
                "Dropping {} output units inside <{}>",
                accumulated.len(),
                tag.name
            );
        }
        Ok(Vec::new())
    }

    fn owns_stack(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "ignore"
    }
}
