//! `<br>`.

use crate::element::Element;
use crate::handler::{HandlerContext, HandlerResult, TagHandler};
use crate::output::OutputUnit;
use crate::tag::Tag;

/// Emits an explicit line break when the tag opens.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineBreakHandler;

impl TagHandler for LineBreakHandler {
    fn on_start(&self, _ctx: &HandlerContext<'_>, _tag: &mut Tag) -> HandlerResult {
        Ok(vec![OutputUnit::element(Element::LineBreak)])
    }

    fn on_content(&self, _ctx: &HandlerContext<'_>, _tag: &Tag, _text: &str) -> HandlerResult {
        Ok(Vec::new())
    }

    fn on_end(
        &self,
        _ctx: &HandlerContext<'_>,
        _tag: &Tag,
        _accumulated: Vec<OutputUnit>,
    ) -> HandlerResult {
        Ok(Vec::new())
    }

    fn owns_stack(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "line-break"
    }
}
