//! Inline phrasing tags and the fallback for unregistered tags.

use crate::css::{parse_inline_style, parse_length_px, property, value, BASE_FONT_SIZE_PX};
use crate::handler::{HandlerContext, HandlerResult, TagHandler};
use crate::output::OutputUnit;
use crate::tag::{attr, Tag};

use super::chunk_units;

/// Handler for inline tags. Does not own a frame: its text flows into the
/// nearest owning ancestor.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineHandler;

impl TagHandler for InlineHandler {
    fn on_start(&self, _ctx: &HandlerContext<'_>, tag: &mut Tag) -> HandlerResult {
        let explicit_size = tag
            .attr(attr::STYLE)
            .and_then(|raw| parse_inline_style(raw).ok())
            .is_some_and(|inline| inline.contains(property::FONT_SIZE));
        let style = &mut tag.style;
        match tag.name.as_str() {
            "b" | "strong" => {
                style.fill_if_absent(property::FONT_WEIGHT, value::BOLD);
            }
            "i" | "em" | "cite" | "var" | "dfn" => {
                style.fill_if_absent(property::FONT_STYLE, value::ITALIC);
            }
            "u" | "ins" => {
                style.fill_if_absent(property::TEXT_DECORATION, value::UNDERLINE);
            }
            "s" | "strike" | "del" => {
                style.fill_if_absent(property::TEXT_DECORATION, value::LINE_THROUGH);
            }
            "code" | "kbd" | "samp" | "tt" => {
                style.fill_if_absent(property::FONT_FAMILY, value::MONOSPACE);
            }
            "small" if !explicit_size => {
                let current = style
                    .get(property::FONT_SIZE)
                    .and_then(|v| parse_length_px(v, BASE_FONT_SIZE_PX))
                    .unwrap_or(BASE_FONT_SIZE_PX);
                let smaller = format!("{}px", (current * 0.83).round() as i32);
                style.set(property::FONT_SIZE, smaller);
            }
            _ => {}
        }
        Ok(Vec::new())
    }

    fn on_content(&self, _ctx: &HandlerContext<'_>, tag: &Tag, text: &str) -> HandlerResult {
        Ok(chunk_units(tag, text))
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
        "inline"
    }
}
