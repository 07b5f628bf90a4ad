//! Block containers: `p`, `div`, headings, list items, quotes, `pre`.

use crate::css::{property, value, BlockStyle, BASE_FONT_SIZE_PX};
use crate::element::{Element, Paragraph};
use crate::handler::{HandlerContext, HandlerResult, TagHandler};
use crate::output::OutputUnit;
use crate::tag::Tag;

use super::chunk_units;

/// Handler wrapping its children in one splitting block paragraph.
///
/// Deferred children that arrive before any content are emitted ahead of
/// the paragraph so their write position is the block's top; the rest
/// follow the paragraph.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParagraphHandler;

impl TagHandler for ParagraphHandler {
    fn on_start(&self, _ctx: &HandlerContext<'_>, tag: &mut Tag) -> HandlerResult {
        if let Some(level) = heading_level(&tag.name) {
            let size = BASE_FONT_SIZE_PX * heading_scale(level);
            tag.style
                .fill_if_absent(property::FONT_SIZE, &format!("{}px", size.round() as i32));
            tag.style.fill_if_absent(property::FONT_WEIGHT, value::BOLD);
            tag.style.fill_if_absent(property::MARGIN_TOP, "0.67em");
            tag.style.fill_if_absent(property::MARGIN_BOTTOM, "0.67em");
        } else if tag.name == "pre" {
            tag.style.fill_if_absent(property::FONT_FAMILY, value::MONOSPACE);
            tag.style.fill_if_absent(property::WHITE_SPACE, value::PRE);
        } else if tag.name == "p" {
            tag.style.fill_if_absent(property::MARGIN_BOTTOM, "1em");
        }
        Ok(Vec::new())
    }

    fn on_content(&self, _ctx: &HandlerContext<'_>, tag: &Tag, text: &str) -> HandlerResult {
        Ok(chunk_units(tag, text))
    }

    fn on_end(
        &self,
        _ctx: &HandlerContext<'_>,
        tag: &Tag,
        accumulated: Vec<OutputUnit>,
    ) -> HandlerResult {
        let mut paragraph = Paragraph::block(BlockStyle::from_style_map(&tag.style));
        let mut leading = Vec::new();
        let mut trailing = Vec::new();
        for unit in accumulated {
            match unit {
                OutputUnit::Immediate(elements) => paragraph.elements.extend(elements),
                deferred @ OutputUnit::Deferred(_) => {
                    if paragraph.is_empty() {
                        leading.push(deferred);
                    } else {
                        trailing.push(deferred);
                    }
                }
            }
        }
        let mut out = leading;
        if !paragraph.is_empty() {
            out.push(OutputUnit::element(Element::Paragraph(paragraph)));
        }
        out.extend(trailing);
        Ok(out)
    }

    fn owns_stack(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "paragraph"
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn heading_scale(level: u8) -> f32 {
    match level {
        1 => 2.0,
        2 => 1.5,
        3 => 1.17,
        4 => 1.0,
        5 => 0.83,
        _ => 0.67,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineOptions;
    use crate::css::TextStyle;
    use crate::element::Chunk;
    use crate::handlers::LocalDestinationMarker;
    use crate::tag::Attributes;

    fn text_unit(text: &str) -> OutputUnit {
        OutputUnit::element(Element::Chunk(Chunk::new(text, TextStyle::default())))
    }

    #[test]
    fn heading_gets_default_size_and_weight() {
        let opts = PipelineOptions::default();
        let ctx = HandlerContext::new(&opts);
        let mut tag = Tag::new("h1", Attributes::new());
        ParagraphHandler.on_start(&ctx, &mut tag).expect("start");
        assert_eq!(tag.style.get(property::FONT_SIZE), Some("32px"));
        assert_eq!(tag.style.get(property::FONT_WEIGHT), Some("bold"));
    }

    #[test]
    fn children_become_one_block_paragraph() {
        let opts = PipelineOptions::default();
        let ctx = HandlerContext::new(&opts);
        let tag = Tag::new("p", Attributes::new());
        let out = ParagraphHandler
            .on_end(&ctx, &tag, vec![text_unit("a"), text_unit("b")])
            .expect("end");
        assert_eq!(out.len(), 1);
        match out[0].elements() {
            Some([Element::Paragraph(p)]) => {
                assert!(!p.keep_inline);
                assert_eq!(p.elements.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deferred_children_bracket_the_paragraph() {
        let opts = PipelineOptions::default();
        let ctx = HandlerContext::new(&opts);
        let tag = Tag::new("p", Attributes::new());
        let out = ParagraphHandler
            .on_end(
                &ctx,
                &tag,
                vec![
                    OutputUnit::deferred(LocalDestinationMarker::new("top")),
                    text_unit("a"),
                    OutputUnit::deferred(LocalDestinationMarker::new("mid")),
                    text_unit("b"),
                ],
            )
            .expect("end");
        let kinds: Vec<bool> = out.iter().map(OutputUnit::is_deferred).collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn empty_paragraph_emits_nothing() {
        let opts = PipelineOptions::default();
        let ctx = HandlerContext::new(&opts);
        let tag = Tag::new("div", Attributes::new());
        assert!(ParagraphHandler
            .on_end(&ctx, &tag, Vec::new())
            .expect("end")
            .is_empty());
    }
}
