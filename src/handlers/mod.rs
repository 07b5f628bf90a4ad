//! Built-in tag handlers.

mod anchor;
mod ignore;
mod inline;
mod line_break;
mod paragraph;

pub use anchor::{resolve_external_reference, AnchorHandler, LocalDestinationMarker};
pub use ignore::IgnoreHandler;
pub use inline::InlineHandler;
pub use line_break::LineBreakHandler;
pub use paragraph::ParagraphHandler;

use crate::css::TextStyle;
use crate::element::{Chunk, Element};
use crate::output::OutputUnit;
use crate::sanitize::sanitize_inline;
use crate::tag::Tag;

/// Turn a text run into at most one styled chunk unit.
///
/// Whitespace is collapsed unless the tag sits in a preformatted context.
/// Whitespace-only runs produce nothing in either case.
pub(crate) fn chunk_units(tag: &Tag, text: &str) -> Vec<OutputUnit> {
    if text.chars().all(|c| c.is_ascii_whitespace()) {
        return Vec::new();
    }
    let sanitized = if tag.preserve_whitespace {
        text.to_string()
    } else {
        sanitize_inline(text)
    };
    if sanitized.is_empty() {
        return Vec::new();
    }
    let style = TextStyle::from_style_map(&tag.style);
    vec![OutputUnit::element(Element::Chunk(Chunk::new(
        sanitized, style,
    )))]
}
