//! Finished document elements carried by immediate output units.

use crate::css::{BlockStyle, TextStyle};

/// Navigation role attached to a text chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    /// Same-document jump to a named destination.
    LocalGoto(String),
    /// External reference (URL or resolved path).
    External(String),
    /// This chunk is itself a named destination.
    LocalDestination(String),
}

impl LinkTarget {
    /// Target name or reference.
    pub fn value(&self) -> &str {
        match self {
            Self::LocalGoto(v) | Self::External(v) | Self::LocalDestination(v) => v,
        }
    }
}

/// Styled run of text.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Text payload.
    pub text: String,
    /// Applied style.
    pub style: TextStyle,
    /// Optional navigation role.
    pub link: Option<LinkTarget>,
}

impl Chunk {
    /// Create an unlinked chunk.
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            link: None,
        }
    }

    /// Attach a navigation role.
    pub fn with_link(mut self, link: LinkTarget) -> Self {
        self.link = Some(link);
        self
    }
}

/// Container of inline content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    /// Children in reading order.
    pub elements: Vec<Element>,
    /// Applied block style.
    pub style: BlockStyle,
    /// Inline container: no forced line break before or after.
    pub keep_inline: bool,
}

impl Paragraph {
    /// Create a block paragraph.
    pub fn block(style: BlockStyle) -> Self {
        Self {
            elements: Vec::new(),
            style,
            keep_inline: false,
        }
    }

    /// Create a non-splitting inline container.
    pub fn inline(style: BlockStyle) -> Self {
        Self {
            elements: Vec::new(),
            style,
            keep_inline: true,
        }
    }

    /// Append a child element.
    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Whether the container has no children.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Document element ready for placement.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Styled text run.
    Chunk(Chunk),
    /// Paragraph container (block or inline).
    Paragraph(Paragraph),
    /// Explicit line break.
    LineBreak,
}

impl Element {
    /// Visit every chunk in this element, descending into inline containers.
    ///
    /// Block paragraphs are not entered: they are separate reading units.
    pub fn for_each_inline_chunk_mut<F: FnMut(&mut Chunk)>(&mut self, f: &mut F) {
        match self {
            Self::Chunk(chunk) => f(chunk),
            Self::Paragraph(p) if p.keep_inline => {
                for child in &mut p.elements {
                    child.for_each_inline_chunk_mut(f);
                }
            }
            Self::Paragraph(_) | Self::LineBreak => {}
        }
    }

    /// Concatenated text of this element and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Chunk(chunk) => out.push_str(&chunk.text),
            Self::Paragraph(p) => {
                for child in &p.elements {
                    child.collect_text(out);
                }
            }
            Self::LineBreak => out.push('\n'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_chunk_visit_skips_block_paragraphs() {
        let mut inner = Paragraph::inline(BlockStyle::default());
        inner.push(Element::Chunk(Chunk::new("b", TextStyle::default())));
        let mut block = Paragraph::block(BlockStyle::default());
        block.push(Element::Chunk(Chunk::new("c", TextStyle::default())));
        let mut outer = Paragraph::inline(BlockStyle::default());
        outer.push(Element::Chunk(Chunk::new("a", TextStyle::default())));
        outer.push(Element::Paragraph(inner));
        outer.push(Element::Paragraph(block));
        let mut root = Element::Paragraph(outer);

        let mut seen = Vec::new();
        root.for_each_inline_chunk_mut(&mut |chunk| seen.push(chunk.text.clone()));
        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(root.plain_text(), "abc");
    }
}
