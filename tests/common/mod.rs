#![allow(dead_code)]

use xhtml_stream::{Chunk, Element, OutputUnit};

pub const CHAPTER_LINKS: &str = include_str!("../xhtml/chapter_links.xhtml");

/// Every chunk reachable from immediate units, in reading order.
pub fn chunks(units: &[OutputUnit]) -> Vec<&Chunk> {
    let mut out = Vec::new();
    for unit in units {
        if let Some(elements) = unit.elements() {
            for element in elements {
                collect(element, &mut out);
            }
        }
    }
    out
}

fn collect<'a>(element: &'a Element, out: &mut Vec<&'a Chunk>) {
    match element {
        Element::Chunk(chunk) => out.push(chunk),
        Element::Paragraph(p) => {
            for child in &p.elements {
                collect(child, out);
            }
        }
        Element::LineBreak => {}
    }
}

/// First chunk whose text contains `needle`.
pub fn chunk_containing<'a>(units: &'a [OutputUnit], needle: &str) -> &'a Chunk {
    chunks(units)
        .into_iter()
        .find(|chunk| chunk.text.contains(needle))
        .unwrap_or_else(|| panic!("no chunk containing {:?}", needle))
}
