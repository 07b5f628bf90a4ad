//! `<a>`: links, fragment jumps and named destinations.

use crate::css::{property, value, BlockStyle, TextStyle};
use crate::element::{Chunk, Element, LinkTarget, Paragraph};
use crate::error::LayoutCommitError;
use crate::handler::{HandlerContext, HandlerResult, TagHandler};
use crate::output::{ColumnAlign, DeferredWrite, DirectContent, OutputUnit, SimpleColumn};
use crate::tag::{attr, Tag};

use super::chunk_units;

/// Height of the placeholder committed for an empty named anchor.
const PLACEHOLDER_HEIGHT_PX: i32 = 5;
const PLACEHOLDER_LEFT_PX: i32 = 1;
const PLACEHOLDER_RIGHT_PX: i32 = 6;

/// Handler for `<a>` tags.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnchorHandler;

impl TagHandler for AnchorHandler {
    fn on_start(&self, _ctx: &HandlerContext<'_>, tag: &mut Tag) -> HandlerResult {
        if tag.attr(attr::HREF).is_some() {
            tag.style
                .fill_if_absent(property::TEXT_DECORATION, value::UNDERLINE);
            tag.style.fill_if_absent(property::COLOR, value::BLUE);
        }
        Ok(Vec::new())
    }

    fn on_content(&self, _ctx: &HandlerContext<'_>, tag: &Tag, text: &str) -> HandlerResult {
        Ok(chunk_units(tag, text))
    }

    fn on_end(
        &self,
        ctx: &HandlerContext<'_>,
        tag: &Tag,
        accumulated: Vec<OutputUnit>,
    ) -> HandlerResult {
        let name = tag.destination_name();
        if accumulated.is_empty() {
            let Some(name) = name else {
                return Ok(Vec::new());
            };
            log::trace!("Queueing local destination {} with space placeholder", name);
            return Ok(vec![OutputUnit::deferred(LocalDestinationMarker::new(name))]);
        }

        let link = link_target(ctx, tag);
        let mut container = Paragraph::inline(BlockStyle::from_style_map(&tag.style));
        let mut passthrough = Vec::new();
        let mut linked = 0usize;
        for unit in accumulated {
            match unit {
                OutputUnit::Immediate(elements) => {
                    for mut element in elements {
                        if let Some(link) = &link {
                            element.for_each_inline_chunk_mut(&mut |chunk: &mut Chunk| {
                                chunk.link = Some(link.clone());
                                linked += 1;
                            });
                        }
                        container.push(element);
                    }
                }
                deferred @ OutputUnit::Deferred(_) => passthrough.push(deferred),
            }
        }

        let mut out = Vec::with_capacity(2 + passthrough.len());
        if let Some(LinkTarget::LocalDestination(name)) = &link {
            if linked == 0 {
                log::debug!("No text under destination {}; queueing space placeholder", name);
                out.push(OutputUnit::deferred(LocalDestinationMarker::new(name.as_str())));
            }
        }
        if !container.is_empty() {
            out.push(OutputUnit::element(Element::Paragraph(container)));
        }
        out.extend(passthrough);
        Ok(out)
    }

    fn owns_stack(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "anchor"
    }
}

fn link_target(ctx: &HandlerContext<'_>, tag: &Tag) -> Option<LinkTarget> {
    if let Some(href) = tag.attr(attr::HREF) {
        if let Some(fragment) = href.strip_prefix('#') {
            log::trace!("Creating a local goto link to {}", href);
            return Some(LinkTarget::LocalGoto(fragment.to_string()));
        }
        let url = resolve_external_reference(href, ctx.link_root());
        log::trace!("Creating a www link to {}", url);
        return Some(LinkTarget::External(url));
    }
    let name = tag.destination_name()?;
    log::trace!("Setting local destination for {}", name);
    Some(LinkTarget::LocalDestination(name.to_string()))
}

/// Resolve a non-fragment reference against an optional link root.
///
/// Absolute references and a missing or empty root leave `href` untouched.
/// Otherwise root and reference are joined with exactly one `/`.
pub fn resolve_external_reference(href: &str, link_root: Option<&str>) -> String {
    let Some(root) = link_root.filter(|root| !root.is_empty()) else {
        return href.to_string();
    };
    if is_absolute_reference(href) {
        return href.to_string();
    }
    let root = root.strip_suffix('/').unwrap_or(root);
    let rel = href.strip_prefix('/').unwrap_or(href);
    let mut url = String::with_capacity(root.len() + rel.len() + 1);
    url.push_str(root);
    url.push('/');
    url.push_str(rel);
    url
}

/// `scheme:` per RFC 3986, or a protocol-relative `//host` reference.
fn is_absolute_reference(href: &str) -> bool {
    if href.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Deferred write that commits a thin invisible destination marker.
///
/// Viewers may refuse to jump to a zero-height destination, so the marker is
/// a single space laid out in a tiny column at the current write position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalDestinationMarker {
    name: String,
}

impl LocalDestinationMarker {
    /// Create a marker for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Destination name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DeferredWrite for LocalDestinationMarker {
    fn write(
        self: Box<Self>,
        surface: &mut dyn DirectContent,
        vertical_position: i32,
    ) -> Result<(), LayoutCommitError> {
        let chunk = Chunk::new(" ", TextStyle::default())
            .with_link(LinkTarget::LocalDestination(self.name));
        surface.commit_column(SimpleColumn {
            chunks: vec![chunk],
            left: PLACEHOLDER_LEFT_PX,
            top: vertical_position,
            right: PLACEHOLDER_RIGHT_PX,
            bottom: vertical_position + PLACEHOLDER_HEIGHT_PX,
            leading: PLACEHOLDER_HEIGHT_PX,
            align: ColumnAlign::Left,
        })
    }

    fn describe(&self) -> String {
        format!("local destination {}", self.name)
    }
}
