//! JSON snapshots of rendered documents.
//!
//! The IR stays serde-free; these mirror types carry the wire shape and a
//! schema version so stale snapshots are rejected instead of misread.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::render_ir::{
    AnnotationRect, DestinationRef, DrawCommand, PageAnnotation, PageAnnotationKind, RectCommand,
    RenderDocument, RenderPage, ResolvedTextStyle, RuleCommand, TextCommand,
};

const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

impl RenderDocument {
    /// Serialize pages and destinations to a versioned JSON snapshot.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&PersistedDocumentEnvelope::from_document(self))
    }

    /// Load a snapshot written by [`to_json`](Self::to_json).
    ///
    /// Returns `None` for malformed payloads or a schema version mismatch.
    pub fn from_json(payload: &str) -> Option<Self> {
        let envelope: PersistedDocumentEnvelope = serde_json::from_str(payload).ok()?;
        envelope.into_document()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedDocumentEnvelope {
    version: u8,
    pages: Vec<PersistedRenderPage>,
    #[serde(default)]
    destinations: BTreeMap<String, PersistedDestination>,
}

impl PersistedDocumentEnvelope {
    fn from_document(doc: &RenderDocument) -> Self {
        Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            pages: doc.pages.iter().map(PersistedRenderPage::from).collect(),
            destinations: doc
                .destinations
                .iter()
                .map(|(name, dest)| (name.clone(), PersistedDestination::from(*dest)))
                .collect(),
        }
    }

    fn into_document(self) -> Option<RenderDocument> {
        if self.version != SNAPSHOT_SCHEMA_VERSION {
            log::debug!(
                "Rejecting render snapshot version {} (expected {})",
                self.version,
                SNAPSHOT_SCHEMA_VERSION
            );
            return None;
        }
        Some(RenderDocument {
            pages: self.pages.into_iter().map(RenderPage::from).collect(),
            destinations: self
                .destinations
                .into_iter()
                .map(|(name, dest)| (name, dest.into()))
                .collect(),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedRenderPage {
    page_number: usize,
    content_commands: Vec<PersistedDrawCommand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<PersistedPageAnnotation>,
}

impl From<&RenderPage> for PersistedRenderPage {
    fn from(page: &RenderPage) -> Self {
        Self {
            page_number: page.page_number,
            content_commands: page
                .content_commands
                .iter()
                .map(PersistedDrawCommand::from)
                .collect(),
            annotations: page
                .annotations
                .iter()
                .map(PersistedPageAnnotation::from)
                .collect(),
        }
    }
}

impl From<PersistedRenderPage> for RenderPage {
    fn from(value: PersistedRenderPage) -> Self {
        Self {
            page_number: value.page_number,
            content_commands: value
                .content_commands
                .into_iter()
                .map(DrawCommand::from)
                .collect(),
            annotations: value
                .annotations
                .into_iter()
                .map(PageAnnotation::from)
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct PersistedDestination {
    page_number: usize,
    x: i32,
    y: i32,
}

impl From<DestinationRef> for PersistedDestination {
    fn from(value: DestinationRef) -> Self {
        Self {
            page_number: value.page_number,
            x: value.x,
            y: value.y,
        }
    }
}

impl From<PersistedDestination> for DestinationRef {
    fn from(value: PersistedDestination) -> Self {
        Self {
            page_number: value.page_number,
            x: value.x,
            y: value.y,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedPageAnnotation {
    kind: String,
    value: Option<String>,
    #[serde(default)]
    area: PersistedRect,
}

impl From<&PageAnnotation> for PersistedPageAnnotation {
    fn from(value: &PageAnnotation) -> Self {
        Self {
            kind: value.kind.as_str().to_string(),
            value: value.value.clone(),
            area: PersistedRect {
                x: value.area.x,
                y: value.area.y,
                width: value.area.width,
                height: value.area.height,
            },
        }
    }
}

impl From<PersistedPageAnnotation> for PageAnnotation {
    fn from(value: PersistedPageAnnotation) -> Self {
        Self {
            kind: PageAnnotationKind::from(value.kind),
            value: value.value,
            area: AnnotationRect {
                x: value.area.x,
                y: value.area.y,
                width: value.area.width,
                height: value.area.height,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
struct PersistedRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum PersistedDrawCommand {
    Text(PersistedTextCommand),
    Rule(PersistedRuleCommand),
    Rect(PersistedRectCommand),
}

impl From<&DrawCommand> for PersistedDrawCommand {
    fn from(value: &DrawCommand) -> Self {
        match value {
            DrawCommand::Text(cmd) => Self::Text(cmd.into()),
            DrawCommand::Rule(cmd) => Self::Rule((*cmd).into()),
            DrawCommand::Rect(cmd) => Self::Rect((*cmd).into()),
        }
    }
}

impl From<PersistedDrawCommand> for DrawCommand {
    fn from(value: PersistedDrawCommand) -> Self {
        match value {
            PersistedDrawCommand::Text(cmd) => Self::Text(cmd.into()),
            PersistedDrawCommand::Rule(cmd) => Self::Rule(cmd.into()),
            PersistedDrawCommand::Rect(cmd) => Self::Rect(cmd.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedTextCommand {
    x: i32,
    baseline_y: i32,
    text: String,
    style: PersistedResolvedTextStyle,
}

impl From<&TextCommand> for PersistedTextCommand {
    fn from(value: &TextCommand) -> Self {
        Self {
            x: value.x,
            baseline_y: value.baseline_y,
            text: value.text.clone(),
            style: (&value.style).into(),
        }
    }
}

impl From<PersistedTextCommand> for TextCommand {
    fn from(value: PersistedTextCommand) -> Self {
        Self {
            x: value.x,
            baseline_y: value.baseline_y,
            text: value.text,
            style: value.style.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedResolvedTextStyle {
    family: String,
    weight: u16,
    italic: bool,
    size_px: f32,
    line_height: f32,
    letter_spacing: f32,
    #[serde(default)]
    color: [u8; 3],
}

impl From<&ResolvedTextStyle> for PersistedResolvedTextStyle {
    fn from(value: &ResolvedTextStyle) -> Self {
        Self {
            family: value.family.to_string(),
            weight: value.weight,
            italic: value.italic,
            size_px: value.size_px,
            line_height: value.line_height,
            letter_spacing: value.letter_spacing,
            color: value.color,
        }
    }
}

impl From<PersistedResolvedTextStyle> for ResolvedTextStyle {
    fn from(value: PersistedResolvedTextStyle) -> Self {
        Self {
            family: Arc::from(value.family),
            weight: value.weight,
            italic: value.italic,
            size_px: value.size_px,
            line_height: value.line_height,
            letter_spacing: value.letter_spacing,
            color: value.color,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct PersistedRuleCommand {
    x: i32,
    y: i32,
    length: u32,
    thickness: u32,
    horizontal: bool,
}

impl From<RuleCommand> for PersistedRuleCommand {
    fn from(value: RuleCommand) -> Self {
        Self {
            x: value.x,
            y: value.y,
            length: value.length,
            thickness: value.thickness,
            horizontal: value.horizontal,
        }
    }
}

impl From<PersistedRuleCommand> for RuleCommand {
    fn from(value: PersistedRuleCommand) -> Self {
        Self {
            x: value.x,
            y: value.y,
            length: value.length,
            thickness: value.thickness,
            horizontal: value.horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct PersistedRectCommand {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    fill: bool,
}

impl From<RectCommand> for PersistedRectCommand {
    fn from(value: RectCommand) -> Self {
        Self {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            fill: value.fill,
        }
    }
}

impl From<PersistedRectCommand> for RectCommand {
    fn from(value: PersistedRectCommand) -> Self {
        Self {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            fill: value.fill,
        }
    }
}
