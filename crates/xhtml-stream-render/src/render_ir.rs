use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Page represented as backend-agnostic draw commands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPage {
    /// 1-based page number.
    pub page_number: usize,
    /// Content-layer draw commands in placement order.
    pub content_commands: Vec<DrawCommand>,
    /// Link areas and destinations placed on this page.
    pub annotations: Vec<PageAnnotation>,
}

impl RenderPage {
    const INITIAL_CONTENT_COMMAND_CAPACITY: usize = 8;

    /// Create an empty page.
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            content_commands: Vec::with_capacity(0),
            annotations: Vec::with_capacity(0),
        }
    }

    /// Push a content-layer command.
    pub fn push_content_command(&mut self, cmd: DrawCommand) {
        if self.content_commands.capacity() == 0 {
            self.content_commands
                .reserve(Self::INITIAL_CONTENT_COMMAND_CAPACITY);
        }
        self.content_commands.push(cmd);
    }

    /// Attach an annotation.
    pub fn push_annotation(&mut self, annotation: PageAnnotation) {
        self.annotations.push(annotation);
    }

    /// Whether nothing has been placed on this page.
    pub fn is_empty(&self) -> bool {
        self.content_commands.is_empty() && self.annotations.is_empty()
    }

    /// Concatenated text of all text commands, in placement order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for cmd in &self.content_commands {
            if let DrawCommand::Text(text) = cmd {
                out.push_str(&text.text);
            }
        }
        out
    }

    /// Annotations of the given kind.
    pub fn annotations_of<'a>(
        &'a self,
        kind: &'a PageAnnotationKind,
    ) -> impl Iterator<Item = &'a PageAnnotation> + 'a {
        self.annotations.iter().filter(move |a| &a.kind == kind)
    }
}

/// Structured page annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageAnnotation {
    /// Stable annotation kind/tag.
    pub kind: PageAnnotationKind,
    /// Target name, URL or destination name.
    pub value: Option<String>,
    /// Active area on the page.
    pub area: AnnotationRect,
}

/// Page-space rectangle of an annotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationRect {
    /// Left x.
    pub x: i32,
    /// Top y.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

/// Structured page annotation kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PageAnnotationKind {
    /// Jump to a named destination in the same document.
    LocalGoto,
    /// External URI link.
    Uri,
    /// Named destination anchored here.
    Destination,
    /// Forward-compatible fallback for unknown string tags.
    Unknown(String),
}

impl PageAnnotationKind {
    /// Canonical string form used by persisted payloads.
    pub fn as_str(&self) -> &str {
        match self {
            Self::LocalGoto => "local_goto",
            Self::Uri => "uri",
            Self::Destination => "destination",
            Self::Unknown(value) => value.as_str(),
        }
    }
}

impl AsRef<str> for PageAnnotationKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for PageAnnotationKind {
    fn from(value: &str) -> Self {
        match value {
            "local_goto" => Self::LocalGoto,
            "uri" => Self::Uri,
            "destination" => Self::Destination,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

impl From<String> for PageAnnotationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "local_goto" | "uri" | "destination" => Self::from(value.as_str()),
            _ => Self::Unknown(value),
        }
    }
}

impl PartialEq<&str> for PageAnnotationKind {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for PageAnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a named destination landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestinationRef {
    /// 1-based page number.
    pub page_number: usize,
    /// Left x.
    pub x: i32,
    /// Top y.
    pub y: i32,
}

/// Layout output commands.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Draw text.
    Text(TextCommand),
    /// Draw a line rule.
    Rule(RuleCommand),
    /// Draw rectangle.
    Rect(RectCommand),
}

/// Resolved style passed to renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTextStyle {
    /// Chosen family.
    pub family: Arc<str>,
    /// Numeric weight.
    pub weight: u16,
    /// Italic flag.
    pub italic: bool,
    /// Size in pixels.
    pub size_px: f32,
    /// Line height multiplier.
    pub line_height: f32,
    /// Letter spacing in px.
    pub letter_spacing: f32,
    /// Fill colour as `[r, g, b]`.
    pub color: [u8; 3],
}

impl Default for ResolvedTextStyle {
    fn default() -> Self {
        Self {
            family: Arc::from("serif"),
            weight: 400,
            italic: false,
            size_px: 16.0,
            line_height: 1.4,
            letter_spacing: 0.0,
            color: [0, 0, 0],
        }
    }
}

/// Text draw command.
#[derive(Clone, Debug, PartialEq)]
pub struct TextCommand {
    /// Left x.
    pub x: i32,
    /// Baseline y.
    pub baseline_y: i32,
    /// Content.
    pub text: String,
    /// Resolved style.
    pub style: ResolvedTextStyle,
}

/// Rule draw command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleCommand {
    /// Start x.
    pub x: i32,
    /// Start y.
    pub y: i32,
    /// Length.
    pub length: u32,
    /// Thickness.
    pub thickness: u32,
    /// Horizontal if true; vertical if false.
    pub horizontal: bool,
}

/// Rectangle command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RectCommand {
    /// Left x.
    pub x: i32,
    /// Top y.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Fill rectangle when true.
    pub fill: bool,
}

/// Paginated output of one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderDocument {
    /// Pages in order.
    pub pages: Vec<RenderPage>,
    /// Named destinations by name. First placement wins.
    pub destinations: BTreeMap<String, DestinationRef>,
}

impl RenderDocument {
    /// Location of a named destination.
    pub fn destination(&self, name: &str) -> Option<DestinationRef> {
        self.destinations.get(name).copied()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Local goto targets with no matching named destination.
    pub fn unresolved_gotos(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .pages
            .iter()
            .flat_map(|page| page.annotations.iter())
            .filter(|a| a.kind == PageAnnotationKind::LocalGoto)
            .filter_map(|a| a.value.as_deref())
            .filter(|name| !self.destinations.contains_key(*name))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
