//! Style maps, the property cascade, and style appliers.
//!
//! The cascade here is deliberately narrow: it carries inherited properties
//! from parent to child and overlays inline `style` declarations. Everything
//! downstream only sees string maps, so a richer cascade can be plugged in
//! through [`PropertyCascade`].

use core::fmt;
use std::collections::BTreeMap;

use crate::tag::{attr, Tag};

/// CSS property names used by the pipeline.
pub mod property {
    pub const COLOR: &str = "color";
    pub const TEXT_DECORATION: &str = "text-decoration";
    pub const FONT_FAMILY: &str = "font-family";
    pub const FONT_SIZE: &str = "font-size";
    pub const FONT_STYLE: &str = "font-style";
    pub const FONT_WEIGHT: &str = "font-weight";
    pub const LINE_HEIGHT: &str = "line-height";
    pub const LETTER_SPACING: &str = "letter-spacing";
    pub const TEXT_ALIGN: &str = "text-align";
    pub const TEXT_INDENT: &str = "text-indent";
    pub const MARGIN_TOP: &str = "margin-top";
    pub const MARGIN_BOTTOM: &str = "margin-bottom";
    pub const WHITE_SPACE: &str = "white-space";
}

/// CSS keyword values used by the pipeline.
pub mod value {
    pub const UNDERLINE: &str = "underline";
    pub const LINE_THROUGH: &str = "line-through";
    pub const NONE: &str = "none";
    pub const BLUE: &str = "blue";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const MONOSPACE: &str = "monospace";
    pub const PRE: &str = "pre";
}

const INHERITED: &[&str] = &[
    property::COLOR,
    property::TEXT_DECORATION,
    property::FONT_FAMILY,
    property::FONT_SIZE,
    property::FONT_STYLE,
    property::FONT_WEIGHT,
    property::LINE_HEIGHT,
    property::LETTER_SPACING,
    property::TEXT_ALIGN,
    property::WHITE_SPACE,
];

/// Default base font size in pixels.
pub const BASE_FONT_SIZE_PX: f32 = 16.0;

/// Resolved style declarations keyed by lowercased property name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleMap {
    values: BTreeMap<String, String>,
}

impl StyleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.values.get(property).map(String::as_str)
    }

    /// Whether a property is set.
    pub fn contains(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        self.values
            .insert(property.to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, property: &str, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    /// Set a property only when it is absent. Returns whether a value was written.
    pub fn fill_if_absent(&mut self, property: &str, value: &str) -> bool {
        if self.contains(property) {
            return false;
        }
        self.set(property, value);
        true
    }

    /// Overlay all declarations from `other`.
    pub fn merge(&mut self, other: &StyleMap) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate declarations in property order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Error from parsing an inline `style` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleParseError {
    /// Offending declaration text.
    pub declaration: String,
    /// Index of the declaration within the attribute.
    pub index: usize,
}

impl fmt::Display for StyleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed declaration #{}: {:?}",
            self.index, self.declaration
        )
    }
}

impl std::error::Error for StyleParseError {}

/// Parse `prop: value; prop2: value2` declarations.
///
/// Empty declarations are skipped. A declaration without a `:` or with an
/// empty property name is an error; callers decide whether to tolerate it.
pub fn parse_inline_style(raw: &str) -> Result<StyleMap, StyleParseError> {
    let mut style = StyleMap::new();
    for (index, decl) in raw.split(';').enumerate() {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((prop, val)) = decl.split_once(':') else {
            return Err(StyleParseError {
                declaration: decl.to_string(),
                index,
            });
        };
        let prop = prop.trim();
        if prop.is_empty() {
            return Err(StyleParseError {
                declaration: decl.to_string(),
                index,
            });
        }
        let val = val.trim().trim_end_matches("!important").trim();
        style.set(prop, val);
    }
    Ok(style)
}

/// Resolves the effective style for a tag.
pub trait PropertyCascade: Send + Sync {
    /// Resolve `tag`'s style given its parent's resolved style.
    fn resolve(&self, tag: &Tag, parent: Option<&StyleMap>) -> StyleMap;
}

/// Inherit-then-overlay cascade.
///
/// Inheritable properties flow from the parent, the tag's inline `style`
/// attribute overlays them, and relative font sizes are resolved to px
/// against the parent size so nesting compounds correctly. Malformed inline
/// styles are ignored with a warning rather than failing the document.
#[derive(Clone, Copy, Debug, Default)]
pub struct InheritingCascade {
    max_inline_style_bytes: Option<usize>,
}

impl InheritingCascade {
    /// Create a cascade with no inline style size cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore inline `style` attributes larger than `limit` bytes.
    pub fn with_inline_style_limit(mut self, limit: usize) -> Self {
        self.max_inline_style_bytes = Some(limit);
        self
    }
}

impl PropertyCascade for InheritingCascade {
    fn resolve(&self, tag: &Tag, parent: Option<&StyleMap>) -> StyleMap {
        let mut resolved = StyleMap::new();
        let parent_size = parent
            .and_then(|p| p.get(property::FONT_SIZE))
            .and_then(|v| parse_length_px(v, BASE_FONT_SIZE_PX))
            .unwrap_or(BASE_FONT_SIZE_PX);
        if let Some(parent) = parent {
            for prop in INHERITED {
                if let Some(v) = parent.get(prop) {
                    resolved.set(prop, v);
                }
            }
        }
        if let Some(raw) = tag.attr(attr::STYLE) {
            if self
                .max_inline_style_bytes
                .is_some_and(|limit| raw.len() > limit)
            {
                log::warn!(
                    "Inline style on <{}> exceeds max_inline_style_bytes ({} bytes); ignoring",
                    tag.name,
                    raw.len()
                );
            } else {
                match parse_inline_style(raw) {
                    Ok(inline) => resolved.merge(&inline),
                    Err(err) => {
                        log::warn!("Ignoring inline style on <{}>: {}", tag.name, err)
                    }
                }
            }
        }
        if let Some(size) = resolved.get(property::FONT_SIZE) {
            if let Some(px) = parse_length_px(size, parent_size) {
                resolved.set(property::FONT_SIZE, format_px(px));
            }
        }
        resolved
    }
}

/// Parse a CSS length into pixels. `em` and `%` resolve against `base_px`.
pub fn parse_length_px(raw: &str, base_px: f32) -> Option<f32> {
    let raw = raw.trim().to_ascii_lowercase();
    let (number, scale) = if let Some(n) = raw.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = raw.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if let Some(n) = raw.strip_suffix("rem") {
        (n, BASE_FONT_SIZE_PX)
    } else if let Some(n) = raw.strip_suffix("em") {
        (n, base_px)
    } else if let Some(n) = raw.strip_suffix('%') {
        (n, base_px / 100.0)
    } else {
        (raw.as_str(), 1.0)
    };
    let parsed = number.trim().parse::<f32>().ok()?;
    let px = parsed * scale;
    px.is_finite().then_some(px)
}

fn format_px(px: f32) -> String {
    if (px - px.round()).abs() < 0.001 {
        format!("{}px", px.round() as i32)
    } else {
        format!("{:.2}px", px)
    }
}

/// RGB colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    /// Construct from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a named, `#rgb`, `#rrggbb` or `rgb(r, g, b)` colour.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex_color(hex);
        }
        if let Some(args) = raw
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut parts = args.split(',').map(|p| p.trim().parse::<u8>().ok());
            let r = parts.next()??;
            let g = parts.next()??;
            let b = parts.next()??;
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::rgb(r, g, b));
        }
        let named = match raw.as_str() {
            "black" => Self::rgb(0, 0, 0),
            "white" => Self::rgb(255, 255, 255),
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "lime" => Self::rgb(0, 255, 0),
            "blue" => Self::BLUE,
            "navy" => Self::rgb(0, 0, 128),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "maroon" => Self::rgb(128, 0, 0),
            "purple" => Self::rgb(128, 0, 128),
            "fuchsia" | "magenta" => Self::rgb(255, 0, 255),
            "teal" => Self::rgb(0, 128, 128),
            "aqua" | "cyan" => Self::rgb(0, 255, 255),
            "olive" => Self::rgb(128, 128, 0),
            "yellow" => Self::rgb(255, 255, 0),
            "orange" => Self::rgb(255, 165, 0),
            _ => return None,
        };
        Some(named)
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let nibble = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let r = nibble(bytes[0])?;
            let g = nibble(bytes[1])?;
            let b = nibble(bytes[2])?;
            Some(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => {
            let byte = |i: usize| Some(nibble(bytes[i])? * 16 + nibble(bytes[i + 1])?);
            Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// Text decoration flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextDecoration {
    pub underline: bool,
    pub line_through: bool,
}

/// Style applied to a text chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// First family in the declared stack.
    pub family: String,
    /// Size in pixels.
    pub size_px: f32,
    /// Numeric weight.
    pub weight: u16,
    /// Italic toggle.
    pub italic: bool,
    /// Fill colour.
    pub color: Color,
    /// Decoration lines.
    pub decoration: TextDecoration,
    /// Letter spacing in pixels.
    pub letter_spacing: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: "serif".to_string(),
            size_px: BASE_FONT_SIZE_PX,
            weight: 400,
            italic: false,
            color: Color::BLACK,
            decoration: TextDecoration::default(),
            letter_spacing: 0.0,
        }
    }
}

impl TextStyle {
    /// Apply a resolved style map to produce chunk styling.
    pub fn from_style_map(style: &StyleMap) -> Self {
        let mut out = Self::default();
        if let Some(family) = style.get(property::FONT_FAMILY) {
            if let Some(first) = family
                .split(',')
                .map(|f| f.trim().trim_matches('"').trim_matches('\''))
                .find(|f| !f.is_empty())
            {
                out.family = first.to_string();
            }
        }
        if let Some(size) = style
            .get(property::FONT_SIZE)
            .and_then(|v| parse_length_px(v, BASE_FONT_SIZE_PX))
        {
            out.size_px = size.clamp(1.0, 512.0);
        }
        if let Some(weight) = style.get(property::FONT_WEIGHT) {
            out.weight = match weight.trim() {
                "bold" | "bolder" => 700,
                "normal" | "lighter" => 400,
                numeric => numeric.parse::<u16>().unwrap_or(400).clamp(100, 900),
            };
        }
        out.italic = matches!(
            style.get(property::FONT_STYLE).map(str::trim),
            Some("italic" | "oblique")
        );
        if let Some(color) = style.get(property::COLOR).and_then(Color::parse) {
            out.color = color;
        }
        if let Some(decoration) = style.get(property::TEXT_DECORATION) {
            for word in decoration.split_whitespace() {
                match word {
                    value::UNDERLINE => out.decoration.underline = true,
                    value::LINE_THROUGH => out.decoration.line_through = true,
                    value::NONE => out.decoration = TextDecoration::default(),
                    _ => {}
                }
            }
        }
        if let Some(spacing) = style
            .get(property::LETTER_SPACING)
            .and_then(|v| parse_length_px(v, out.size_px))
        {
            out.letter_spacing = spacing;
        }
        out
    }
}

/// Horizontal alignment of a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Style applied to a paragraph container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockStyle {
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Space before the block in pixels.
    pub margin_top: f32,
    /// Space after the block in pixels.
    pub margin_bottom: f32,
    /// First-line indent in pixels.
    pub text_indent: f32,
    /// Line-height multiplier, when declared.
    pub line_height: Option<f32>,
}

impl BlockStyle {
    /// Apply a resolved style map to produce block styling.
    pub fn from_style_map(style: &StyleMap) -> Self {
        let size = style
            .get(property::FONT_SIZE)
            .and_then(|v| parse_length_px(v, BASE_FONT_SIZE_PX))
            .unwrap_or(BASE_FONT_SIZE_PX);
        let length = |prop: &str| {
            style
                .get(prop)
                .and_then(|v| parse_length_px(v, size))
                .unwrap_or(0.0)
        };
        let align = match style.get(property::TEXT_ALIGN).map(str::trim) {
            Some("center") => TextAlign::Center,
            Some("right" | "end") => TextAlign::Right,
            Some("justify") => TextAlign::Justify,
            _ => TextAlign::Left,
        };
        let line_height = style.get(property::LINE_HEIGHT).and_then(|raw| {
            let raw = raw.trim();
            if let Ok(multiplier) = raw.parse::<f32>() {
                return Some(multiplier);
            }
            parse_length_px(raw, size).map(|px| px / size)
        });
        Self {
            align,
            margin_top: length(property::MARGIN_TOP),
            margin_bottom: length(property::MARGIN_BOTTOM),
            text_indent: length(property::TEXT_INDENT),
            line_height: line_height.filter(|m| m.is_finite() && *m > 0.0),
        }
    }
}
