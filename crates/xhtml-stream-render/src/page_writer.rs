use std::collections::BTreeMap;
use std::sync::Arc;

use xhtml_stream::{
    Chunk, ColumnAlign, DirectContent, Element, LayoutCommitError, LinkTarget, OutputUnit,
    Paragraph, SimpleColumn, TextAlign, TextDecoration, TextStyle,
};

use crate::render_ir::{
    AnnotationRect, DestinationRef, DrawCommand, PageAnnotation, PageAnnotationKind,
    RenderDocument, RenderPage, ResolvedTextStyle, RuleCommand, TextCommand,
};

/// Commit rejected because the column leaves the physical page.
pub const COMMIT_OUT_OF_PAGE: &str = "COMMIT_OUT_OF_PAGE";
/// Commit rejected because the column has no area.
pub const COMMIT_INVALID_COLUMN: &str = "COMMIT_INVALID_COLUMN";

const DECORATION_THICKNESS_PX: u32 = 1;

/// Text measurement hook for layout.
pub trait TextMeasurer: Send + Sync {
    /// Measure rendered text width for the provided style.
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32;

    /// Conservative (safe upper-bound) width estimate.
    ///
    /// Default delegates to `measure_text_px`.
    fn conservative_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        self.measure_text_px(text, style)
    }
}

/// Page geometry and spacing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageConfig {
    /// Physical page width.
    pub display_width: i32,
    /// Physical page height.
    pub display_height: i32,
    /// Left margin.
    pub margin_left: i32,
    /// Right margin.
    pub margin_right: i32,
    /// Top margin.
    pub margin_top: i32,
    /// Bottom margin.
    pub margin_bottom: i32,
    /// Extra gap between lines.
    pub line_gap_px: i32,
    /// Gap after each block paragraph.
    pub paragraph_gap_px: i32,
    /// Line-height multiplier when a block declares none.
    pub default_line_height: f32,
}

impl PageConfig {
    /// Convenience for a page size with sensible defaults.
    pub fn for_display(width: i32, height: i32) -> Self {
        Self {
            display_width: width,
            display_height: height,
            ..Self::default()
        }
    }

    /// Width available to flowing content.
    pub fn content_width(self) -> i32 {
        (self.display_width - self.margin_left - self.margin_right).max(1)
    }

    /// Lowest y flowing content may reach.
    pub fn content_bottom(self) -> i32 {
        self.display_height - self.margin_bottom
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            display_width: 480,
            display_height: 800,
            margin_left: 32,
            margin_right: 32,
            margin_top: 48,
            margin_bottom: 40,
            line_gap_px: 0,
            paragraph_gap_px: 8,
            default_line_height: 1.4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BlockCtx {
    align: TextAlign,
    line_height: f32,
}

#[derive(Clone, Debug)]
struct Segment {
    text: String,
    style: ResolvedTextStyle,
    decoration: TextDecoration,
    link: Option<LinkTarget>,
    width_px: f32,
}

#[derive(Clone, Debug)]
struct CurrentLine {
    segments: Vec<Segment>,
    width_px: f32,
    line_height_px: i32,
    left_inset_px: i32,
    align: TextAlign,
}

/// Flows output units onto pages.
///
/// Immediate elements are laid out as they arrive. Deferred units run when
/// reached, against the current vertical position, through this writer's
/// [`DirectContent`] surface. Pending inline text is flushed first so the
/// position reflects everything written before the deferred unit.
pub struct PageWriter {
    cfg: PageConfig,
    text_measurer: Option<Arc<dyn TextMeasurer>>,
    page_no: usize,
    cursor_y: i32,
    page: RenderPage,
    line: Option<CurrentLine>,
    emitted: Vec<RenderPage>,
    destinations: BTreeMap<String, DestinationRef>,
    block: BlockCtx,
    pending_indent_px: i32,
    pending_spaces: usize,
}

impl PageWriter {
    /// Create a writer positioned at the top of page 1.
    pub fn new(cfg: PageConfig) -> Self {
        Self {
            cfg,
            text_measurer: None,
            page_no: 1,
            cursor_y: cfg.margin_top,
            page: RenderPage::new(1),
            line: None,
            emitted: Vec::new(),
            destinations: BTreeMap::new(),
            block: BlockCtx {
                align: TextAlign::Left,
                line_height: cfg.default_line_height,
            },
            pending_indent_px: 0,
            pending_spaces: 0,
        }
    }

    /// Use a custom text measurer instead of the built-in heuristic.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.text_measurer = Some(measurer);
        self
    }

    /// Page config.
    pub fn config(&self) -> PageConfig {
        self.cfg
    }

    /// Current vertical write position on the current page.
    pub fn cursor_y(&self) -> i32 {
        self.cursor_y
    }

    /// Write one output unit.
    pub fn write_unit(&mut self, unit: OutputUnit) -> Result<(), LayoutCommitError> {
        match unit {
            OutputUnit::Immediate(elements) => {
                for element in &elements {
                    self.write_element(element);
                }
                Ok(())
            }
            OutputUnit::Deferred(action) => {
                self.flush_line();
                let y = self.cursor_y;
                let page_no = self.page_no;
                log::trace!("Executing {} at page {} y={}", action.describe(), page_no, y);
                action.write(self, y).map_err(|err| {
                    let err = if err.page_number.is_none() {
                        err.with_page_number(page_no)
                    } else {
                        err
                    };
                    if err.vertical_position.is_none() {
                        err.with_vertical_position(y)
                    } else {
                        err
                    }
                })
            }
        }
    }

    /// Lay out one immediate element.
    pub fn write_element(&mut self, element: &Element) {
        match element {
            Element::Chunk(chunk) => self.push_chunk(chunk),
            Element::Paragraph(p) if p.keep_inline => {
                for child in &p.elements {
                    self.write_element(child);
                }
            }
            Element::Paragraph(p) => self.write_block(p),
            Element::LineBreak => self.hard_break(),
        }
    }

    /// Flush pending content and return the paginated document.
    pub fn finish(mut self) -> RenderDocument {
        self.flush_line();
        self.flush_page_if_non_empty();
        RenderDocument {
            pages: self.emitted,
            destinations: self.destinations,
        }
    }

    fn write_block(&mut self, p: &Paragraph) {
        self.flush_line();
        let saved = self.block;
        self.add_vertical_gap(p.style.margin_top.round() as i32);
        self.block = BlockCtx {
            align: p.style.align,
            line_height: p.style.line_height.unwrap_or(self.cfg.default_line_height),
        };
        self.pending_indent_px = p.style.text_indent.round() as i32;
        self.pending_spaces = 0;
        for child in &p.elements {
            self.write_element(child);
        }
        self.flush_line();
        self.block = saved;
        self.pending_indent_px = 0;
        self.pending_spaces = 0;
        self.add_vertical_gap(p.style.margin_bottom.round() as i32 + self.cfg.paragraph_gap_px);
    }

    fn push_chunk(&mut self, chunk: &Chunk) {
        let style = self.resolve_style(&chunk.style);
        for (idx, piece) in chunk.text.split('\n').enumerate() {
            if idx > 0 {
                self.hard_break();
            }
            let mut tokens = piece.split(' ');
            if let Some(first) = tokens.next() {
                self.place_word(first, &style, chunk);
            }
            for token in tokens {
                self.pending_spaces += 1;
                self.place_word(token, &style, chunk);
            }
        }
    }

    fn place_word(&mut self, word: &str, style: &ResolvedTextStyle, chunk: &Chunk) {
        if word.is_empty() {
            return;
        }
        let line_height = line_height_px(style);
        let mut line = match self.line.take() {
            Some(line) => line,
            None => self.new_line(line_height),
        };
        let mut spaces = if line.segments.is_empty() {
            0
        } else {
            self.pending_spaces
        };
        self.pending_spaces = 0;

        let word_w = self.measure_text(word, style);
        let space_w = self.measure_text(" ", style) * spaces as f32;
        let max_width = (self.cfg.content_width() - line.left_inset_px).max(1) as f32;
        if !line.segments.is_empty() && line.width_px + space_w + word_w > max_width {
            self.line = Some(line);
            self.flush_line();
            line = self.new_line(line_height);
            spaces = 0;
        }
        let space_w = if spaces == 0 { 0.0 } else { space_w };

        let mut text = " ".repeat(spaces);
        text.push_str(word);
        let width = space_w + word_w;
        line.width_px += width;
        line.line_height_px = line.line_height_px.max(line_height);
        match line.segments.last_mut() {
            Some(last)
                if last.style == *style
                    && last.decoration == chunk.style.decoration
                    && last.link == chunk.link =>
            {
                last.text.push_str(&text);
                last.width_px += width;
            }
            _ => line.segments.push(Segment {
                text,
                style: style.clone(),
                decoration: chunk.style.decoration,
                link: chunk.link.clone(),
                width_px: width,
            }),
        }
        self.line = Some(line);
    }

    fn new_line(&mut self, line_height: i32) -> CurrentLine {
        let left_inset_px = core::mem::take(&mut self.pending_indent_px).max(0);
        CurrentLine {
            segments: Vec::with_capacity(4),
            width_px: 0.0,
            line_height_px: line_height,
            left_inset_px,
            align: self.block.align,
        }
    }

    fn hard_break(&mut self) {
        self.pending_spaces = 0;
        let has_text = self
            .line
            .as_ref()
            .is_some_and(|line| !line.segments.is_empty());
        if has_text {
            self.flush_line();
        } else {
            let style = ResolvedTextStyle {
                line_height: self.block.line_height,
                ..ResolvedTextStyle::default()
            };
            self.add_vertical_gap(line_height_px(&style) + self.cfg.line_gap_px);
        }
    }

    fn flush_line(&mut self) {
        let Some(line) = self.line.take() else {
            return;
        };
        if line.segments.is_empty() {
            return;
        }
        if self.cursor_y + line.line_height_px > self.cfg.content_bottom() {
            self.start_next_page();
        }

        let available = self.cfg.content_width() - line.left_inset_px;
        let slack = (available as f32 - line.width_px).max(0.0).round() as i32;
        let offset = match line.align {
            TextAlign::Center => slack / 2,
            TextAlign::Right => slack,
            TextAlign::Left | TextAlign::Justify => 0,
        };
        let top = self.cursor_y;
        let baseline_y = top + baseline_offset(line.line_height_px);
        let mut x = self.cfg.margin_left + line.left_inset_px + offset;
        for seg in line.segments {
            let width = seg.width_px.round() as i32;
            self.draw_text(
                x,
                top,
                baseline_y,
                line.line_height_px,
                seg.text,
                seg.style,
                seg.decoration,
                seg.link.as_ref(),
                width,
            );
            x += width;
        }
        self.cursor_y += line.line_height_px + self.cfg.line_gap_px.max(0);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        x: i32,
        top: i32,
        baseline_y: i32,
        height: i32,
        text: String,
        style: ResolvedTextStyle,
        decoration: TextDecoration,
        link: Option<&LinkTarget>,
        width: i32,
    ) {
        let length = width.max(0) as u32;
        let size_px = style.size_px;
        self.page.push_content_command(DrawCommand::Text(TextCommand {
            x,
            baseline_y,
            text,
            style,
        }));
        if decoration.underline && length > 0 {
            self.page.push_content_command(DrawCommand::Rule(RuleCommand {
                x,
                y: baseline_y + 2,
                length,
                thickness: DECORATION_THICKNESS_PX,
                horizontal: true,
            }));
        }
        if decoration.line_through && length > 0 {
            self.page.push_content_command(DrawCommand::Rule(RuleCommand {
                x,
                y: baseline_y - (size_px * 0.3).round() as i32,
                length,
                thickness: DECORATION_THICKNESS_PX,
                horizontal: true,
            }));
        }
        if let Some(link) = link {
            self.annotate(
                link,
                AnnotationRect {
                    x,
                    y: top,
                    width,
                    height,
                },
            );
        }
    }

    fn annotate(&mut self, link: &LinkTarget, area: AnnotationRect) {
        let kind = match link {
            LinkTarget::LocalGoto(_) => PageAnnotationKind::LocalGoto,
            LinkTarget::External(_) => PageAnnotationKind::Uri,
            LinkTarget::LocalDestination(name) => {
                if self.destinations.contains_key(name) {
                    log::debug!("Duplicate destination {}; keeping first placement", name);
                } else {
                    self.destinations.insert(
                        name.clone(),
                        DestinationRef {
                            page_number: self.page_no,
                            x: area.x,
                            y: area.y,
                        },
                    );
                }
                PageAnnotationKind::Destination
            }
        };
        self.page.push_annotation(PageAnnotation {
            kind,
            value: Some(link.value().to_string()),
            area,
        });
    }

    fn resolve_style(&self, style: &TextStyle) -> ResolvedTextStyle {
        ResolvedTextStyle {
            family: Arc::from(style.family.as_str()),
            weight: style.weight,
            italic: style.italic,
            size_px: style.size_px,
            line_height: self.block.line_height,
            letter_spacing: style.letter_spacing,
            color: [style.color.r, style.color.g, style.color.b],
        }
    }

    fn measure_text(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        self.text_measurer
            .as_ref()
            .map(|m| m.measure_text_px(text, style))
            .unwrap_or_else(|| heuristic_measure_text(text, style))
    }

    fn add_vertical_gap(&mut self, gap_px: i32) {
        if gap_px <= 0 {
            return;
        }
        self.cursor_y += gap_px;
        if self.cursor_y >= self.cfg.content_bottom() {
            self.start_next_page();
        }
    }

    fn start_next_page(&mut self) {
        if self.page.is_empty() {
            self.cursor_y = self.cfg.margin_top;
            return;
        }
        self.flush_page_if_non_empty();
        self.page_no += 1;
        self.page = RenderPage::new(self.page_no);
        self.cursor_y = self.cfg.margin_top;
    }

    fn flush_page_if_non_empty(&mut self) {
        if self.page.is_empty() {
            return;
        }
        let page = core::mem::replace(&mut self.page, RenderPage::new(self.page_no + 1));
        self.emitted.push(page);
    }
}

impl DirectContent for PageWriter {
    fn page_number(&self) -> usize {
        self.page_no
    }

    fn commit_column(&mut self, column: SimpleColumn) -> Result<(), LayoutCommitError> {
        if column.width() <= 0 || column.height() <= 0 {
            return Err(LayoutCommitError::new(
                COMMIT_INVALID_COLUMN,
                format!(
                    "column has no area ({}x{})",
                    column.width(),
                    column.height()
                ),
            )
            .with_page_number(self.page_no)
            .with_vertical_position(column.top));
        }
        if column.left < 0
            || column.top < 0
            || column.right > self.cfg.display_width
            || column.bottom > self.cfg.display_height
        {
            return Err(LayoutCommitError::new(
                COMMIT_OUT_OF_PAGE,
                format!(
                    "column [{}, {}]-[{}, {}] exceeds page {}x{}",
                    column.left,
                    column.top,
                    column.right,
                    column.bottom,
                    self.cfg.display_width,
                    self.cfg.display_height
                ),
            )
            .with_page_number(self.page_no)
            .with_vertical_position(column.top));
        }

        let column_width = column.width();
        let column_height = column.height();
        let styled: Vec<(Chunk, ResolvedTextStyle, f32)> = column
            .chunks
            .into_iter()
            .map(|chunk| {
                let style = self.resolve_style(&chunk.style);
                let width = self.measure_text(&chunk.text, &style);
                (chunk, style, width)
            })
            .collect();
        let total: f32 = styled.iter().map(|(_, _, w)| *w).sum();
        let slack = (column_width as f32 - total).max(0.0).round() as i32;
        let mut x = column.left
            + match column.align {
                ColumnAlign::Left => 0,
                ColumnAlign::Center => slack / 2,
                ColumnAlign::Right => slack,
            };
        let baseline_y = (column.top + column.leading).min(column.bottom);
        for (chunk, style, width) in styled {
            let width = width.round() as i32;
            self.draw_text(
                x,
                column.top,
                baseline_y,
                column_height,
                chunk.text,
                style,
                chunk.style.decoration,
                chunk.link.as_ref(),
                width,
            );
            x += width;
        }
        Ok(())
    }
}

fn baseline_offset(line_height_px: i32) -> i32 {
    (line_height_px as f32 * 0.8).round() as i32
}

fn line_height_px(style: &ResolvedTextStyle) -> i32 {
    (style.size_px * style.line_height).round().max(1.0) as i32
}

fn heuristic_measure_text(text: &str, style: &ResolvedTextStyle) -> f32 {
    let chars = text.chars().count();
    if chars == 0 {
        return 0.0;
    }
    let family = style.family.to_ascii_lowercase();
    let proportional = !(family.contains("mono") || family.contains("fixed"));
    let mut em_sum = 0.0f32;
    if proportional {
        for ch in text.chars() {
            em_sum += proportional_glyph_em_width(ch);
        }
    } else {
        em_sum = chars as f32 * 0.6;
    }
    let mut scale = 1.0;
    if style.weight >= 700 {
        scale += 0.03;
    }
    if style.italic {
        scale += 0.01;
    }
    let mut width = em_sum * style.size_px * scale;
    if chars > 1 {
        width += (chars as f32 - 1.0) * style.letter_spacing;
    }
    width
}

fn proportional_glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.32,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' => 0.23,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_ascii_punctuation() => 0.42,
        _ => 0.56,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xhtml_stream::{BlockStyle, LocalDestinationMarker};

    /// Every glyph is 10px wide.
    struct FixedMeasurer;

    impl TextMeasurer for FixedMeasurer {
        fn measure_text_px(&self, text: &str, _style: &ResolvedTextStyle) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn writer(cfg: PageConfig) -> PageWriter {
        PageWriter::new(cfg).with_text_measurer(Arc::new(FixedMeasurer))
    }

    fn paragraph(texts: &[&str]) -> Element {
        let mut p = Paragraph::block(BlockStyle::default());
        for text in texts {
            p.push(Element::Chunk(Chunk::new(*text, TextStyle::default())));
        }
        Element::Paragraph(p)
    }

    fn text_commands(page: &RenderPage) -> Vec<&TextCommand> {
        page.content_commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn words_wrap_at_content_width() {
        // content width 100px = ten 10px glyphs
        let cfg = PageConfig {
            display_width: 140,
            margin_left: 20,
            margin_right: 20,
            ..PageConfig::default()
        };
        let mut w = writer(cfg);
        w.write_element(&paragraph(&["aaaa bbbb cccc"]));
        let doc = w.finish();
        let texts = text_commands(&doc.pages[0]);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].text, "aaaa bbbb");
        assert_eq!(texts[1].text, "cccc");
        assert!(texts[1].baseline_y > texts[0].baseline_y);
        assert_eq!(texts[0].x, 20);
    }

    #[test]
    fn lines_past_content_bottom_start_a_new_page() {
        let cfg = PageConfig {
            display_height: 100,
            margin_top: 10,
            margin_bottom: 10,
            ..PageConfig::default()
        };
        let mut w = writer(cfg);
        for _ in 0..6 {
            w.write_element(&paragraph(&["line"]));
        }
        let doc = w.finish();
        assert!(doc.page_count() > 1);
        assert_eq!(doc.pages[1].page_number, 2);
    }

    #[test]
    fn deferred_unit_runs_at_current_position() {
        let mut w = writer(PageConfig::default());
        w.write_element(&paragraph(&["first"]));
        let y = w.cursor_y();
        w.write_unit(OutputUnit::deferred(LocalDestinationMarker::new("anchor1")))
            .expect("marker should commit");
        let doc = w.finish();
        let dest = doc.destination("anchor1").expect("destination registered");
        assert_eq!(dest.page_number, 1);
        assert_eq!(dest.y, y);
        assert_eq!(dest.x, 1);
        let annotations: Vec<_> = doc.pages[0]
            .annotations_of(&PageAnnotationKind::Destination)
            .collect();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].area.height, 5);
    }

    #[test]
    fn column_outside_page_is_rejected() {
        let mut w = writer(PageConfig::default());
        let err = w
            .commit_column(SimpleColumn {
                chunks: vec![Chunk::new(" ", TextStyle::default())],
                left: 1,
                top: 798,
                right: 6,
                bottom: 803,
                leading: 5,
                align: ColumnAlign::Left,
            })
            .expect_err("column leaves the page");
        assert_eq!(err.code, COMMIT_OUT_OF_PAGE);
        assert_eq!(err.page_number, Some(1));
        assert_eq!(err.vertical_position, Some(798));
    }

    #[test]
    fn underlined_link_draws_rule_and_annotation() {
        let mut style = TextStyle::default();
        style.decoration.underline = true;
        let chunk = Chunk::new("go", style).with_link(LinkTarget::LocalGoto("sec".to_string()));
        let mut w = writer(PageConfig::default());
        w.write_element(&Element::Chunk(chunk));
        let doc = w.finish();
        let page = &doc.pages[0];
        assert!(page.content_commands.iter().any(|cmd| matches!(
            cmd,
            DrawCommand::Rule(rule) if rule.length == 20 && rule.horizontal
        )));
        let gotos: Vec<_> = page.annotations_of(&PageAnnotationKind::LocalGoto).collect();
        assert_eq!(gotos[0].value.as_deref(), Some("sec"));
        assert_eq!(doc.unresolved_gotos(), vec!["sec"]);
    }

    #[test]
    fn centered_block_offsets_lines() {
        let style = BlockStyle {
            align: TextAlign::Center,
            ..BlockStyle::default()
        };
        let mut p = Paragraph::block(style);
        p.push(Element::Chunk(Chunk::new("ab", TextStyle::default())));
        let cfg = PageConfig::default();
        let mut w = writer(cfg);
        w.write_element(&Element::Paragraph(p));
        let doc = w.finish();
        let texts = text_commands(&doc.pages[0]);
        let slack = cfg.content_width() - 20;
        assert_eq!(texts[0].x, cfg.margin_left + slack / 2);
    }

    #[test]
    fn line_breaks_split_preformatted_text() {
        let mut w = writer(PageConfig::default());
        w.write_element(&paragraph(&["one\ntwo"]));
        let doc = w.finish();
        let texts = text_commands(&doc.pages[0]);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1].text, "two");
    }

    #[test]
    fn empty_input_yields_no_pages() {
        let doc = writer(PageConfig::default()).finish();
        assert_eq!(doc.page_count(), 0);
    }
}
