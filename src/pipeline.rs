//! Pipeline driver: turns open/text/close events into root output units.

use std::sync::Arc;

use crate::config::PipelineOptions;
use crate::css::{property, InheritingCascade, PropertyCascade, StyleMap};
use crate::error::{ErrorPhase, PipelineError};
use crate::handler::{HandlerContext, TagHandler};
use crate::output::OutputUnit;
use crate::registry::HandlerRegistry;
use crate::stack::{FrameId, ProcessingStack};
use crate::tag::{Attributes, Tag};

/// Error code returned for every event after a failure.
pub const PIPELINE_ABORTED: &str = "PIPELINE_ABORTED";
/// Conventional code for handler-reported failures.
pub const HANDLER_FAILED: &str = "HANDLER_FAILED";

/// One markup event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A start tag.
    Open {
        /// Tag name as found in the source.
        name: String,
        /// Source attributes.
        attributes: Attributes,
    },
    /// A text run.
    Text(String),
    /// An end tag.
    Close(String),
}

impl PipelineEvent {
    /// Start tag event.
    pub fn open(name: &str, attributes: Attributes) -> Self {
        Self::Open {
            name: name.to_string(),
            attributes,
        }
    }

    /// Text run event.
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    /// End tag event.
    pub fn close(name: &str) -> Self {
        Self::Close(name.to_string())
    }
}

struct OpenTag {
    tag: Tag,
    handler: Arc<dyn TagHandler>,
    frame: Option<FrameId>,
    /// Opened past the nesting limit; not dispatched to its handler.
    flattened: bool,
}

/// Streaming driver over a handler registry.
///
/// Owns the processing stack. Handlers only ever see the units accumulated
/// for their own tag. After any error the pipeline is latched as aborted.
pub struct Pipeline<'r> {
    registry: &'r HandlerRegistry,
    options: PipelineOptions,
    cascade: Box<dyn PropertyCascade>,
    open: Vec<OpenTag>,
    stack: ProcessingStack,
    aborted: bool,
}

impl<'r> Pipeline<'r> {
    /// Create a driver with the default inheriting cascade.
    pub fn new(registry: &'r HandlerRegistry, options: PipelineOptions) -> Self {
        let cascade = InheritingCascade::new()
            .with_inline_style_limit(options.limits.max_inline_style_bytes);
        Self {
            registry,
            options,
            cascade: Box::new(cascade),
            open: Vec::new(),
            stack: ProcessingStack::new(),
            aborted: false,
        }
    }

    /// Replace the property cascade.
    pub fn with_cascade(mut self, cascade: Box<dyn PropertyCascade>) -> Self {
        self.cascade = cascade;
        self
    }

    /// Driver options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Number of currently open tags, flattened ones included.
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    /// Whether an earlier failure latched the pipeline.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Handle a start tag.
    pub fn open_tag<F>(
        &mut self,
        name: &str,
        attributes: Attributes,
        on_unit: &mut F,
    ) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        self.ensure_live()?;
        let result = self.open_tag_inner(name, attributes, on_unit);
        self.latch(result)
    }

    /// Handle a text run.
    pub fn text<F>(&mut self, run: &str, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        self.ensure_live()?;
        let result = self.text_inner(run, on_unit);
        self.latch(result)
    }

    /// Handle an end tag. Still-open descendants are closed first; a close
    /// tag with no matching open tag is ignored.
    pub fn close_tag<F>(&mut self, name: &str, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        self.ensure_live()?;
        let result = self.close_tag_inner(name, on_unit);
        self.latch(result)
    }

    /// Close every tag still open.
    pub fn finish<F>(&mut self, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        self.ensure_live()?;
        if !self.open.is_empty() {
            log::debug!("Closing {} unclosed tag(s) at end of input", self.open.len());
        }
        let mut result = Ok(());
        while !self.open.is_empty() {
            result = self.close_top(on_unit);
            if result.is_err() {
                break;
            }
        }
        self.latch(result)
    }

    /// Dispatch a single event.
    pub fn process<F>(&mut self, event: PipelineEvent, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        match event {
            PipelineEvent::Open { name, attributes } => self.open_tag(&name, attributes, on_unit),
            PipelineEvent::Text(text) => self.text(&text, on_unit),
            PipelineEvent::Close(name) => self.close_tag(&name, on_unit),
        }
    }

    fn ensure_live(&self) -> Result<(), PipelineError> {
        if self.aborted {
            return Err(PipelineError::new(
                PIPELINE_ABORTED,
                "pipeline aborted by an earlier failure",
            ));
        }
        Ok(())
    }

    fn latch<T>(&mut self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if result.is_err() {
            self.aborted = true;
        }
        result
    }

    fn context(&self) -> HandlerContext<'_> {
        HandlerContext::new(&self.options).at_depth(self.open.len())
    }

    fn parent_style(&self) -> Option<&StyleMap> {
        self.open.last().map(|open| &open.tag.style)
    }

    fn open_tag_inner<F>(
        &mut self,
        name: &str,
        attributes: Attributes,
        on_unit: &mut F,
    ) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        let mut tag = Tag::new(name, attributes);
        tag.style = self.cascade.resolve(&tag, self.parent_style());
        let inherited_pre = self.open.last().is_some_and(|o| o.tag.preserve_whitespace);

        if self.open.len() >= self.options.limits.max_nesting {
            log::warn!(
                "Nesting depth exceeded max_nesting ({}); flattening <{}>",
                self.options.limits.max_nesting,
                tag.name
            );
            tag.preserve_whitespace = inherited_pre;
            let handler = self.registry.resolve(&tag.name);
            self.open.push(OpenTag {
                tag,
                handler,
                frame: None,
                flattened: true,
            });
            return Ok(());
        }

        let handler = self.registry.resolve(&tag.name);
        let ctx = self.context();
        let units = handler
            .on_start(&ctx, &mut tag)
            .map_err(|err| handler_error(err, &tag.name))?;
        tag.preserve_whitespace =
            inherited_pre || tag.is_preformatted() || whitespace_is_preserved(&tag.style);
        self.emit(units, on_unit)?;

        let frame = handler.owns_stack().then(|| self.stack.push_frame());
        self.open.push(OpenTag {
            tag,
            handler,
            frame,
            flattened: false,
        });
        Ok(())
    }

    fn text_inner<F>(&mut self, run: &str, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        let ctx = self.context();
        let units = match self.open.iter().rev().find(|open| !open.flattened) {
            Some(open) => open
                .handler
                .on_content(&ctx, &open.tag, run)
                .map_err(|err| handler_error(err, &open.tag.name))?,
            None => {
                let root = Tag::default();
                self.registry.fallback().on_content(&ctx, &root, run)?
            }
        };
        self.emit(units, on_unit)?;
        Ok(())
    }

    fn close_tag_inner<F>(&mut self, name: &str, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        let name = Tag::new(name, Attributes::new()).name;
        let Some(pos) = self.open.iter().rposition(|open| open.tag.name == name) else {
            log::debug!("Ignoring stray close tag </{}>", name);
            return Ok(());
        };
        while self.open.len() > pos {
            self.close_top(on_unit)?;
        }
        Ok(())
    }

    fn close_top<F>(&mut self, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        let Some(open) = self.open.pop() else {
            return Ok(());
        };
        if open.flattened {
            return Ok(());
        }
        let accumulated = match open.frame {
            Some(frame) => self.stack.pop_frame(frame).ok_or_else(|| {
                PipelineError::new(
                    HANDLER_FAILED,
                    "accumulation frame is not on top of the processing stack",
                )
                .with_tag(open.tag.name.as_str())
            })?,
            None => Vec::new(),
        };
        let ctx = self.context();
        let units = open
            .handler
            .on_end(&ctx, &open.tag, accumulated)
            .map_err(|err| handler_error(err, &open.tag.name))?;
        self.emit(units, on_unit)?;
        Ok(())
    }

    fn emit<F>(&mut self, units: Vec<OutputUnit>, on_unit: &mut F) -> Result<(), PipelineError>
    where
        F: FnMut(OutputUnit) -> Result<(), PipelineError>,
    {
        if units.is_empty() {
            return Ok(());
        }
        if let Some(orphans) = self.stack.extend_top(units) {
            for unit in orphans {
                on_unit(unit)?;
            }
        }
        Ok(())
    }
}

/// Run a full event sequence and collect the root units.
pub fn process_events<I>(
    events: I,
    registry: &HandlerRegistry,
    options: &PipelineOptions,
) -> Result<Vec<OutputUnit>, PipelineError>
where
    I: IntoIterator<Item = PipelineEvent>,
{
    let mut pipeline = Pipeline::new(registry, options.clone());
    let mut out = Vec::new();
    let mut push = |unit| {
        out.push(unit);
        Ok(())
    };
    for event in events {
        pipeline.process(event, &mut push)?;
    }
    pipeline.finish(&mut push)?;
    Ok(out)
}

fn whitespace_is_preserved(style: &StyleMap) -> bool {
    matches!(
        style.get(property::WHITE_SPACE),
        Some("pre" | "pre-wrap" | "pre-line" | "break-spaces")
    )
}

fn handler_error(err: PipelineError, tag: &str) -> PipelineError {
    let err = if err.tag.is_none() {
        err.with_tag(tag)
    } else {
        err
    };
    if err.phase == ErrorPhase::Parse {
        err
    } else {
        err.with_phase(ErrorPhase::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineLimits;
    use crate::element::{Element, LinkTarget};
    use crate::error::LayoutCommitError;
    use crate::handler::HandlerResult;

    fn run(events: Vec<PipelineEvent>) -> Vec<OutputUnit> {
        let registry = HandlerRegistry::html_default();
        process_events(events, &registry, &PipelineOptions::default()).expect("pipeline")
    }

    struct Failing;

    impl TagHandler for Failing {
        fn on_content(&self, _ctx: &HandlerContext<'_>, _tag: &Tag, _text: &str) -> HandlerResult {
            Err(PipelineError::new(HANDLER_FAILED, "boom"))
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
    }

    #[test]
    fn paragraph_collects_inline_children_in_order() {
        let out = run(vec![
            PipelineEvent::open("p", Attributes::new()),
            PipelineEvent::text("Hello "),
            PipelineEvent::open("b", Attributes::new()),
            PipelineEvent::text("bold"),
            PipelineEvent::close("b"),
            PipelineEvent::text(" world"),
            PipelineEvent::close("p"),
        ]);
        assert_eq!(out.len(), 1);
        match out[0].elements() {
            Some([Element::Paragraph(p)]) => {
                assert_eq!(p.elements.len(), 3);
                match &p.elements[1] {
                    Element::Chunk(chunk) => assert_eq!(chunk.style.weight, 700),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn anchor_inside_paragraph_links_its_chunks() {
        let out = run(vec![
            PipelineEvent::open("p", Attributes::new()),
            PipelineEvent::open("a", Attributes::new().with("href", "#intro")),
            PipelineEvent::text("Intro"),
            PipelineEvent::close("a"),
            PipelineEvent::close("p"),
        ]);
        let Some([Element::Paragraph(p)]) = out[0].elements() else {
            panic!("expected paragraph");
        };
        let Element::Paragraph(container) = &p.elements[0] else {
            panic!("expected inline container");
        };
        assert!(container.keep_inline);
        let Element::Chunk(chunk) = &container.elements[0] else {
            panic!("expected chunk");
        };
        assert_eq!(chunk.link, Some(LinkTarget::LocalGoto("intro".to_string())));
        assert!(chunk.style.decoration.underline);
    }

    #[test]
    fn empty_named_anchor_at_root_is_deferred() {
        let out = run(vec![
            PipelineEvent::open("a", Attributes::new().with("name", "anchor1")),
            PipelineEvent::close("a"),
        ]);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_deferred());
    }

    #[test]
    fn close_tag_closes_open_descendants() {
        let out = run(vec![
            PipelineEvent::open("div", Attributes::new()),
            PipelineEvent::open("p", Attributes::new()),
            PipelineEvent::text("unclosed"),
            PipelineEvent::close("div"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].elements().map(|els| els[0].plain_text()),
            Some("unclosed".to_string())
        );
    }

    #[test]
    fn stray_close_and_unclosed_tags_are_tolerated() {
        let out = run(vec![
            PipelineEvent::close("span"),
            PipelineEvent::open("p", Attributes::new()),
            PipelineEvent::text("tail"),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn ignored_tags_swallow_nested_output() {
        let out = run(vec![
            PipelineEvent::open("head", Attributes::new()),
            PipelineEvent::open("title", Attributes::new()),
            PipelineEvent::text("Title"),
            PipelineEvent::close("title"),
            PipelineEvent::close("head"),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn preformatted_text_keeps_whitespace() {
        let out = run(vec![
            PipelineEvent::open("pre", Attributes::new()),
            PipelineEvent::text("a  b\n c"),
            PipelineEvent::close("pre"),
        ]);
        assert_eq!(
            out[0].elements().map(|els| els[0].plain_text()),
            Some("a  b\n c".to_string())
        );
    }

    #[test]
    fn nesting_beyond_limit_is_flattened() {
        let registry = HandlerRegistry::html_default();
        let options = PipelineOptions::default().with_limits(PipelineLimits {
            max_nesting: 1,
            ..PipelineLimits::default()
        });
        let out = process_events(
            vec![
                PipelineEvent::open("p", Attributes::new()),
                PipelineEvent::open("a", Attributes::new().with("href", "#x")),
                PipelineEvent::text("deep"),
                PipelineEvent::close("a"),
                PipelineEvent::close("p"),
            ],
            &registry,
            &options,
        )
        .expect("pipeline");
        let Some([Element::Paragraph(p)]) = out[0].elements() else {
            panic!("expected paragraph");
        };
        let Element::Chunk(chunk) = &p.elements[0] else {
            panic!("flattened anchor should not wrap");
        };
        assert_eq!(chunk.link, None);
    }

    #[test]
    fn handler_failure_latches_abort() {
        let registry = HandlerRegistry::html_default().with_handler("x-fail", Arc::new(Failing));
        let mut pipeline = Pipeline::new(&registry, PipelineOptions::default());
        let mut sink = |_unit: OutputUnit| -> Result<(), PipelineError> { Ok(()) };
        pipeline
            .open_tag("x-fail", Attributes::new(), &mut sink)
            .expect("open");
        let err = pipeline.text("x", &mut sink).expect_err("handler fails");
        assert_eq!(err.code, HANDLER_FAILED);
        assert_eq!(err.phase, ErrorPhase::Handler);
        assert_eq!(err.tag.as_deref(), Some("x-fail"));
        assert!(pipeline.is_aborted());
        let err = pipeline.close_tag("x-fail", &mut sink).expect_err("aborted");
        assert_eq!(err.code, PIPELINE_ABORTED);
    }

    #[test]
    fn sink_failure_latches_abort() {
        let registry = HandlerRegistry::html_default();
        let mut pipeline = Pipeline::new(&registry, PipelineOptions::default());
        let mut delivered = 0usize;
        let mut sink = |_unit: OutputUnit| -> Result<(), PipelineError> {
            delivered += 1;
            Err(PipelineError::from(LayoutCommitError::new(
                "COMMIT_REFUSED",
                "surface full",
            )))
        };
        pipeline
            .open_tag("p", Attributes::new(), &mut sink)
            .expect("open");
        pipeline.text("first", &mut sink).expect("text");
        let err = pipeline.close_tag("p", &mut sink).expect_err("sink fails");
        assert_eq!(err.code, "COMMIT_REFUSED");
        assert_eq!(err.phase, ErrorPhase::Flush);
        assert!(pipeline.is_aborted());
        let err = pipeline
            .open_tag("p", Attributes::new(), &mut sink)
            .expect_err("aborted");
        assert_eq!(err.code, PIPELINE_ABORTED);
        assert_eq!(delivered, 1);
    }

    #[test]
    fn on_start_style_changes_reach_descendants() {
        let out = run(vec![
            PipelineEvent::open("a", Attributes::new().with("href", "https://x.test")),
            PipelineEvent::open("span", Attributes::new()),
            PipelineEvent::text("child"),
            PipelineEvent::close("span"),
            PipelineEvent::close("a"),
        ]);
        let Some([Element::Paragraph(container)]) = out[0].elements() else {
            panic!("expected container");
        };
        let Element::Chunk(chunk) = &container.elements[0] else {
            panic!("expected chunk");
        };
        assert!(chunk.style.decoration.underline);
        assert_eq!(
            chunk.link,
            Some(LinkTarget::External("https://x.test".to_string()))
        );
    }
}
