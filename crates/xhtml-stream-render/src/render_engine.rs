use std::sync::Arc;

use xhtml_stream::{
    convert_xhtml_with, HandlerRegistry, LayoutCommitError, OutputUnit, PipelineError,
    PipelineOptions,
};

use crate::page_writer::{PageConfig, PageWriter, TextMeasurer};
use crate::render_ir::RenderDocument;

/// Options for the render engine.
#[derive(Clone, Debug, Default)]
pub struct RenderEngineOptions {
    /// Tag pipeline options (limits, link root provider).
    pub pipeline: PipelineOptions,
    /// Page geometry.
    pub page: PageConfig,
}

impl RenderEngineOptions {
    /// Convenience for a page size with default pipeline options.
    pub fn for_display(width: i32, height: i32) -> Self {
        Self {
            page: PageConfig::for_display(width, height),
            ..Self::default()
        }
    }

    /// Resolve relative links against `root`.
    pub fn with_link_root(mut self, root: impl Into<String>) -> Self {
        self.pipeline = self.pipeline.with_link_root(root);
        self
    }
}

/// Runs XHTML through the tag pipeline and onto pages.
pub struct RenderEngine {
    opts: RenderEngineOptions,
    registry: HandlerRegistry,
    text_measurer: Option<Arc<dyn TextMeasurer>>,
}

impl RenderEngine {
    /// Create an engine with the default XHTML handler set.
    pub fn new(opts: RenderEngineOptions) -> Self {
        Self {
            opts,
            registry: HandlerRegistry::html_default(),
            text_measurer: None,
        }
    }

    /// Replace the handler registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a text measurer for width-accurate line breaking.
    pub fn set_text_measurer(&mut self, measurer: Arc<dyn TextMeasurer>) {
        self.text_measurer = Some(measurer);
    }

    /// Engine options.
    pub fn options(&self) -> &RenderEngineOptions {
        &self.opts
    }

    /// Render an XHTML document.
    ///
    /// Root units are written to pages as soon as the pipeline completes
    /// them. A commit failure aborts the pipeline on the spot: no further
    /// markup is tokenized or handled, and the commit error is returned.
    pub fn render_xhtml(&self, html: &str) -> Result<RenderDocument, RenderEngineError> {
        let mut writer = self.page_writer();
        let mut commit_err: Option<LayoutCommitError> = None;
        let result = convert_xhtml_with(html, &self.registry, &self.opts.pipeline, |unit| {
            writer.write_unit(unit).map_err(|err| {
                log::warn!("Stopping page output: {}", err);
                let bridged = PipelineError::from(err.clone());
                commit_err = Some(err);
                bridged
            })
        });
        if let Some(err) = commit_err {
            return Err(RenderEngineError::Commit(err));
        }
        result?;
        Ok(writer.finish())
    }

    /// Render already-produced root units.
    pub fn render_units<I>(&self, units: I) -> Result<RenderDocument, RenderEngineError>
    where
        I: IntoIterator<Item = OutputUnit>,
    {
        let mut writer = self.page_writer();
        for unit in units {
            writer.write_unit(unit)?;
        }
        Ok(writer.finish())
    }

    fn page_writer(&self) -> PageWriter {
        let writer = PageWriter::new(self.opts.page);
        match &self.text_measurer {
            Some(measurer) => writer.with_text_measurer(Arc::clone(measurer)),
            None => writer,
        }
    }
}

/// Render engine failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderEngineError {
    /// Tokenizing or tag handling failed.
    Pipeline(PipelineError),
    /// A deferred write could not be committed to the page.
    Commit(LayoutCommitError),
}

impl core::fmt::Display for RenderEngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pipeline(err) => write!(f, "pipeline failed: {}", err),
            Self::Commit(err) => write!(f, "page commit failed: {}", err),
        }
    }
}

impl std::error::Error for RenderEngineError {}

impl From<PipelineError> for RenderEngineError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<LayoutCommitError> for RenderEngineError {
    fn from(value: LayoutCommitError) -> Self {
        Self::Commit(value)
    }
}
