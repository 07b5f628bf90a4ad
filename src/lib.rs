//! # xhtml-stream
//!
//! Stack-based streaming pipeline that turns XHTML markup into document
//! elements for paginated output.
//!
//! Markup events (start tag, text run, end tag) are dispatched to
//! [`TagHandler`]s looked up in a [`HandlerRegistry`]. Each handler either
//! returns finished [`Element`]s or a [`DeferredWrite`] that runs later, once
//! the page writer knows the final vertical position on the page. Handlers
//! that [own the stack](TagHandler::owns_stack) receive everything their
//! descendants produced when they close.
//!
//! ```rust
//! use xhtml_stream::{convert_xhtml, HandlerRegistry, PipelineOptions};
//!
//! let options = PipelineOptions::default().with_link_root("https://example.com/");
//! let units = convert_xhtml(
//!     r#"<p>See <a href="/docs/page">the docs</a>.</p>"#,
//!     &HandlerRegistry::html_default(),
//!     &options,
//! )
//! .unwrap();
//! assert_eq!(units.len(), 1);
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod config;
pub mod css;
pub mod element;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod sanitize;
pub mod stack;
pub mod tag;
pub mod xhtml;

pub use config::{
    ConfigProvider, MapConfigProvider, PipelineLimits, PipelineOptions, GLOBAL_LINK_ROOT,
};
pub use css::{
    BlockStyle, Color, InheritingCascade, PropertyCascade, StyleMap, TextAlign, TextDecoration,
    TextStyle,
};
pub use element::{Chunk, Element, LinkTarget, Paragraph};
pub use error::{ErrorPhase, LayoutCommitError, PipelineError};
pub use handler::{HandlerContext, HandlerResult, TagHandler};
pub use handlers::{
    resolve_external_reference, AnchorHandler, IgnoreHandler, InlineHandler, LineBreakHandler,
    LocalDestinationMarker, ParagraphHandler,
};
pub use output::{ColumnAlign, DeferredWrite, DirectContent, OutputUnit, SimpleColumn};
pub use pipeline::{process_events, Pipeline, PipelineEvent, HANDLER_FAILED, PIPELINE_ABORTED};
pub use registry::HandlerRegistry;
pub use sanitize::sanitize_inline;
pub use stack::{FrameId, ProcessingStack};
pub use tag::{Attributes, Tag};
pub use xhtml::{convert_xhtml, convert_xhtml_with, PARSE_TOKENIZE_ERROR};
