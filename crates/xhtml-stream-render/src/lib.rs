//! Render IR, page writer, and orchestration for `xhtml-stream`.

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

mod page_writer;
mod persist;
mod render_engine;
mod render_ir;

pub use page_writer::{
    PageConfig, PageWriter, TextMeasurer, COMMIT_INVALID_COLUMN, COMMIT_OUT_OF_PAGE,
};
pub use render_engine::{RenderEngine, RenderEngineError, RenderEngineOptions};
pub use render_ir::{
    AnnotationRect, DestinationRef, DrawCommand, PageAnnotation, PageAnnotationKind, RectCommand,
    RenderDocument, RenderPage, ResolvedTextStyle, RuleCommand, TextCommand,
};
