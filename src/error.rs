//! Error types for the tag pipeline and deferred page writes.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

/// Processing phase where an error originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Markup tokenization.
    Parse,
    /// Tag handler dispatch.
    Handler,
    /// Output flush into the page surface.
    Flush,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Handler => write!(f, "handler"),
            Self::Flush => write!(f, "flush"),
        }
    }
}

/// Structured error for pipeline operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineError {
    /// Processing phase where this error originated.
    pub phase: ErrorPhase,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional tag name context.
    pub tag: Option<Box<str>>,
    /// Optional tokenizer/read offset in bytes.
    pub token_offset: Option<usize>,
}

impl PipelineError {
    /// Create an error in an explicit phase.
    pub fn new_with_phase(
        phase: ErrorPhase,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            code,
            message: message.into().into_boxed_str(),
            tag: None,
            token_offset: None,
        }
    }

    /// Create a handler-phase error.
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self::new_with_phase(ErrorPhase::Handler, code, message)
    }

    /// Override the phase.
    pub fn with_phase(mut self, phase: ErrorPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Attach tag name context.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into().into_boxed_str());
        self
    }

    /// Attach tokenizer offset context.
    pub fn with_token_offset(mut self, token_offset: usize) -> Self {
        self.token_offset = Some(token_offset);
        self
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.phase, self.code, self.message)?;
        if let Some(tag) = self.tag.as_deref() {
            write!(f, " [tag={}]", tag)?;
        }
        if let Some(token_offset) = self.token_offset {
            write!(f, " [token_offset={}]", token_offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {}

/// Failure to place content on the page surface.
///
/// Raised only while a deferred write is flushed. It is fatal for the
/// current document and never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutCommitError {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// 1-based page number being written when the commit failed.
    pub page_number: Option<usize>,
    /// Vertical write position handed to the failed action.
    pub vertical_position: Option<i32>,
}

impl LayoutCommitError {
    /// Create a commit error.
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into().into_boxed_str(),
            page_number: None,
            vertical_position: None,
        }
    }

    /// Attach page number context.
    pub fn with_page_number(mut self, page_number: usize) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Attach vertical position context.
    pub fn with_vertical_position(mut self, vertical_position: i32) -> Self {
        self.vertical_position = Some(vertical_position);
        self
    }
}

impl fmt::Display for LayoutCommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(page_number) = self.page_number {
            write!(f, " [page={}]", page_number)?;
        }
        if let Some(y) = self.vertical_position {
            write!(f, " [y={}]", y)?;
        }
        Ok(())
    }
}

impl std::error::Error for LayoutCommitError {}

impl From<LayoutCommitError> for PipelineError {
    fn from(err: LayoutCommitError) -> Self {
        PipelineError::new_with_phase(ErrorPhase::Flush, err.code, err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn pipeline_error_display_includes_context() {
        let err = PipelineError::new("HANDLER_FAILED", "boom")
            .with_tag("a")
            .with_token_offset(12);
        assert_eq!(
            err.to_string(),
            "handler:HANDLER_FAILED: boom [tag=a] [token_offset=12]"
        );
    }

    #[test]
    fn commit_error_bridges_to_flush_phase() {
        let err = LayoutCommitError::new("COMMIT_NO_ROOM", "page exhausted")
            .with_page_number(3)
            .with_vertical_position(790);
        assert_eq!(err.to_string(), "COMMIT_NO_ROOM: page exhausted [page=3] [y=790]");
        let bridged: PipelineError = err.into();
        assert_eq!(bridged.phase, ErrorPhase::Flush);
        assert_eq!(bridged.code, "COMMIT_NO_ROOM");
    }
}
