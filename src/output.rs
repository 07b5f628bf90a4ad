//! Output units produced by tag handlers.
//!
//! An [`OutputUnit`] is either finished content ([`OutputUnit::Immediate`])
//! or a [`DeferredWrite`] that needs the final page geometry. Deferred units
//! are opaque to handlers; only the page writer executes them, and
//! [`DeferredWrite::write`] consumes the action so it can run at most once.

use core::fmt;

use crate::element::{Chunk, Element};
use crate::error::LayoutCommitError;

/// Horizontal alignment inside a direct column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Content placed directly at absolute coordinates, bypassing flow layout.
///
/// Coordinates are page pixels with `y` growing downwards; `top < bottom`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleColumn {
    /// Chunks in the column.
    pub chunks: Vec<Chunk>,
    /// Left x.
    pub left: i32,
    /// Top y.
    pub top: i32,
    /// Right x.
    pub right: i32,
    /// Bottom y.
    pub bottom: i32,
    /// Line leading in pixels.
    pub leading: i32,
    /// Horizontal alignment.
    pub align: ColumnAlign,
}

impl SimpleColumn {
    /// Column width.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Column height.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Page surface exposed to deferred writes.
pub trait DirectContent {
    /// 1-based number of the page currently being written.
    fn page_number(&self) -> usize;

    /// Place a column directly on the current page.
    fn commit_column(&mut self, column: SimpleColumn) -> Result<(), LayoutCommitError>;
}

/// Geometry-dependent action executed when its content is flushed.
pub trait DeferredWrite: Send {
    /// Perform the draw at `vertical_position` on `surface`.
    fn write(
        self: Box<Self>,
        surface: &mut dyn DirectContent,
        vertical_position: i32,
    ) -> Result<(), LayoutCommitError>;

    /// Short label for diagnostics.
    fn describe(&self) -> String {
        "deferred write".to_string()
    }
}

/// Result of a handler call.
pub enum OutputUnit {
    /// Finished elements in reading order.
    Immediate(Vec<Element>),
    /// Action bound to final page geometry.
    Deferred(Box<dyn DeferredWrite>),
}

impl OutputUnit {
    /// Wrap a single element.
    pub fn element(element: Element) -> Self {
        Self::Immediate(vec![element])
    }

    /// Wrap a deferred action.
    pub fn deferred<D: DeferredWrite + 'static>(action: D) -> Self {
        Self::Deferred(Box::new(action))
    }

    /// Whether this unit is deferred.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Immediate elements, or `None` for a deferred unit.
    pub fn elements(&self) -> Option<&[Element]> {
        match self {
            Self::Immediate(elements) => Some(elements),
            Self::Deferred(_) => None,
        }
    }
}

impl fmt::Debug for OutputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(elements) => f.debug_tuple("Immediate").field(elements).finish(),
            Self::Deferred(action) => f.debug_tuple("Deferred").field(&action.describe()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::TextStyle;

    struct Recorder {
        committed: Vec<SimpleColumn>,
    }

    impl DirectContent for Recorder {
        fn page_number(&self) -> usize {
            1
        }

        fn commit_column(&mut self, column: SimpleColumn) -> Result<(), LayoutCommitError> {
            self.committed.push(column);
            Ok(())
        }
    }

    struct Marker;

    impl DeferredWrite for Marker {
        fn write(
            self: Box<Self>,
            surface: &mut dyn DirectContent,
            vertical_position: i32,
        ) -> Result<(), LayoutCommitError> {
            surface.commit_column(SimpleColumn {
                chunks: vec![Chunk::new("x", TextStyle::default())],
                left: 0,
                top: vertical_position,
                right: 10,
                bottom: vertical_position + 10,
                leading: 10,
                align: ColumnAlign::Left,
            })
        }
    }

    #[test]
    fn deferred_unit_runs_against_surface() {
        let unit = OutputUnit::deferred(Marker);
        assert!(unit.is_deferred());
        assert!(unit.elements().is_none());
        let mut surface = Recorder {
            committed: Vec::new(),
        };
        let OutputUnit::Deferred(action) = unit else {
            panic!("expected deferred unit");
        };
        action.write(&mut surface, 40).expect("commit should succeed");
        assert_eq!(surface.committed.len(), 1);
        assert_eq!(surface.committed[0].top, 40);
        assert_eq!(surface.committed[0].height(), 10);
    }

    #[test]
    fn debug_does_not_expose_deferred_internals() {
        let unit = OutputUnit::deferred(Marker);
        assert_eq!(format!("{:?}", unit), "Deferred(\"deferred write\")");
    }
}
