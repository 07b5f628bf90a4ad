//! Processing stack: per-owner accumulation frames.
//!
//! Frames live in an arena and are addressed through a stack of handles.
//! A frame exists only while its owning tag is open; closing the tag moves
//! the frame's units out and recycles the slot.

use smallvec::SmallVec;

use crate::output::OutputUnit;

/// Handle to a live frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// Arena of accumulation frames with a handle stack.
#[derive(Debug, Default)]
pub struct ProcessingStack {
    slots: Vec<Option<Vec<OutputUnit>>>,
    free: Vec<usize>,
    handles: SmallVec<[FrameId; 16]>,
}

impl ProcessingStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new frame on top of the stack.
    pub fn push_frame(&mut self) -> FrameId {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(Vec::new());
                idx
            }
            None => {
                self.slots.push(Some(Vec::new()));
                self.slots.len() - 1
            }
        };
        let id = FrameId(idx);
        self.handles.push(id);
        id
    }

    /// Close the top frame and take its units.
    ///
    /// Returns `None` if `id` is not the top frame; the stack is unchanged.
    pub fn pop_frame(&mut self, id: FrameId) -> Option<Vec<OutputUnit>> {
        if self.handles.last() != Some(&id) {
            return None;
        }
        self.handles.pop();
        let units = self.slots.get_mut(id.0)?.take();
        self.free.push(id.0);
        units
    }

    /// Handle of the top frame.
    pub fn top(&self) -> Option<FrameId> {
        self.handles.last().copied()
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.handles.len()
    }

    /// Whether no frame is open.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Append units to the top frame.
    ///
    /// When no frame is open the units are handed back for root emission.
    pub fn extend_top(&mut self, units: Vec<OutputUnit>) -> Option<Vec<OutputUnit>> {
        let Some(top) = self.top() else {
            return Some(units);
        };
        match self.slots.get_mut(top.0).and_then(Option::as_mut) {
            Some(frame) => {
                frame.extend(units);
                None
            }
            None => Some(units),
        }
    }

    /// Number of units accumulated in a frame.
    pub fn frame_len(&self, id: FrameId) -> Option<usize> {
        self.slots.get(id.0)?.as_ref().map(Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn unit() -> OutputUnit {
        OutputUnit::element(Element::LineBreak)
    }

    #[test]
    fn root_units_are_handed_back() {
        let mut stack = ProcessingStack::new();
        let back = stack.extend_top(vec![unit()]).expect("no frame open");
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn frames_accumulate_and_move_out_in_order() {
        let mut stack = ProcessingStack::new();
        let outer = stack.push_frame();
        assert!(stack.extend_top(vec![unit()]).is_none());
        let inner = stack.push_frame();
        assert!(stack.extend_top(vec![unit(), unit()]).is_none());
        assert_eq!(stack.frame_len(outer), Some(1));
        assert_eq!(stack.frame_len(inner), Some(2));

        assert!(stack.pop_frame(outer).is_none(), "outer is not on top");
        let inner_units = stack.pop_frame(inner).expect("inner frame");
        assert_eq!(inner_units.len(), 2);
        assert_eq!(stack.frame_len(inner), None);
        let outer_units = stack.pop_frame(outer).expect("outer frame");
        assert_eq!(outer_units.len(), 1);
        assert!(stack.is_empty());
    }

    #[test]
    fn slots_are_recycled() {
        let mut stack = ProcessingStack::new();
        let first = stack.push_frame();
        stack.pop_frame(first).expect("frame");
        let second = stack.push_frame();
        assert_eq!(first, second);
        assert_eq!(stack.depth(), 1);
    }
}
