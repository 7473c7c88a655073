//! Conditional-inclusion frames.
//!
//! One frame per nested `#if`/`#ifdef`/`#ifndef`. A frame is `Seeking`
//! while no branch of its chain has evaluated true yet, `Active` while
//! tokens from the taken branch flow through, and `Handled` once the
//! taken branch is behind us and every later branch must be skipped.

use smallvec::SmallVec;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameState {
    Seeking,
    Active,
    Handled,
}

#[derive(Copy, Clone, Debug)]
pub struct CondFrame {
    pub state: FrameState,
    /// Set on `#else`; a second `#else` in the same chain is an error.
    pub seen_else: bool,
}

/// Stack of conditional frames. Must be empty at end of input.
#[derive(Debug, Default)]
pub struct CondStack {
    frames: SmallVec<[CondFrame; 8]>,
}

impl CondStack {
    pub fn push(&mut self, taken: bool) {
        self.frames.push(CondFrame {
            state: if taken {
                FrameState::Active
            } else {
                FrameState::Seeking
            },
            seen_else: false,
        });
    }

    pub fn pop(&mut self) -> Option<CondFrame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&CondFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut CondFrame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn frame_lifecycle() {
        let mut stack = CondStack::default();
        assert!(stack.is_empty());
        stack.push(false);
        stack.push(true);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top_mut().map(|f| f.state), Some(FrameState::Active));
        stack.pop();
        let top = stack.top_mut().map(|f| f.state);
        assert_eq!(top, Some(FrameState::Seeking));
        stack.pop();
        assert!(stack.pop().is_none());
    }
}
