// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Vector-backed frame stack
//!
//! Frames are pushed and popped by position instead of being linked to
//! their parents. Sub-evaluations that must not see the object currently
//! being navigated (index expressions, filter predicates, loop bodies)
//! rewind the navigation frames above the nearest block boundary into a
//! parking area and restore them afterwards.

use crate::ast::Scope;
use crate::model::Value;
use std::sync::Arc;

/// Role of a frame on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    /// Root data object
    Root,
    /// Context variables
    Variables,
    /// Object navigated by a path
    Navigation,
    /// Filter element or loop and value block bindings
    Block,
    /// Parameters of an interpreted function; frames below are invisible
    Function,
}

#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) object: Value,
    pub(crate) scope: Option<Arc<Scope>>,
    pub(crate) kind: FrameKind,
    pub(crate) this_candidate: bool,
    pub(crate) null_safe: bool,
}

impl Frame {
    pub(crate) fn new(kind: FrameKind, object: Value) -> Self {
        Self {
            object,
            scope: None,
            kind,
            this_candidate: false,
            null_safe: false,
        }
    }

    pub(crate) fn with_scope(mut self, scope: &Arc<Scope>) -> Self {
        self.scope = Some(Arc::clone(scope));
        self
    }

    pub(crate) fn this_candidate(mut self) -> Self {
        self.this_candidate = true;
        self
    }

    pub(crate) fn null_safe(mut self, null_safe: bool) -> Self {
        self.null_safe = null_safe;
        self
    }

    fn is_block_boundary(&self) -> bool {
        self.kind != FrameKind::Navigation
    }
}

/// Number of frames parked by a rewind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) struct RewindMark(usize);

#[derive(Debug, Default)]
pub(crate) struct FrameStack {
    frames: Vec<Frame>,
    parked: Vec<Frame>,
}

impl FrameStack {
    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn height(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn truncate(&mut self, height: usize) {
        self.frames.truncate(height);
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
        self.parked.clear();
    }

    pub(crate) fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Park navigation frames above the nearest block boundary
    pub(crate) fn rewind(&mut self) -> RewindMark {
        let mut count = 0;
        while let Some(frame) = self.frames.last() {
            if frame.is_block_boundary() {
                break;
            }
            if let Some(frame) = self.frames.pop() {
                self.parked.push(frame);
                count += 1;
            }
        }
        RewindMark(count)
    }

    /// Bring back the frames parked by the matching rewind
    pub(crate) fn restore(&mut self, mark: RewindMark) {
        for _ in 0..mark.0 {
            match self.parked.pop() {
                Some(frame) => self.frames.push(frame),
                None => break,
            }
        }
    }

    /// Frames visible to name resolution, innermost first. An interpreted
    /// function frame is the last visible one.
    pub(crate) fn visible(&self) -> impl Iterator<Item = &Frame> {
        let floor = self
            .frames
            .iter()
            .rposition(|frame| frame.kind == FrameKind::Function)
            .unwrap_or(0);
        self.frames[floor..].iter().rev()
    }

    /// Null-safety of the innermost navigation chain: any frame from the
    /// top down to the nearest block boundary
    pub(crate) fn is_null_safe(&self) -> bool {
        for frame in self.frames.iter().rev() {
            if frame.null_safe {
                return true;
            }
            if frame.is_block_boundary() {
                break;
            }
        }
        false
    }

    /// Nearest `this` candidate
    pub(crate) fn this_object(&self) -> Option<&Value> {
        self.visible()
            .find(|frame| frame.this_candidate)
            .map(|frame| &frame.object)
    }
}
