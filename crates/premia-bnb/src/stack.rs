// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::branching::decision::Decision;

/// Pending decisions of every open level. `frames[i]` is the position in
/// `entries` where depth `i` began; the top of the stack is explored next.
#[derive(Clone, Debug)]
pub struct SearchStack<T> {
    entries: Vec<Decision<T>>,
    frames: Vec<usize>,
}

impl<T> Default for SearchStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SearchStack<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Creates a stack sized for a full dive where every level keeps all of
    /// its `max_options` children.
    #[inline]
    pub fn preallocated(max_options: usize, num_entities: usize) -> Self {
        Self {
            entries: Vec::with_capacity(num_entities.saturating_mul(max_options)),
            frames: Vec::with_capacity(num_entities.saturating_add(1)),
        }
    }

    #[inline]
    pub fn ensure_capacity(&mut self, max_options: usize, num_entities: usize) {
        let entry_capacity = num_entities.saturating_mul(max_options);
        let frame_capacity = num_entities.saturating_add(1);

        if self.entries.capacity() < entry_capacity {
            self.entries.reserve(entry_capacity - self.entries.len());
        }
        if self.frames.capacity() < frame_capacity {
            self.frames.reserve(frame_capacity - self.frames.len());
        }
    }

    #[inline]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Alias for `num_frames`.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn push_frame(&mut self) {
        self.frames.push(self.entries.len());
    }

    /// Pops the current frame and discards its remaining decisions.
    #[inline]
    pub fn pop_frame(&mut self) -> Option<()> {
        let start = self.frames.pop()?;
        self.entries.truncate(start);
        Some(())
    }

    #[inline]
    pub fn push(&mut self, decision: Decision<T>) {
        self.entries.push(decision);
    }

    #[inline]
    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = Decision<T>>,
    {
        self.entries.extend(iter);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Decision<T>> {
        self.entries.pop()
    }

    /// Clears all entries and frames, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.entries.clear();
        self.frames.clear();
    }

    #[inline]
    pub fn current_level_start(&self) -> Option<usize> {
        self.frames.last().copied()
    }

    #[inline]
    pub fn is_current_level_empty(&self) -> bool {
        match self.current_level_start() {
            Some(start) => self.entries.len() == start,
            None => true,
        }
    }

    #[inline]
    pub fn current_frame_entries(&self) -> &[Decision<T>] {
        match self.frames.last() {
            Some(&start) => &self.entries[start..],
            None => &[],
        }
    }

    #[inline]
    pub fn allocated_memory_bytes(&self) -> usize {
        self.entries.capacity() * std::mem::size_of::<Decision<T>>()
            + self.frames.capacity() * std::mem::size_of::<usize>()
    }
}

impl<T> std::fmt::Display for SearchStack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchStack(entries: {}, frames: {})",
            self.entries.len(),
            self.frames.len()
        )
    }
}
