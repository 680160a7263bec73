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

use crate::state::SearchState;
use premia_model::{
    index::{ConstraintIndex, EntityIndex, OptionIndex},
    model::Instance,
};
use num_traits::Float;

/// One undoable change to the search state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TrailEntry<T> {
    /// An entity was decided; undo restores the reward.
    Assignment { entity: EntityIndex, old_reward: T },
    /// A global constraint's tracked values changed.
    ConstraintUpdate {
        constraint: ConstraintIndex,
        old_lhs: T,
        old_pending: T,
    },
}

impl<T> std::fmt::Display for TrailEntry<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrailEntry::Assignment { entity, old_reward } => {
                write!(f, "Assignment(entity: {}, old_reward: {})", entity, old_reward)
            }
            TrailEntry::ConstraintUpdate {
                constraint,
                old_lhs,
                old_pending,
            } => write!(
                f,
                "ConstraintUpdate(constraint: {}, old_lhs: {}, old_pending: {})",
                constraint, old_lhs, old_pending
            ),
        }
    }
}

/// Undo log of the search. `frames[i]` is the position in `entries` where
/// depth `i` began.
#[derive(Debug, Clone)]
pub struct SearchTrail<T> {
    entries: Vec<TrailEntry<T>>,
    frames: Vec<usize>,
}

impl<T> Default for SearchTrail<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SearchTrail<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Creates a trail with room for a full-depth dive.
    #[inline]
    pub fn preallocated(num_entities: usize, num_incidences: usize) -> Self {
        Self {
            entries: Vec::with_capacity(num_entities + num_incidences),
            frames: Vec::with_capacity(num_entities + 1),
        }
    }

    /// Grows the buffers to at least the preallocated capacity.
    pub fn ensure_capacity(&mut self, num_entities: usize, num_incidences: usize) {
        let entry_capacity = num_entities + num_incidences;
        if self.entries.capacity() < entry_capacity {
            self.entries
                .reserve(entry_capacity - self.entries.len());
        }
        if self.frames.capacity() < num_entities + 1 {
            self.frames.reserve(num_entities + 1 - self.frames.len());
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

    /// Marks the start of a new decision level.
    #[inline]
    pub fn push_frame(&mut self) {
        self.frames.push(self.entries.len());
    }

    /// Resets the trail markers without undoing any state changes.
    #[inline]
    pub fn reset(&mut self) {
        self.entries.clear();
        self.frames.clear();
    }

    #[inline]
    pub fn allocated_memory_bytes(&self) -> usize {
        self.entries.capacity() * std::mem::size_of::<TrailEntry<T>>()
            + self.frames.capacity() * std::mem::size_of::<usize>()
    }

    #[inline]
    pub fn iter_entries(&self) -> std::slice::Iter<'_, TrailEntry<T>> {
        self.entries.iter()
    }
}

impl<T> SearchTrail<T>
where
    T: Float,
{
    /// Decides `entity` with `option`, updating the reward and every
    /// touching global constraint, and records the old values.
    ///
    /// # Panics
    ///
    /// Panics if `entity` or `option` is out of bounds, or in debug builds
    /// if the entity is already assigned.
    pub fn apply_assignment(
        &mut self,
        state: &mut SearchState<T>,
        instance: &Instance<T>,
        entity: EntityIndex,
        option: OptionIndex,
    ) {
        debug_assert!(
            entity.get() < state.num_entities(),
            "called `SearchTrail::apply_assignment` with entity index out of bounds: the len is {} but the index is {}",
            state.num_entities(),
            entity.get()
        );
        debug_assert!(
            !state.is_assigned(entity),
            "called `SearchTrail::apply_assignment` with entity {} which is already assigned",
            entity
        );

        let old_reward = state.current_reward();
        self.entries.push(TrailEntry::Assignment { entity, old_reward });
        state.set_current_reward(old_reward + instance.option_reward(entity, option));
        state.assign(entity, option);

        for incidence in instance.entity_incidences(entity) {
            let constraint = incidence.constraint();
            let old_lhs = state.lhs(constraint);
            let old_pending = state.pending_min(constraint);
            self.entries.push(TrailEntry::ConstraintUpdate {
                constraint,
                old_lhs,
                old_pending,
            });
            state.set_lhs(constraint, old_lhs + instance.weight(incidence, option));
            state.set_pending_min(
                constraint,
                (old_pending - incidence.min_weight()).max(T::zero()),
            );
        }
    }

    /// Pops the current frame, undoing every change made since it was
    /// pushed.
    pub fn backtrack(&mut self, state: &mut SearchState<T>) {
        let Some(start) = self.frames.pop() else {
            return;
        };
        while self.entries.len() > start {
            if let Some(entry) = self.entries.pop() {
                Self::undo_entry(state, entry);
            }
        }
    }

    /// Undoes every frame.
    pub fn clear(&mut self, state: &mut SearchState<T>) {
        while let Some(entry) = self.entries.pop() {
            Self::undo_entry(state, entry);
        }
        self.frames.clear();
    }

    #[inline]
    fn undo_entry(state: &mut SearchState<T>, entry: TrailEntry<T>) {
        match entry {
            TrailEntry::Assignment { entity, old_reward } => {
                state.unassign(entity);
                state.set_current_reward(old_reward);
            }
            TrailEntry::ConstraintUpdate {
                constraint,
                old_lhs,
                old_pending,
            } => {
                state.set_lhs(constraint, old_lhs);
                state.set_pending_min(constraint, old_pending);
            }
        }
    }
}

impl<T> std::fmt::Display for SearchTrail<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchTrail(entries: {}, frames: {})",
            self.entries.len(),
            self.frames.len()
        )
    }
}
