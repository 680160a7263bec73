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

//! Bound that drops every global constraint.

use crate::{bound::bounder::RelaxationBounder, state::SearchState};
use premia_model::{index::EntityIndex, model::Instance};
use premia_search::num::SolverFloat;

/// Ignores global constraints: every undecided entity contributes its best
/// locally feasible reward.
#[derive(Debug, Clone)]
pub struct IndependentBounder<T> {
    best_rewards: Vec<Option<T>>,
}

impl<T> Default for IndependentBounder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndependentBounder<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            best_rewards: Vec::new(),
        }
    }

    #[inline]
    pub fn preallocated(num_entities: usize) -> Self {
        Self {
            best_rewards: Vec::with_capacity(num_entities),
        }
    }
}

impl<T> RelaxationBounder<T> for IndependentBounder<T>
where
    T: SolverFloat,
{
    #[inline]
    fn name(&self) -> &str {
        "IndependentBounder"
    }

    fn prepare(&mut self, instance: &Instance<T>) {
        self.best_rewards.clear();
        self.best_rewards
            .extend(instance.entities().map(|e| best_local_reward(instance, e)));
    }

    fn upper_bound(&mut self, instance: &Instance<T>, state: &SearchState<T>) -> Option<T> {
        debug_assert_eq!(
            self.best_rewards.len(),
            instance.num_entities(),
            "called `IndependentBounder::upper_bound` before `prepare`"
        );

        let mut bound = state.current_reward();
        for e in state.unassigned() {
            bound = bound + self.best_rewards[e.get()]?;
        }
        Some(bound)
    }
}

/// Best locally feasible reward of `entity`, or `None` if every option
/// exceeds the threshold.
#[inline]
pub(crate) fn best_local_reward<T>(instance: &Instance<T>, entity: EntityIndex) -> Option<T>
where
    T: SolverFloat,
{
    instance
        .best_local_option(entity)
        .map(|o| instance.option_reward(entity, o))
}
