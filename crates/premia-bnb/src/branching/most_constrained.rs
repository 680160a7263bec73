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

use crate::{
    branching::decision::{DecisionBuilder, EntityOptions, StaticOrder},
    state::SearchState,
};
use premia_model::{index::EntityIndex, model::Instance};
use premia_search::num::SolverFloat;

/// Branches first on the entities with the fewest locally feasible options,
/// then on those touching the most global constraints, then in declaration
/// order.
///
/// Entities whose menu is already narrow fail fast, and entities shared by
/// many budgets tighten the relaxation early.
#[derive(Debug, Clone, Default)]
pub struct MostConstrainedBuilder {
    order: StaticOrder,
    keys: Vec<(usize, std::cmp::Reverse<usize>, EntityIndex)>,
}

impl MostConstrainedBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the branching order computed by the last `prepare`.
    #[inline]
    pub fn order(&self) -> &[EntityIndex] {
        self.order.order()
    }
}

impl<T> DecisionBuilder<T> for MostConstrainedBuilder
where
    T: SolverFloat,
{
    type DecisionIterator<'a>
        = EntityOptions<T>
    where
        T: 'a,
        Self: 'a;

    fn name(&self) -> &str {
        "MostConstrainedBuilder"
    }

    fn prepare(&mut self, instance: &Instance<T>, state: &SearchState<T>) {
        self.keys.clear();
        self.keys.extend(
            instance
                .entities()
                .filter(|&e| !state.is_assigned(e))
                .map(|e| {
                    (
                        instance.locally_feasible_options(e).count(),
                        std::cmp::Reverse(instance.num_touching_constraints(e)),
                        e,
                    )
                }),
        );
        self.keys.sort_unstable();
        self.order
            .reset(state, self.keys.iter().map(|&(_, _, e)| e));
    }

    fn next_decision<'a>(
        &'a mut self,
        instance: &'a Instance<T>,
        state: &'a SearchState<T>,
    ) -> Self::DecisionIterator<'a> {
        self.order.next(instance, state)
    }
}
