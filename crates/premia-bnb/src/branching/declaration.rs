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
use premia_model::model::Instance;
use premia_search::num::SolverFloat;

/// Branches on entities in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DeclarationOrderBuilder {
    order: StaticOrder,
}

impl DeclarationOrderBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> DecisionBuilder<T> for DeclarationOrderBuilder
where
    T: SolverFloat,
{
    type DecisionIterator<'a>
        = EntityOptions<T>
    where
        T: 'a,
        Self: 'a;

    fn name(&self) -> &str {
        "DeclarationOrderBuilder"
    }

    fn prepare(&mut self, instance: &Instance<T>, state: &SearchState<T>) {
        let order = instance.entities().filter(|&e| !state.is_assigned(e));
        self.order.reset(state, order);
    }

    fn next_decision<'a>(
        &'a mut self,
        instance: &'a Instance<T>,
        state: &'a SearchState<T>,
    ) -> Self::DecisionIterator<'a> {
        self.order.next(instance, state)
    }
}
