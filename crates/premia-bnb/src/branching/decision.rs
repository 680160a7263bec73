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
    index::{EntityIndex, OptionIndex},
    model::Instance,
};
use premia_search::num::SolverFloat;
use std::iter::FusedIterator;

/// Selecting `option` for `entity`, together with the upper bound of the
/// subtree it opens.
///
/// Builders emit decisions with an infinite bound; the engine replaces it
/// with the relaxation bound of the child before the decision is stacked.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decision<T> {
    bound: T,
    entity: EntityIndex,
    option: OptionIndex,
}

impl<T> Decision<T> {
    #[inline(always)]
    pub const fn new(entity: EntityIndex, option: OptionIndex, bound: T) -> Self {
        Self {
            bound,
            entity,
            option,
        }
    }

    #[inline(always)]
    pub const fn entity(&self) -> EntityIndex {
        self.entity
    }

    #[inline(always)]
    pub const fn option(&self) -> OptionIndex {
        self.option
    }

    #[inline(always)]
    pub fn bound(&self) -> T
    where
        T: Copy,
    {
        self.bound
    }

    /// Returns the decision with `bound` attached.
    #[inline(always)]
    pub fn with_bound(self, bound: T) -> Self {
        Self { bound, ..self }
    }
}

impl<T> std::fmt::Display for Decision<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Decision(entity: {}, option: {}, bound: {})",
            self.entity, self.option, self.bound
        )
    }
}

/// Every option of one entity, in menu order, as unbounded decisions.
#[derive(Clone, Debug)]
pub struct EntityOptions<T> {
    entity: EntityIndex,
    next: usize,
    end: usize,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> EntityOptions<T> {
    #[inline]
    pub fn new(entity: EntityIndex, num_options: usize) -> Self {
        Self {
            entity,
            next: 0,
            end: num_options,
            _phantom: std::marker::PhantomData,
        }
    }

    /// An iterator that yields nothing.
    #[inline]
    pub fn empty() -> Self {
        Self::new(EntityIndex::new(0), 0)
    }
}

impl<T> Iterator for EntityOptions<T>
where
    T: SolverFloat,
{
    type Item = Decision<T>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let option = OptionIndex::new(self.next);
        self.next += 1;
        Some(Decision::new(self.entity, option, T::infinity()))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for EntityOptions<T> where T: SolverFloat {}
impl<T> FusedIterator for EntityOptions<T> where T: SolverFloat {}

/// Chooses which undecided entity is branched on next.
///
/// `prepare` is called once per search after fixed assignments are applied;
/// `next_decision` yields one decision per option of the chosen entity, or
/// nothing when the state is complete.
pub trait DecisionBuilder<T>
where
    T: SolverFloat,
{
    type DecisionIterator<'a>: Iterator<Item = Decision<T>> + FusedIterator + 'a
    where
        Self: 'a,
        T: 'a;

    fn name(&self) -> &str;

    fn prepare(&mut self, instance: &Instance<T>, state: &SearchState<T>);

    fn next_decision<'a>(
        &'a mut self,
        instance: &'a Instance<T>,
        state: &'a SearchState<T>,
    ) -> Self::DecisionIterator<'a>;
}

/// Static branching order shared by the built-in builders: entities are
/// fixed once in `prepare`, and since the search decides exactly one entity
/// per level, the entity at depth `d` is `order[d]`.
#[derive(Clone, Debug, Default)]
pub(crate) struct StaticOrder {
    order: Vec<EntityIndex>,
    root_assigned: usize,
}

impl StaticOrder {
    #[inline]
    pub(crate) fn reset<T: SolverFloat>(
        &mut self,
        state: &SearchState<T>,
        order: impl IntoIterator<Item = EntityIndex>,
    ) {
        self.order.clear();
        self.order.extend(order);
        self.root_assigned = state.num_assigned();
    }

    #[inline]
    pub(crate) fn order(&self) -> &[EntityIndex] {
        &self.order
    }

    pub(crate) fn next<T: SolverFloat>(
        &self,
        instance: &Instance<T>,
        state: &SearchState<T>,
    ) -> EntityOptions<T> {
        if state.is_complete() {
            return EntityOptions::empty();
        }
        let depth = state.num_assigned() - self.root_assigned;
        let Some(&entity) = self.order.get(depth) else {
            return EntityOptions::empty();
        };
        debug_assert!(
            !state.is_assigned(entity),
            "called `StaticOrder::next` but entity {} is already assigned",
            entity
        );
        EntityOptions::new(entity, instance.num_options(entity))
    }
}
