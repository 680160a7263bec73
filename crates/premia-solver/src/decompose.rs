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

//! Splitting an instance into independent components.
//!
//! Two entities belong to the same component when a chain of global
//! constraints links them. Components share no constraint, so each can be
//! solved on its own and the optima combine by summation.

use fixedbitset::FixedBitSet;
use premia_model::{index::EntityIndex, model::Instance};
use premia_search::num::SolverFloat;

/// Entity sets of the connected components, stored contiguously.
///
/// Components are ordered by their smallest entity and list their entities
/// in ascending order, so a component's local index `i` maps back to
/// `component(k)[i]` in the original instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Components {
    entities: Vec<EntityIndex>,
    offsets: Vec<usize>,
}

impl Components {
    /// Computes the connected components of the entity/constraint
    /// incidence graph.
    pub fn compute<T>(instance: &Instance<T>) -> Self
    where
        T: SolverFloat,
    {
        let num_entities = instance.num_entities();
        let mut entities = Vec::with_capacity(num_entities);
        let mut offsets = Vec::with_capacity(num_entities + 1);
        offsets.push(0);

        let mut seen_entities = FixedBitSet::with_capacity(num_entities);
        let mut seen_constraints = FixedBitSet::with_capacity(instance.num_constraints());
        let mut pending = Vec::new();

        for seed in instance.entities() {
            if seen_entities.contains(seed.get()) {
                continue;
            }
            let start = entities.len();
            seen_entities.insert(seed.get());
            pending.push(seed);

            while let Some(entity) = pending.pop() {
                entities.push(entity);
                for constraint in instance.touching_constraints(entity) {
                    if seen_constraints.put(constraint.get()) {
                        continue;
                    }
                    for incidence in instance.constraint_incidences(constraint) {
                        let other = incidence.entity();
                        if !seen_entities.put(other.get()) {
                            pending.push(other);
                        }
                    }
                }
            }

            entities[start..].sort_unstable();
            offsets.push(entities.len());
        }

        Self { entities, offsets }
    }

    /// A single component holding every entity.
    pub fn single<T>(instance: &Instance<T>) -> Self
    where
        T: SolverFloat,
    {
        let entities: Vec<EntityIndex> = instance.entities().collect();
        let offsets = if entities.is_empty() {
            vec![0]
        } else {
            vec![0, entities.len()]
        };
        Self { entities, offsets }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the entities of component `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn component(&self, index: usize) -> &[EntityIndex] {
        debug_assert!(
            index < self.len(),
            "called `Components::component` with index out of bounds: the len is {} but the index is {}",
            self.len(),
            index
        );
        &self.entities[self.offsets[index]..self.offsets[index + 1]]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[EntityIndex]> + '_ {
        (0..self.len()).map(move |k| self.component(k))
    }

    /// Size of the largest component.
    pub fn largest(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }
}
