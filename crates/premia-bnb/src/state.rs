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

use premia_model::{
    index::{ConstraintIndex, EntityIndex, OptionIndex},
    model::Instance,
};
use fixedbitset::FixedBitSet;
use num_traits::Float;

/// The partial assignment explored by the search.
///
/// Besides the selections it tracks, per global constraint, the decided
/// left-hand side and the sum of the minimum weights of the undecided
/// entities touching the constraint (`pending_min`). Mutation goes through
/// `SearchTrail` so every change can be undone on backtrack.
#[derive(Debug, Clone)]
pub struct SearchState<T> {
    selections: Vec<OptionIndex>,
    lhs: Vec<T>,
    pending_min: Vec<T>,
    assigned: FixedBitSet,
    current_reward: T,
    num_entities: usize,
    num_assigned: usize,
}

impl<T> SearchState<T>
where
    T: Float,
{
    /// Creates the empty assignment for `instance`.
    pub fn new(instance: &Instance<T>) -> Self {
        let num_entities = instance.num_entities();
        let num_constraints = instance.num_constraints();
        let pending_min = instance
            .constraints()
            .map(|c| {
                instance
                    .constraint_incidences(c)
                    .iter()
                    .fold(T::zero(), |acc, inc| acc + inc.min_weight())
            })
            .collect();

        Self {
            selections: vec![OptionIndex::new(0); num_entities],
            lhs: vec![T::zero(); num_constraints],
            pending_min,
            assigned: FixedBitSet::with_capacity(num_entities),
            current_reward: T::zero(),
            num_entities,
            num_assigned: 0,
        }
    }

    #[inline]
    pub fn num_entities(&self) -> usize {
        self.num_entities
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.lhs.len()
    }

    #[inline]
    pub fn num_assigned(&self) -> usize {
        self.num_assigned
    }

    /// Returns `true` once every entity has a selection.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.num_assigned == self.num_entities
    }

    /// Sum of the rewards of the decided entities.
    #[inline]
    pub fn current_reward(&self) -> T {
        self.current_reward
    }

    #[inline]
    pub fn set_current_reward(&mut self, reward: T) {
        self.current_reward = reward;
    }

    /// Checks whether `entity` is decided.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is out of bounds `0..num_entities`.
    #[inline]
    pub fn is_assigned(&self, entity: EntityIndex) -> bool {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities,
            "called `SearchState::is_assigned` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities,
            index
        );
        self.assigned.contains(index)
    }

    /// Returns the option selected for `entity`, if decided.
    #[inline]
    pub fn selection(&self, entity: EntityIndex) -> Option<OptionIndex> {
        self.is_assigned(entity)
            .then(|| self.selections[entity.get()])
    }

    /// Raw selection vector. Entries of undecided entities are meaningless.
    #[inline]
    pub fn selections(&self) -> &[OptionIndex] {
        &self.selections
    }

    /// Decided left-hand side of `constraint`.
    #[inline]
    pub fn lhs(&self, constraint: ConstraintIndex) -> T {
        self.lhs[constraint.get()]
    }

    #[inline]
    pub fn lhs_values(&self) -> &[T] {
        &self.lhs
    }

    #[inline]
    pub fn set_lhs(&mut self, constraint: ConstraintIndex, value: T) {
        self.lhs[constraint.get()] = value;
    }

    /// Sum of the minimum weights of the undecided entities touching
    /// `constraint`.
    #[inline]
    pub fn pending_min(&self, constraint: ConstraintIndex) -> T {
        self.pending_min[constraint.get()]
    }

    #[inline]
    pub fn set_pending_min(&mut self, constraint: ConstraintIndex, value: T) {
        self.pending_min[constraint.get()] = value;
    }

    /// Marks `entity` as decided with `option`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is out of bounds or already
    /// assigned.
    #[inline]
    pub fn assign(&mut self, entity: EntityIndex, option: OptionIndex) {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities,
            "called `SearchState::assign` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities,
            index
        );
        debug_assert!(
            !self.assigned.contains(index),
            "called `SearchState::assign` with entity {} which is already assigned",
            entity
        );

        self.assigned.insert(index);
        self.selections[index] = option;
        self.num_assigned += 1;
    }

    /// Marks `entity` as undecided.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is out of bounds or not assigned.
    #[inline]
    pub fn unassign(&mut self, entity: EntityIndex) {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities,
            "called `SearchState::unassign` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities,
            index
        );
        debug_assert!(
            self.assigned.contains(index),
            "called `SearchState::unassign` with entity {} which is not assigned",
            entity
        );

        self.assigned.set(index, false);
        self.num_assigned -= 1;
    }

    /// Iterates the undecided entities in declaration order.
    #[inline]
    pub fn unassigned(&self) -> impl Iterator<Item = EntityIndex> + '_ {
        self.assigned.zeroes().map(EntityIndex::new)
    }
}

impl<T> std::fmt::Display for SearchState<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchState(assigned: {}/{}, reward: {})",
            self.num_assigned, self.num_entities, self.current_reward
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_model::model::InstanceBuilder;

    fn instance() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.1), (2.0, 0.3)])
            .add_entity("B", [(3.0, 0.2), (4.0, 0.5)])
            .add_total_risk_constraint("total", 0.6, ["A", "B"]);
        b.build().unwrap()
    }

    #[test]
    fn test_new_state_is_empty_with_pending_minimums() {
        let inst = instance();
        let s = SearchState::new(&inst);
        assert_eq!(s.num_entities(), 2);
        assert_eq!(s.num_constraints(), 1);
        assert_eq!(s.num_assigned(), 0);
        assert!(!s.is_complete());
        assert_eq!(s.current_reward(), 0.0);
        assert_eq!(s.lhs(ConstraintIndex::new(0)), 0.0);
        assert!((s.pending_min(ConstraintIndex::new(0)) - 0.3).abs() < 1e-12);
        assert_eq!(s.unassigned().count(), 2);
    }

    #[test]
    fn test_assign_and_unassign() {
        let inst = instance();
        let mut s = SearchState::new(&inst);
        let b = EntityIndex::new(1);
        s.assign(b, OptionIndex::new(1));
        assert!(s.is_assigned(b));
        assert_eq!(s.selection(b), Some(OptionIndex::new(1)));
        assert_eq!(s.selection(EntityIndex::new(0)), None);
        assert_eq!(s.unassigned().collect::<Vec<_>>(), vec![EntityIndex::new(0)]);

        s.unassign(b);
        assert!(!s.is_assigned(b));
        assert_eq!(s.num_assigned(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already assigned")]
    fn test_double_assign_panics_in_debug() {
        let inst = instance();
        let mut s = SearchState::new(&inst);
        s.assign(EntityIndex::new(0), OptionIndex::new(0));
        s.assign(EntityIndex::new(0), OptionIndex::new(1));
    }

    #[test]
    fn test_display() {
        let inst = instance();
        let s = SearchState::new(&inst);
        assert_eq!(format!("{}", s), "SearchState(assigned: 0/2, reward: 0)");
    }
}
