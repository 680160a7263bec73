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

//! Multiple-choice knapsack relaxation.
//!
//! Every undecided entity touched by a global constraint is charged to the
//! first such constraint. Per constraint the remaining capacity is the budget
//! minus the decided left-hand side minus the minimum weights of the entities
//! charged elsewhere. The charged entities then share that capacity in a
//! fractional knapsack, filled greedily along the segments of their upper
//! hulls in order of decreasing reward per unit of weight. Entities touching
//! no constraint contribute their best locally feasible reward.

use crate::{
    bound::{
        bounder::RelaxationBounder,
        hull::{HullPoint, upper_hull},
        independent::best_local_reward,
    },
    state::SearchState,
};
use premia_model::{
    index::{ConstraintIndex, EntityIndex},
    model::Instance,
};
use premia_search::num::SolverFloat;

/// The static relaxation data of one entity.
#[derive(Copy, Clone, Debug, PartialEq)]
enum EntityRelaxation<T> {
    /// No option satisfies the local constraint.
    Infeasible,
    /// The entity touches no global constraint.
    Free { best_reward: T },
    /// The entity is charged to `constraint` with its lightest hull point.
    Covered {
        constraint: ConstraintIndex,
        base: HullPoint<T>,
    },
}

/// One step along the hull of a covered entity.
#[derive(Copy, Clone, Debug)]
struct Segment<T> {
    entity: EntityIndex,
    weight: T,
    reward: T,
}

/// Multiple-choice knapsack LP relaxation.
///
/// Every undecided entity touching a global constraint is charged to the
/// first constraint touching it. Per constraint, the relaxation picks the
/// lightest hull point of each charged entity and spends the remaining
/// capacity greedily on the hull segments with the best reward per weight,
/// taking the last one fractionally. The capacity is reduced by the partial
/// left-hand side and by the minimum weight of the undecided entities
/// charged elsewhere. Entities without global constraints contribute their
/// best locally feasible reward.
#[derive(Debug, Clone)]
pub struct KnapsackRelaxationBounder<T> {
    relaxations: Vec<EntityRelaxation<T>>,
    /// Hull segments grouped by constraint, each group sorted by decreasing
    /// reward per weight.
    segments: Vec<Segment<T>>,
    segment_offsets: Vec<usize>,
    /// Scratch: per constraint, the covered minimum weight and the sum of
    /// base weights of the charged undecided entities.
    covered_min: Vec<T>,
    base_weight: Vec<T>,
    scratch_points: Vec<HullPoint<T>>,
    scratch_hull: Vec<HullPoint<T>>,
}

impl<T> Default for KnapsackRelaxationBounder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KnapsackRelaxationBounder<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            relaxations: Vec::new(),
            segments: Vec::new(),
            segment_offsets: Vec::new(),
            covered_min: Vec::new(),
            base_weight: Vec::new(),
            scratch_points: Vec::new(),
            scratch_hull: Vec::new(),
        }
    }

    #[inline]
    pub fn preallocated(num_entities: usize, num_constraints: usize, num_options: usize) -> Self {
        Self {
            relaxations: Vec::with_capacity(num_entities),
            segments: Vec::with_capacity(num_options),
            segment_offsets: Vec::with_capacity(num_constraints + 1),
            covered_min: Vec::with_capacity(num_constraints),
            base_weight: Vec::with_capacity(num_constraints),
            scratch_points: Vec::new(),
            scratch_hull: Vec::new(),
        }
    }
}

impl<T> KnapsackRelaxationBounder<T>
where
    T: SolverFloat,
{
    fn relax_entity(&mut self, instance: &Instance<T>, entity: EntityIndex) -> EntityRelaxation<T> {
        let Some(incidence) = instance.entity_incidences(entity).next() else {
            return match best_local_reward(instance, entity) {
                Some(best_reward) => EntityRelaxation::Free { best_reward },
                None => EntityRelaxation::Infeasible,
            };
        };

        self.scratch_points.clear();
        self.scratch_points.extend(instance.locally_feasible_options(entity).map(|o| {
            HullPoint::new(instance.weight(incidence, o), instance.option_reward(entity, o))
        }));
        upper_hull(&mut self.scratch_points, &mut self.scratch_hull);

        let Some(&base) = self.scratch_hull.first() else {
            return EntityRelaxation::Infeasible;
        };
        for pair in self.scratch_hull.windows(2) {
            self.segments.push(Segment {
                entity,
                weight: pair[1].weight - pair[0].weight,
                reward: pair[1].reward - pair[0].reward,
            });
        }
        EntityRelaxation::Covered {
            constraint: incidence.constraint(),
            base,
        }
    }
}

impl<T> RelaxationBounder<T> for KnapsackRelaxationBounder<T>
where
    T: SolverFloat,
{
    #[inline]
    fn name(&self) -> &str {
        "KnapsackRelaxationBounder"
    }

    fn prepare(&mut self, instance: &Instance<T>) {
        let num_constraints = instance.num_constraints();
        self.relaxations.clear();
        self.segments.clear();

        for e in instance.entities() {
            let relaxation = self.relax_entity(instance, e);
            self.relaxations.push(relaxation);
        }

        // Group segments by their constraint, then order each group by slope.
        let constraint_of = |s: &Segment<T>| match self.relaxations[s.entity.get()] {
            EntityRelaxation::Covered { constraint, .. } => constraint.get(),
            _ => 0,
        };
        let mut segments = std::mem::take(&mut self.segments);
        segments.sort_by(|a, b| {
            constraint_of(a).cmp(&constraint_of(b)).then_with(|| {
                (b.reward / b.weight)
                    .partial_cmp(&(a.reward / a.weight))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        self.segment_offsets.clear();
        self.segment_offsets.resize(num_constraints + 1, 0);
        for s in &segments {
            self.segment_offsets[constraint_of(s) + 1] += 1;
        }
        for c in 0..num_constraints {
            self.segment_offsets[c + 1] += self.segment_offsets[c];
        }
        self.segments = segments;

        self.covered_min.clear();
        self.covered_min.resize(num_constraints, T::zero());
        self.base_weight.clear();
        self.base_weight.resize(num_constraints, T::zero());
    }

    fn upper_bound(&mut self, instance: &Instance<T>, state: &SearchState<T>) -> Option<T> {
        debug_assert_eq!(
            self.relaxations.len(),
            instance.num_entities(),
            "called `KnapsackRelaxationBounder::upper_bound` before `prepare`"
        );

        self.covered_min.fill(T::zero());
        self.base_weight.fill(T::zero());

        let mut bound = state.current_reward();
        for e in state.unassigned() {
            match self.relaxations[e.get()] {
                EntityRelaxation::Infeasible => return None,
                EntityRelaxation::Free { best_reward } => bound = bound + best_reward,
                EntityRelaxation::Covered { constraint, base } => {
                    let c = constraint.get();
                    bound = bound + base.reward;
                    self.base_weight[c] = self.base_weight[c] + base.weight;
                    self.covered_min[c] = self.covered_min[c] + base.weight;
                }
            }
        }

        for c in instance.constraints() {
            let i = c.get();
            let charged_elsewhere = (state.pending_min(c) - self.covered_min[i]).max(T::zero());
            let capacity = instance.budget(c) - state.lhs(c) - charged_elsewhere;
            let base_weight = self.base_weight[i];
            if !base_weight.approx_le(capacity) {
                return None;
            }

            let mut remaining = (capacity - base_weight).max(T::zero());
            for segment in &self.segments[self.segment_offsets[i]..self.segment_offsets[i + 1]] {
                if remaining <= T::zero() {
                    break;
                }
                if state.is_assigned(segment.entity) {
                    continue;
                }
                if segment.weight <= remaining {
                    bound = bound + segment.reward;
                    remaining = remaining - segment.weight;
                } else {
                    bound = bound + segment.reward * (remaining / segment.weight);
                    remaining = T::zero();
                }
            }
        }

        Some(bound)
    }
}
