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

//! Turning a complete selection into a `Solution`.
//!
//! `extract` recomputes everything from the instance and never fails. The
//! search tracks reward and left-hand sides incrementally; `cross_check`
//! compares those tracked values with the recomputed ones.

use premia_model::{
    index::{ConstraintIndex, OptionIndex},
    model::Instance,
    solution::Solution,
};
use premia_search::num::SolverFloat;
use thiserror::Error;

/// A tracked value that disagrees with its recomputation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Discrepancy {
    #[error("tracked reward {tracked} differs from recomputed reward {recomputed}")]
    Reward { tracked: f64, recomputed: f64 },

    #[error(
        "tracked left-hand side {tracked} of constraint {constraint} differs from recomputed {recomputed}"
    )]
    Lhs {
        constraint: ConstraintIndex,
        tracked: f64,
        recomputed: f64,
    },

    #[error("tracked {tracked} left-hand sides for {expected} constraints")]
    LhsCount { tracked: usize, expected: usize },
}

/// Builds the `Solution` of a complete selection.
///
/// # Panics
///
/// Panics if `selections` does not hold one in-range option per entity.
pub fn extract<T>(instance: &Instance<T>, selections: &[OptionIndex]) -> Solution<T>
where
    T: SolverFloat,
{
    assert_eq!(
        selections.len(),
        instance.num_entities(),
        "called `extract` with {} selections for {} entities",
        selections.len(),
        instance.num_entities()
    );

    let total_reward = instance
        .entities()
        .map(|e| instance.option_reward(e, selections[e.get()]))
        .sum();

    let local_slacks = instance
        .entities()
        .map(|e| instance.threshold(e) - instance.option_risk(e, selections[e.get()]))
        .collect();

    let global_lhs: Vec<T> = instance
        .constraints()
        .map(|c| {
            instance
                .constraint_incidences(c)
                .iter()
                .map(|inc| instance.weight(inc, selections[inc.entity().get()]))
                .sum()
        })
        .collect();

    let global_slacks = instance
        .constraints()
        .zip(&global_lhs)
        .map(|(c, &lhs)| instance.budget(c) - lhs)
        .collect();

    Solution::new(
        total_reward,
        selections.to_vec(),
        global_lhs,
        local_slacks,
        global_slacks,
    )
}

/// Compares values tracked during the search with those of `solution`.
pub fn cross_check<T>(
    solution: &Solution<T>,
    tracked_reward: T,
    tracked_lhs: &[T],
) -> Result<(), Discrepancy>
where
    T: SolverFloat,
{
    if !tracked_reward.approx_eq(solution.total_reward()) {
        return Err(Discrepancy::Reward {
            tracked: tracked_reward.as_f64(),
            recomputed: solution.total_reward().as_f64(),
        });
    }

    if tracked_lhs.len() != solution.num_constraints() {
        return Err(Discrepancy::LhsCount {
            tracked: tracked_lhs.len(),
            expected: solution.num_constraints(),
        });
    }

    for (c, (&tracked, &recomputed)) in tracked_lhs
        .iter()
        .zip(solution.global_lhs_values())
        .enumerate()
    {
        if !tracked.approx_eq(recomputed) {
            return Err(Discrepancy::Lhs {
                constraint: ConstraintIndex::new(c),
                tracked: tracked.as_f64(),
                recomputed: recomputed.as_f64(),
            });
        }
    }

    Ok(())
}

/// Returns `true` if every option satisfies its local constraint and every
/// global left-hand side is within its budget up to tolerance.
pub fn is_feasible<T>(instance: &Instance<T>, solution: &Solution<T>) -> bool
where
    T: SolverFloat,
{
    let locally_feasible = instance
        .entities()
        .all(|e| instance.is_locally_feasible(e, solution.selection(e)));
    locally_feasible
        && instance
            .constraints()
            .all(|c| solution.global_lhs(c).approx_le(instance.budget(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_model::{
        index::EntityIndex,
        model::{GlobalConstraintSpec, InstanceBuilder},
    };

    fn o(i: usize) -> OptionIndex {
        OptionIndex::new(i)
    }

    fn instance() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
            .set_risk_threshold("A", 0.10)
            .add_entity("B", [(0.0, 0.01), (15.0, 0.03)])
            .add_global_constraint(
                GlobalConstraintSpec::new("weights", 5.0)
                    .with_term("A", 2, 4.0)
                    .with_term("B", 1, 2.0),
            );
        b.build().unwrap()
    }

    #[test]
    fn test_extract_recomputes_reward_lhs_and_slacks() {
        let inst = instance();
        let sol = extract(&inst, &[o(2), o(1)]);
        assert_eq!(sol.total_reward(), 55.0);
        assert_eq!(sol.global_lhs_values(), &[6.0]);
        assert_eq!(sol.global_slacks(), &[-1.0]);
        assert!((sol.local_slack(EntityIndex::new(0)) - (-0.05)).abs() < 1e-12);
        assert_eq!(sol.local_slack(EntityIndex::new(1)), f64::INFINITY);
        assert!(!is_feasible(&inst, &sol));
    }

    #[test]
    fn test_unlisted_options_weigh_zero() {
        let inst = instance();
        let sol = extract(&inst, &[o(1), o(0)]);
        assert_eq!(sol.global_lhs_values(), &[0.0]);
        assert!(is_feasible(&inst, &sol));
    }

    #[test]
    fn test_cross_check_accepts_matching_values() {
        let inst = instance();
        let sol = extract(&inst, &[o(1), o(1)]);
        assert_eq!(cross_check(&sol, 35.0, &[2.0]), Ok(()));
        assert_eq!(cross_check(&sol, 35.0 + 1e-12, &[2.0]), Ok(()));
    }

    #[test]
    fn test_cross_check_reports_discrepancies() {
        let inst = instance();
        let sol = extract(&inst, &[o(1), o(1)]);
        assert!(matches!(
            cross_check(&sol, 30.0, &[2.0]),
            Err(Discrepancy::Reward { .. })
        ));
        assert!(matches!(
            cross_check(&sol, 35.0, &[3.0]),
            Err(Discrepancy::Lhs { .. })
        ));
        assert_eq!(
            cross_check(&sol, 35.0, &[]),
            Err(Discrepancy::LhsCount {
                tracked: 0,
                expected: 1
            })
        );
    }

    #[test]
    #[should_panic(expected = "called `extract` with 1 selections for 2 entities")]
    fn test_extract_panics_on_missing_selection() {
        let _ = extract(&instance(), &[o(0)]);
    }
}
