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

//! Depth-first branch-and-bound over entity selections.
//!
//! The search owns an explicit decision stack and an undo trail, both
//! organized in frames: descending into a child pushes one frame on each,
//! backtracking pops one from each. A node is expanded by asking the
//! `DecisionBuilder` for the options of the next entity; every child is
//! checked against the local threshold and the touching budgets, then
//! applied tentatively to compute its relaxation bound, and undone. The
//! surviving children are stacked so that the highest bound is explored
//! first, with the lower option index first among equal bounds.
//!
//! The incumbent is replaced when a complete, feasible selection has a
//! higher reward, or an equal reward (within tolerance) and a
//! lexicographically smaller selection vector. Nodes are kept while they
//! could still produce such a replacement.

use crate::{
    bound::bounder::RelaxationBounder,
    branching::decision::{Decision, DecisionBuilder},
    extract::{cross_check, extract},
    fixed::FixedAssignment,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    result::BnbSolverOutcome,
    stack::SearchStack,
    state::SearchState,
    stats::BnbSolverStatistics,
    trail::SearchTrail,
};
use premia_model::{
    index::{EntityIndex, OptionIndex},
    model::Instance,
    solution::Solution,
};
use premia_search::{
    monitor::search_monitor::SearchCommand, num::SolverFloat, result::TerminationReason,
};

/// Reusable branch-and-bound engine. Buffers are kept between solves.
#[derive(Clone, Debug)]
pub struct BnbSolver<T> {
    trail: SearchTrail<T>,
    stack: SearchStack<T>,
    children: Vec<Decision<T>>,
}

impl<T> Default for BnbSolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BnbSolver<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            trail: SearchTrail::new(),
            stack: SearchStack::new(),
            children: Vec::new(),
        }
    }

    /// Creates a solver with storage for a full dive over `num_entities`
    /// entities with at most `max_options` options each.
    ///
    /// The solver grows its buffers on demand, so this only moves the
    /// allocations to construction time.
    #[inline]
    pub fn preallocated(num_entities: usize, max_options: usize, num_incidences: usize) -> Self {
        Self {
            trail: SearchTrail::preallocated(num_entities, num_incidences),
            stack: SearchStack::preallocated(max_options, num_entities),
            children: Vec::with_capacity(max_options),
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.trail.reset();
        self.stack.reset();
        self.children.clear();
    }
}

impl<T> BnbSolver<T>
where
    T: SolverFloat,
{
    /// Solves `instance` to optimality unless a monitor stops the search.
    #[inline]
    pub fn solve<B, R, S>(
        &mut self,
        instance: &Instance<T>,
        builder: &mut B,
        bounder: &mut R,
        monitor: S,
    ) -> BnbSolverOutcome<T>
    where
        B: DecisionBuilder<T>,
        R: RelaxationBounder<T>,
        S: TreeSearchMonitor<T>,
    {
        self.solve_with_fixed(instance, &[], builder, bounder, monitor)
    }

    /// Solves `instance` with every pin in `fixed` applied at the root.
    ///
    /// A pin that violates its local threshold, makes a budget unreachable,
    /// or contradicts another pin for the same entity makes the result
    /// `Infeasible`.
    pub fn solve_with_fixed<B, R, S>(
        &mut self,
        instance: &Instance<T>,
        fixed: &[FixedAssignment],
        builder: &mut B,
        bounder: &mut R,
        mut monitor: S,
    ) -> BnbSolverOutcome<T>
    where
        B: DecisionBuilder<T>,
        R: RelaxationBounder<T>,
        S: TreeSearchMonitor<T>,
    {
        let session =
            BnbSolverSearchSession::new(self, instance, fixed, builder, bounder, &mut monitor);
        let outcome = session.run();
        self.reset();
        outcome
    }
}

struct BnbSolverSearchSession<'a, T, B, R, S>
where
    T: SolverFloat,
{
    solver: &'a mut BnbSolver<T>,
    instance: &'a Instance<T>,
    fixed: &'a [FixedAssignment],
    builder: &'a mut B,
    bounder: &'a mut R,
    monitor: &'a mut S,
    state: SearchState<T>,
    best_solution: Option<Solution<T>>,
    stats: BnbSolverStatistics<T>,
    start_time: std::time::Instant,
}

impl<'a, T, B, R, S> std::fmt::Display for BnbSolverSearchSession<'a, T, B, R, S>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.best_solution {
            Some(solution) => write!(
                f,
                "SearchSession(best_reward: {}, state: {})",
                solution.total_reward(),
                self.state
            ),
            None => write!(f, "SearchSession(no incumbent, state: {})", self.state),
        }
    }
}

impl<'a, T, B, R, S> BnbSolverSearchSession<'a, T, B, R, S>
where
    T: SolverFloat,
    B: DecisionBuilder<T>,
    R: RelaxationBounder<T>,
    S: TreeSearchMonitor<T>,
{
    #[inline]
    fn new(
        solver: &'a mut BnbSolver<T>,
        instance: &'a Instance<T>,
        fixed: &'a [FixedAssignment],
        builder: &'a mut B,
        bounder: &'a mut R,
        monitor: &'a mut S,
    ) -> Self {
        Self {
            solver,
            instance,
            fixed,
            builder,
            bounder,
            monitor,
            state: SearchState::new(instance),
            best_solution: None,
            stats: BnbSolverStatistics::default(),
            start_time: std::time::Instant::now(),
        }
    }

    fn run(mut self) -> BnbSolverOutcome<T> {
        self.monitor.on_enter_search(self.instance, &self.stats);

        if !self.initialize() {
            self.stats.set_total_time(self.start_time.elapsed());
            self.monitor.on_exit_search(&self.stats);
            return BnbSolverOutcome::infeasible(self.stats);
        }

        let termination_reason = loop {
            self.monitor.on_step(&self.state, &self.stats);

            if let SearchCommand::Terminate(msg) =
                self.monitor.search_command(&self.state, &self.stats)
            {
                break TerminationReason::Aborted(msg);
            }

            if self.solver.stack.is_current_level_empty() {
                if self.solver.stack.depth() <= 1 {
                    break if self.best_solution.is_some() {
                        TerminationReason::OptimalityProven
                    } else {
                        TerminationReason::InfeasibilityProven
                    };
                }
                self.backtrack_step();
            } else {
                self.process_next_decision();
            }
        };

        self.stats.set_total_time(self.start_time.elapsed());
        self.monitor.on_exit_search(&self.stats);
        self.finalize_result(termination_reason)
    }

    fn finalize_result(self, reason: TerminationReason) -> BnbSolverOutcome<T> {
        match (reason, self.best_solution) {
            (TerminationReason::OptimalityProven, Some(solution)) => {
                BnbSolverOutcome::optimal(solution, self.stats)
            }
            (TerminationReason::Aborted(msg), solution) => {
                BnbSolverOutcome::aborted(solution, msg, self.stats)
            }
            _ => BnbSolverOutcome::infeasible(self.stats),
        }
    }

    /// Applies the pins, prepares builder and bounder, and expands the
    /// root. Returns `false` if the root is proven infeasible.
    fn initialize(&mut self) -> bool {
        let num_entities = self.instance.num_entities();
        let max_options = self
            .instance
            .entities()
            .map(|e| self.instance.num_options(e))
            .max()
            .unwrap_or(0);
        let num_incidences: usize = self
            .instance
            .constraints()
            .map(|c| self.instance.constraint_incidences(c).len())
            .sum();
        self.solver.trail.ensure_capacity(num_entities, num_incidences);
        self.solver.stack.ensure_capacity(max_options, num_entities);

        // Root frame. Pins live in it and are undone by `reset`.
        self.solver.trail.push_frame();
        self.solver.stack.push_frame();
        self.stats.on_node_explored();

        if !self.apply_fixed() {
            return false;
        }

        self.builder.prepare(self.instance, &self.state);
        self.bounder.prepare(self.instance);

        let root_bound = self.bounder.upper_bound(self.instance, &self.state);
        self.stats.set_root_upper_bound(root_bound);
        if root_bound.is_none() {
            self.stats.on_pruning_relaxation();
            self.monitor
                .on_prune(&self.state, PruneReason::RelaxationInfeasible, &self.stats);
            return false;
        }

        if self.state.is_complete() {
            self.handle_complete_solution();
        } else {
            self.expand();
        }
        true
    }

    fn apply_fixed(&mut self) -> bool {
        for pin in self.fixed {
            let (entity, option) = (pin.entity, pin.option);
            debug_assert!(
                entity.get() < self.instance.num_entities(),
                "called `BnbSolver::solve_with_fixed` with entity index out of bounds: the len is {} but the index is {}",
                self.instance.num_entities(),
                entity.get()
            );
            debug_assert!(
                option.get() < self.instance.num_options(entity),
                "called `BnbSolver::solve_with_fixed` with option index out of bounds: the len is {} but the index is {}",
                self.instance.num_options(entity),
                option.get()
            );

            match self.state.selection(entity) {
                Some(pinned) if pinned == option => continue,
                Some(_) => return false,
                None => {}
            }

            if !self.instance.is_locally_feasible(entity, option) {
                self.stats.on_pruning_local();
                self.monitor
                    .on_prune(&self.state, PruneReason::LocalConstraintViolated, &self.stats);
                return false;
            }
            if self.exceeds_budget(entity, option) {
                self.stats.on_pruning_global();
                self.monitor
                    .on_prune(&self.state, PruneReason::GlobalBudgetExceeded, &self.stats);
                return false;
            }

            self.solver
                .trail
                .apply_assignment(&mut self.state, self.instance, entity, option);
        }
        true
    }

    #[inline]
    fn backtrack_step(&mut self) {
        self.stats.on_backtrack();
        self.solver.trail.backtrack(&mut self.state);
        self.solver.stack.pop_frame();
        self.monitor.on_backtrack(&self.state, &self.stats);
    }

    fn process_next_decision(&mut self) {
        let Some(decision) = self.solver.stack.pop() else {
            return;
        };

        // The incumbent may have improved since the decision was stacked.
        if !self.can_improve(decision.bound(), decision.entity(), decision.option()) {
            self.stats.on_pruning_bound();
            self.monitor
                .on_prune(&self.state, PruneReason::BoundDominated, &self.stats);
            return;
        }

        self.descend(decision);
    }

    fn descend(&mut self, decision: Decision<T>) {
        self.solver.trail.push_frame();
        self.solver.trail.apply_assignment(
            &mut self.state,
            self.instance,
            decision.entity(),
            decision.option(),
        );
        self.solver.stack.push_frame();

        self.stats.on_node_explored();
        self.stats.on_depth_update(self.solver.stack.depth() as u64 - 1);
        self.monitor.on_descend(&self.state, decision, &self.stats);

        if self.state.is_complete() {
            self.handle_complete_solution();
        } else {
            self.expand();
        }
    }

    /// Generates, filters and bounds the children of the current node and
    /// stacks the survivors.
    fn expand(&mut self) {
        let mut children = std::mem::take(&mut self.solver.children);
        children.clear();
        children.extend(self.builder.next_decision(self.instance, &self.state));
        self.stats.on_decisions_generated(children.len() as u64);

        let mut kept = 0;
        for i in 0..children.len() {
            let decision = children[i];
            let (entity, option) = (decision.entity(), decision.option());

            if !self.instance.is_locally_feasible(entity, option) {
                self.stats.on_pruning_local();
                self.monitor
                    .on_prune(&self.state, PruneReason::LocalConstraintViolated, &self.stats);
                continue;
            }
            if self.exceeds_budget(entity, option) {
                self.stats.on_pruning_global();
                self.monitor
                    .on_prune(&self.state, PruneReason::GlobalBudgetExceeded, &self.stats);
                continue;
            }

            self.solver.trail.push_frame();
            self.solver
                .trail
                .apply_assignment(&mut self.state, self.instance, entity, option);
            let bound = self.bounder.upper_bound(self.instance, &self.state);
            self.solver.trail.backtrack(&mut self.state);

            let Some(bound) = bound else {
                self.stats.on_pruning_relaxation();
                self.monitor
                    .on_prune(&self.state, PruneReason::RelaxationInfeasible, &self.stats);
                continue;
            };

            let child = decision.with_bound(bound);
            self.monitor.on_bound_computed(&self.state, child, &self.stats);
            if !self.can_improve(bound, entity, option) {
                self.stats.on_pruning_bound();
                self.monitor
                    .on_prune(&self.state, PruneReason::BoundDominated, &self.stats);
                continue;
            }

            children[kept] = child;
            kept += 1;
        }
        children.truncate(kept);

        // Popped from the back: ascending bound, and among equal bounds the
        // lower option index last.
        children.sort_by(|a, b| {
            a.bound()
                .partial_cmp(&b.bound())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.option().cmp(&a.option()))
        });
        self.solver.stack.extend(children.iter().copied());
        self.monitor
            .on_decisions_enqueued(&self.state, kept, &self.stats);

        self.solver.children = children;
    }

    /// Returns `true` if selecting `option` for `entity` pushes a touching
    /// budget out of reach, counting the lightest feasible option of every
    /// other undecided entity.
    #[inline]
    fn exceeds_budget(&self, entity: EntityIndex, option: OptionIndex) -> bool {
        self.instance.entity_incidences(entity).any(|incidence| {
            let constraint = incidence.constraint();
            let others =
                (self.state.pending_min(constraint) - incidence.min_weight()).max(T::zero());
            let lhs = self.state.lhs(constraint) + self.instance.weight(incidence, option) + others;
            !lhs.approx_le(self.instance.budget(constraint))
        })
    }

    /// Returns `true` if the child selecting `option` for `entity`, whose
    /// subtree is bounded by `bound`, may still replace the incumbent.
    fn can_improve(&self, bound: T, entity: EntityIndex, option: OptionIndex) -> bool {
        let Some(best) = &self.best_solution else {
            return true;
        };
        let best_reward = best.total_reward();
        if best_reward.definitely_less(bound) {
            return true;
        }
        if !bound.approx_eq(best_reward) {
            return false;
        }

        // Tie zone: the subtree must be able to produce a lexicographically
        // smaller selection.
        for (i, &incumbent) in best.selections().iter().enumerate() {
            let e = EntityIndex::new(i);
            let selected = if e == entity {
                Some(option)
            } else {
                self.state.selection(e)
            };
            match selected {
                None => return true,
                Some(o) if o < incumbent => return true,
                Some(o) if o > incumbent => return false,
                Some(_) => {}
            }
        }
        false
    }

    fn handle_complete_solution(&mut self) {
        let within_budgets = self
            .instance
            .constraints()
            .all(|c| self.state.lhs(c).approx_le(self.instance.budget(c)));
        if !within_budgets {
            self.stats.on_pruning_global();
            self.monitor
                .on_prune(&self.state, PruneReason::GlobalBudgetExceeded, &self.stats);
            return;
        }

        let reward = self.state.current_reward();
        let improves = match &self.best_solution {
            None => true,
            Some(best) => {
                best.total_reward().definitely_less(reward)
                    || (reward.approx_eq(best.total_reward())
                        && self.state.selections() < best.selections())
            }
        };
        if !improves {
            self.stats.on_pruning_bound();
            self.monitor
                .on_prune(&self.state, PruneReason::BoundDominated, &self.stats);
            return;
        }

        let solution = extract(self.instance, self.state.selections());
        debug_assert!(
            cross_check(&solution, reward, self.state.lhs_values()).is_ok(),
            "tracked search values diverged from the extracted solution: {:?}",
            cross_check(&solution, reward, self.state.lhs_values())
        );
        self.stats.on_solution_found();
        self.monitor.on_solution_found(&solution, &self.stats);
        self.best_solution = Some(solution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bound::{independent::IndependentBounder, knapsack::KnapsackRelaxationBounder},
        branching::{declaration::DeclarationOrderBuilder, most_constrained::MostConstrainedBuilder},
        monitor::{no_op::NoOpMonitor, wrapper::WrapperMonitor},
    };
    use premia_model::model::{GlobalConstraintSpec, InstanceBuilder};
    use premia_search::{monitor::node_limit::NodeLimitMonitor, result::SolverResult};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::sync::atomic::AtomicU64;

    fn e(i: usize) -> EntityIndex {
        EntityIndex::new(i)
    }

    fn o(i: usize) -> OptionIndex {
        OptionIndex::new(i)
    }

    fn solve(instance: &Instance<f64>) -> BnbSolverOutcome<f64> {
        BnbSolver::new().solve(
            instance,
            &mut DeclarationOrderBuilder::new(),
            &mut KnapsackRelaxationBounder::new(),
            NoOpMonitor::new(),
        )
    }

    fn solve_fixed(instance: &Instance<f64>, fixed: &[FixedAssignment]) -> BnbSolverOutcome<f64> {
        BnbSolver::new().solve_with_fixed(
            instance,
            fixed,
            &mut DeclarationOrderBuilder::new(),
            &mut KnapsackRelaxationBounder::new(),
            NoOpMonitor::new(),
        )
    }

    fn example() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
            .set_risk_threshold("A", 0.10)
            .add_entity("B", [(0.0, 0.01), (15.0, 0.03), (30.0, 0.10)])
            .set_risk_threshold("B", 0.08)
            .add_entity("C", [(0.0, 0.01), (10.0, 0.05), (20.0, 0.08)])
            .set_risk_threshold("C", 0.06);
        b.build().unwrap()
    }

    #[test]
    fn test_example_without_global_constraints() {
        let outcome = solve(&example());
        assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.total_reward(), 45.0);
        assert_eq!(solution.selections(), &[o(1), o(1), o(1)]);
        assert!(outcome.statistics().root_upper_bound.is_some());
        assert!(outcome.statistics().nodes_explored >= 4);
    }

    #[test]
    fn test_entity_without_feasible_option_is_infeasible() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(5.0, 0.5), (6.0, 0.6)])
            .set_risk_threshold("A", 0.1)
            .add_entity("B", [(1.0, 0.0)]);
        let outcome = solve(&b.build().unwrap());
        assert_eq!(outcome.result(), &SolverResult::Infeasible);
        assert_eq!(outcome.termination_reason(), &TerminationReason::InfeasibilityProven);
    }

    #[test]
    fn test_shared_budget_breaks_ties_lexicographically() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.0), (10.0, 1.0)])
            .add_entity("B", [(0.0, 0.0), (10.0, 1.0)])
            .add_total_risk_constraint("total", 1.0, ["A", "B"]);
        let outcome = solve(&b.build().unwrap());
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.total_reward(), 10.0);
        assert_eq!(solution.selections(), &[o(0), o(1)]);
        assert_eq!(solution.global_lhs_values(), &[1.0]);
    }

    #[test]
    fn test_equal_rewards_prefer_lower_option_index() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0), (7.0, 0.2), (7.0, 0.1)]);
        let outcome = solve(&b.build().unwrap());
        assert_eq!(outcome.solution().unwrap().selections(), &[o(1)]);
    }

    #[test]
    fn test_unreachable_budget_is_infeasible() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.5), (2.0, 0.7)])
            .add_entity("B", [(1.0, 0.6)])
            .add_total_risk_constraint("total", 1.0, ["A", "B"]);
        let outcome = solve(&b.build().unwrap());
        assert_eq!(outcome.result(), &SolverResult::Infeasible);
        assert_eq!(outcome.statistics().root_upper_bound, None);
    }

    #[test]
    fn test_explicit_weights_constrain_selection() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.0), (10.0, 0.0), (30.0, 0.0)])
            .add_entity("B", [(0.0, 0.0), (25.0, 0.0)])
            .add_global_constraint(
                GlobalConstraintSpec::new("volume", 5.0)
                    .with_term("A", 1, 2.0)
                    .with_term("A", 2, 4.0)
                    .with_term("B", 1, 3.0),
            );
        let outcome = solve(&b.build().unwrap());
        let solution = outcome.solution().unwrap();
        // 10 + 25 at weight 5 beats 30 at weight 4.
        assert_eq!(solution.total_reward(), 35.0);
        assert_eq!(solution.selections(), &[o(1), o(1)]);
        assert_eq!(solution.global_slacks(), &[0.0]);
    }

    #[test]
    fn test_pins_are_respected() {
        let outcome = solve_fixed(&example(), &[FixedAssignment::new(e(0), o(0))]);
        let solution = outcome.solution().unwrap();
        assert!(matches!(outcome.result(), SolverResult::Optimal(_)));
        assert_eq!(solution.selections(), &[o(0), o(1), o(1)]);
        assert_eq!(solution.total_reward(), 25.0);
    }

    #[test]
    fn test_locally_infeasible_pin_is_infeasible() {
        let outcome = solve_fixed(&example(), &[FixedAssignment::new(e(0), o(2))]);
        assert_eq!(outcome.result(), &SolverResult::Infeasible);
        assert_eq!(outcome.statistics().prunings_local, 1);
    }

    #[test]
    fn test_conflicting_pins_are_infeasible() {
        let outcome = solve_fixed(
            &example(),
            &[
                FixedAssignment::new(e(1), o(0)),
                FixedAssignment::new(e(1), o(1)),
            ],
        );
        assert_eq!(outcome.result(), &SolverResult::Infeasible);

        let repeated = solve_fixed(
            &example(),
            &[
                FixedAssignment::new(e(1), o(0)),
                FixedAssignment::new(e(1), o(0)),
            ],
        );
        assert_eq!(repeated.solution().unwrap().total_reward(), 30.0);
    }

    #[test]
    fn test_pinning_every_entity_evaluates_the_root() {
        let pins = [
            FixedAssignment::new(e(0), o(1)),
            FixedAssignment::new(e(1), o(0)),
            FixedAssignment::new(e(2), o(0)),
        ];
        let outcome = solve_fixed(&example(), &pins);
        assert!(matches!(outcome.result(), SolverResult::Optimal(_)));
        assert_eq!(outcome.solution().unwrap().total_reward(), 20.0);
    }

    #[test]
    fn test_pin_over_budget_is_infeasible() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.0), (10.0, 2.0)])
            .add_total_risk_constraint("total", 1.0, ["A"]);
        let outcome = solve_fixed(&b.build().unwrap(), &[FixedAssignment::new(e(0), o(1))]);
        assert_eq!(outcome.result(), &SolverResult::Infeasible);
        assert_eq!(outcome.statistics().prunings_global, 1);
    }

    #[test]
    fn test_node_limit_without_incumbent_is_unknown() {
        let nodes = AtomicU64::new(0);
        let mut limit = NodeLimitMonitor::new(&nodes, 1);
        let outcome = BnbSolver::new().solve(
            &example(),
            &mut DeclarationOrderBuilder::new(),
            &mut KnapsackRelaxationBounder::new(),
            WrapperMonitor::new(&mut limit),
        );
        assert_eq!(outcome.result(), &SolverResult::Unknown);
        assert_eq!(
            outcome.termination_reason(),
            &TerminationReason::Aborted("Node limit reached".to_string())
        );
    }

    #[test]
    fn test_node_limit_after_first_dive_is_suboptimal() {
        // The first dive reaches a leaf after one step per entity.
        let mut b = InstanceBuilder::new();
        for i in 0..6 {
            b.add_entity(format!("e{i}"), [(1.0, 0.0), (2.0, 0.5), (3.0, 1.0)]);
        }
        b.add_total_risk_constraint("total", 2.5, (0..6).map(|i| format!("e{i}")));
        let instance = b.build().unwrap();

        let nodes = AtomicU64::new(0);
        let mut limit = NodeLimitMonitor::new(&nodes, 8);
        let outcome = BnbSolver::new().solve(
            &instance,
            &mut DeclarationOrderBuilder::new(),
            &mut KnapsackRelaxationBounder::new(),
            WrapperMonitor::new(&mut limit),
        );
        assert!(matches!(outcome.result(), SolverResult::Suboptimal(_)));
    }

    #[test]
    fn test_solver_is_reusable_and_idempotent() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.0), (10.0, 1.0), (12.0, 1.5)])
            .add_entity("B", [(0.0, 0.0), (10.0, 1.0)])
            .add_entity("C", [(4.0, 0.2), (9.0, 0.9)])
            .add_total_risk_constraint("total", 2.0, ["A", "B", "C"]);
        let instance = b.build().unwrap();

        let mut solver = BnbSolver::preallocated(3, 3, 7);
        let mut builder = DeclarationOrderBuilder::new();
        let mut bounder = KnapsackRelaxationBounder::new();
        let first = solver.solve(&instance, &mut builder, &mut bounder, NoOpMonitor::new());
        let second = solver.solve(&instance, &mut builder, &mut bounder, NoOpMonitor::new());
        assert_eq!(first.result(), second.result());
        assert_eq!(first.statistics().nodes_explored, second.statistics().nodes_explored);
    }

    fn random_instance(rng: &mut StdRng) -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        let n = rng.random_range(1..7);
        for i in 0..n {
            let k = rng.random_range(1..5);
            let menu: Vec<(f64, f64)> = (0..k)
                .map(|_| {
                    (
                        rng.random_range(0..10) as f64,
                        rng.random_range(0..10) as f64 / 10.0,
                    )
                })
                .collect();
            b.add_entity(format!("e{i}"), menu);
            if rng.random_bool(0.4) {
                b.set_risk_threshold(format!("e{i}"), rng.random_range(3..10) as f64 / 10.0);
            }
        }
        for c in 0..rng.random_range(0..3) {
            let budget = rng.random_range(0..20) as f64 / 10.0;
            let mut spec = GlobalConstraintSpec::new(format!("c{c}"), budget);
            for i in 0..n {
                if rng.random_bool(0.5) {
                    spec = spec.with_risk_of(format!("e{i}"));
                }
            }
            b.add_global_constraint(spec);
        }
        b.build().unwrap()
    }

    /// Best reward and lexicographically smallest optimal selection.
    fn brute_force(instance: &Instance<f64>) -> Option<(f64, Vec<OptionIndex>)> {
        let n = instance.num_entities();
        let mut current = vec![0usize; n];
        let mut best: Option<(f64, Vec<OptionIndex>)> = None;
        loop {
            let selections: Vec<_> = current.iter().map(|&i| o(i)).collect();
            let solution = extract(instance, &selections);
            if crate::extract::is_feasible(instance, &solution) {
                let reward = solution.total_reward();
                let better = match &best {
                    None => true,
                    Some((r, _)) => reward > *r + 1e-9,
                };
                if better {
                    best = Some((reward, selections));
                }
            }

            // Odometer in lexicographic order: the first optimum found is the
            // smallest.
            let mut i = n;
            loop {
                if i == 0 {
                    return best;
                }
                i -= 1;
                current[i] += 1;
                if current[i] < instance.num_options(e(i)) {
                    break;
                }
                current[i] = 0;
            }
        }
    }

    #[test]
    fn test_matches_brute_force_on_random_instances() {
        let mut rng = StdRng::seed_from_u64(42);
        for round in 0..300 {
            let instance = random_instance(&mut rng);
            let expected = brute_force(&instance);

            let outcomes = [
                BnbSolver::new().solve(
                    &instance,
                    &mut DeclarationOrderBuilder::new(),
                    &mut KnapsackRelaxationBounder::new(),
                    NoOpMonitor::new(),
                ),
                BnbSolver::new().solve(
                    &instance,
                    &mut MostConstrainedBuilder::new(),
                    &mut KnapsackRelaxationBounder::new(),
                    NoOpMonitor::new(),
                ),
                BnbSolver::new().solve(
                    &instance,
                    &mut DeclarationOrderBuilder::new(),
                    &mut IndependentBounder::new(),
                    NoOpMonitor::new(),
                ),
            ];

            for outcome in &outcomes {
                match (&expected, outcome.result()) {
                    (None, SolverResult::Infeasible) => {}
                    (Some((reward, selections)), SolverResult::Optimal(solution)) => {
                        assert!(
                            (solution.total_reward() - reward).abs() < 1e-9,
                            "round {round}: reward {} != {}",
                            solution.total_reward(),
                            reward
                        );
                        assert_eq!(solution.selections(), selections.as_slice(), "round {round}");
                    }
                    (expected, actual) => {
                        panic!("round {round}: expected {expected:?}, got {actual:?}")
                    }
                }
            }
        }
    }
}
