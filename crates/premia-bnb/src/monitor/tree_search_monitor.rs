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

use crate::{branching::decision::Decision, state::SearchState, stats::BnbSolverStatistics};
use premia_model::{model::Instance, solution::Solution};
use premia_search::{monitor::search_monitor::SearchCommand, num::SolverFloat};

/// Why a child or a stacked decision was discarded.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PruneReason {
    /// The option's risk exceeds the entity's threshold.
    LocalConstraintViolated,
    /// A touching global budget cannot be met by any completion.
    GlobalBudgetExceeded,
    /// The relaxation has no feasible completion.
    RelaxationInfeasible,
    /// The bound cannot beat the incumbent.
    BoundDominated,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneReason::LocalConstraintViolated => write!(f, "LocalConstraintViolated"),
            PruneReason::GlobalBudgetExceeded => write!(f, "GlobalBudgetExceeded"),
            PruneReason::RelaxationInfeasible => write!(f, "RelaxationInfeasible"),
            PruneReason::BoundDominated => write!(f, "BoundDominated"),
        }
    }
}

/// Observer of the branch-and-bound tree.
pub trait TreeSearchMonitor<T>
where
    T: SolverFloat,
{
    /// Returns the name of the monitor.
    fn name(&self) -> &str;
    /// Called when the search starts.
    fn on_enter_search(&mut self, instance: &Instance<T>, statistics: &BnbSolverStatistics<T>);
    /// Called when the search ends.
    fn on_exit_search(&mut self, statistics: &BnbSolverStatistics<T>);
    /// Called to determine the next action of the search.
    fn search_command(
        &mut self,
        _state: &SearchState<T>,
        _statistics: &BnbSolverStatistics<T>,
    ) -> SearchCommand {
        SearchCommand::Continue
    }
    /// Called at each step of the search.
    fn on_step(&mut self, state: &SearchState<T>, statistics: &BnbSolverStatistics<T>);
    /// Called when the bound of a child is computed. `state` is the parent.
    fn on_bound_computed(
        &mut self,
        state: &SearchState<T>,
        decision: Decision<T>,
        statistics: &BnbSolverStatistics<T>,
    );
    /// Called when a child or a stacked decision is discarded.
    fn on_prune(
        &mut self,
        state: &SearchState<T>,
        reason: PruneReason,
        statistics: &BnbSolverStatistics<T>,
    );
    /// Called when the surviving children of a node are stacked.
    fn on_decisions_enqueued(
        &mut self,
        state: &SearchState<T>,
        count: usize,
        statistics: &BnbSolverStatistics<T>,
    );
    /// Called after descending into a child.
    fn on_descend(
        &mut self,
        state: &SearchState<T>,
        decision: Decision<T>,
        statistics: &BnbSolverStatistics<T>,
    );
    /// Called after backtracking to a parent.
    fn on_backtrack(&mut self, state: &SearchState<T>, statistics: &BnbSolverStatistics<T>);
    /// Called when the incumbent improves.
    fn on_solution_found(&mut self, solution: &Solution<T>, statistics: &BnbSolverStatistics<T>);
}

impl<T> std::fmt::Debug for dyn TreeSearchMonitor<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeSearchMonitor({})", self.name())
    }
}

impl<T> std::fmt::Display for dyn TreeSearchMonitor<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeSearchMonitor({})", self.name())
    }
}
