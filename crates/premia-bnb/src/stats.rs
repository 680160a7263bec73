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

use std::time::Duration;

/// Counters collected by one branch-and-bound search.
#[derive(Debug, Clone, PartialEq)]
pub struct BnbSolverStatistics<T> {
    /// Total nodes visited.
    pub nodes_explored: u64,
    /// Total frames popped after a subtree was exhausted.
    pub backtracks: u64,
    /// Total decisions generated by the decision builder.
    pub decisions_generated: u64,
    /// The deepest level reached in the tree.
    pub max_depth: u64,
    /// Children discarded because the option exceeds the local threshold.
    pub prunings_local: u64,
    /// Children discarded because a touching budget cannot be met.
    pub prunings_global: u64,
    /// Children whose relaxation has no feasible completion.
    pub prunings_relaxation: u64,
    /// Children or nodes that cannot beat the incumbent.
    pub prunings_bound: u64,
    /// Total improving solutions found during the search.
    pub solutions_found: u64,
    /// Total time spent in the search.
    pub time_total: Duration,
    /// The relaxation bound at the root, if the root is not proven
    /// infeasible.
    pub root_upper_bound: Option<T>,
}

impl<T> Default for BnbSolverStatistics<T> {
    fn default() -> Self {
        Self {
            nodes_explored: 0,
            backtracks: 0,
            decisions_generated: 0,
            max_depth: 0,
            prunings_local: 0,
            prunings_global: 0,
            prunings_relaxation: 0,
            prunings_bound: 0,
            solutions_found: 0,
            time_total: Duration::ZERO,
            root_upper_bound: None,
        }
    }
}

impl<T> BnbSolverStatistics<T> {
    #[inline]
    pub fn on_node_explored(&mut self) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
    }

    #[inline]
    pub fn on_backtrack(&mut self) {
        self.backtracks = self.backtracks.saturating_add(1);
    }

    #[inline]
    pub fn on_solution_found(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add(1);
    }

    #[inline]
    pub fn on_depth_update(&mut self, depth: u64) {
        self.max_depth = self.max_depth.max(depth);
    }

    #[inline]
    pub fn on_decisions_generated(&mut self, count: u64) {
        self.decisions_generated = self.decisions_generated.saturating_add(count);
    }

    #[inline]
    pub fn on_pruning_local(&mut self) {
        self.prunings_local = self.prunings_local.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_global(&mut self) {
        self.prunings_global = self.prunings_global.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_relaxation(&mut self) {
        self.prunings_relaxation = self.prunings_relaxation.saturating_add(1);
    }

    /// Records a pruning caused by the incumbent, either when a child is
    /// generated or when a stacked decision is popped.
    #[inline]
    pub fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    /// Sum of all pruning counters.
    #[inline]
    pub fn total_prunings(&self) -> u64 {
        self.prunings_local
            .saturating_add(self.prunings_global)
            .saturating_add(self.prunings_relaxation)
            .saturating_add(self.prunings_bound)
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }

    #[inline]
    pub fn set_root_upper_bound(&mut self, bound: Option<T>) {
        self.root_upper_bound = bound;
    }
}

impl<T> std::fmt::Display for BnbSolverStatistics<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Premia-BnB Solver Statistics:")?;
        writeln!(f, "  Nodes explored:        {}", self.nodes_explored)?;
        writeln!(f, "  Backtracks:            {}", self.backtracks)?;
        writeln!(f, "  Max depth reached:     {}", self.max_depth)?;
        writeln!(f, "  Decisions generated:   {}", self.decisions_generated)?;
        writeln!(f, "  Prunings (local):      {}", self.prunings_local)?;
        writeln!(f, "  Prunings (global):     {}", self.prunings_global)?;
        writeln!(f, "  Prunings (relaxation): {}", self.prunings_relaxation)?;
        writeln!(f, "  Prunings (bound):      {}", self.prunings_bound)?;
        writeln!(f, "  Solutions found:       {}", self.solutions_found)?;
        match &self.root_upper_bound {
            Some(bound) => writeln!(f, "  Root upper bound:      {}", bound)?,
            None => writeln!(f, "  Root upper bound:      none")?,
        }
        writeln!(f, "  Total time:            {:.2?}", self.time_total)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut stats = BnbSolverStatistics::<f64>::default();
        stats.on_node_explored();
        stats.on_node_explored();
        stats.on_pruning_local();
        stats.on_pruning_bound();
        stats.on_pruning_global();
        stats.on_decisions_generated(3);
        stats.on_depth_update(4);
        stats.on_depth_update(2);
        assert_eq!(stats.nodes_explored, 2);
        assert_eq!(stats.decisions_generated, 3);
        assert_eq!(stats.max_depth, 4);
        assert_eq!(stats.total_prunings(), 3);
    }

    #[test]
    fn test_counters_saturate() {
        let mut stats = BnbSolverStatistics::<f64> {
            nodes_explored: u64::MAX,
            ..Default::default()
        };
        stats.on_node_explored();
        assert_eq!(stats.nodes_explored, u64::MAX);
    }

    #[test]
    fn test_display_reports_missing_root_bound() {
        let stats = BnbSolverStatistics::<f64>::default();
        let out = stats.to_string();
        assert!(out.starts_with("Premia-BnB Solver Statistics:"));
        assert!(out.contains("Root upper bound:      none"));
    }
}
