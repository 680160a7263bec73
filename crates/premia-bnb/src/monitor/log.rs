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
    branching::decision::Decision,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    state::SearchState,
    stats::BnbSolverStatistics,
};
use premia_model::{model::Instance, solution::Solution};
use premia_search::num::SolverFloat;
use std::time::{Duration, Instant};

/// Emits search progress as `tracing` events at `info` level.
///
/// A progress line is written at most once per `log_interval`; the clock is
/// only read on nodes whose count has no bits in common with
/// `clock_check_mask`.
#[derive(Debug, Clone)]
pub struct LogTreeSearchMonitor<T> {
    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
    clock_check_mask: u64,
    best_reward: Option<T>,
}

impl<T> LogTreeSearchMonitor<T>
where
    T: SolverFloat,
{
    pub fn new(log_interval: Duration, clock_check_mask: u64) -> Self {
        Self {
            start_time: Instant::now(),
            last_log_time: Instant::now(),
            log_interval,
            clock_check_mask,
            best_reward: None,
        }
    }

    #[inline]
    pub fn log_interval(&self) -> Duration {
        self.log_interval
    }

    fn log_progress(&mut self, state: &SearchState<T>, stats: &BnbSolverStatistics<T>) {
        let now = Instant::now();
        tracing::info!(
            event = "search_progress",
            elapsed_s = now.duration_since(self.start_time).as_secs_f64(),
            nodes = stats.nodes_explored,
            depth = state.num_assigned(),
            best_reward = self.best_reward.map(SolverFloat::as_f64),
            current_reward = state.current_reward().as_f64(),
            backtracks = stats.backtracks,
            prunings = stats.total_prunings(),
        );
        self.last_log_time = now;
    }
}

impl<T> Default for LogTreeSearchMonitor<T>
where
    T: SolverFloat,
{
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 4095)
    }
}

impl<T> std::fmt::Display for LogTreeSearchMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LogTreeSearchMonitor(log_interval: {:?}, clock_check_mask: {})",
            self.log_interval, self.clock_check_mask
        )
    }
}

impl<T> TreeSearchMonitor<T> for LogTreeSearchMonitor<T>
where
    T: SolverFloat,
{
    fn name(&self) -> &str {
        "LogTreeSearchMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance<T>, _statistics: &BnbSolverStatistics<T>) {
        self.start_time = Instant::now();
        self.last_log_time = self.start_time;
        self.best_reward = None;
        tracing::info!(
            event = "search_start",
            entities = instance.num_entities(),
            options = instance.num_options_total(),
            constraints = instance.num_constraints(),
            complexity = %instance.complexity(),
        );
    }

    fn on_exit_search(&mut self, statistics: &BnbSolverStatistics<T>) {
        tracing::info!(
            event = "search_end",
            elapsed_s = self.start_time.elapsed().as_secs_f64(),
            nodes = statistics.nodes_explored,
            solutions = statistics.solutions_found,
            best_reward = self.best_reward.map(SolverFloat::as_f64),
        );
    }

    #[inline]
    fn on_step(&mut self, state: &SearchState<T>, statistics: &BnbSolverStatistics<T>) {
        if (statistics.nodes_explored & self.clock_check_mask) == 0
            && self.last_log_time.elapsed() >= self.log_interval
        {
            self.log_progress(state, statistics);
        }
    }

    fn on_bound_computed(
        &mut self,
        _state: &SearchState<T>,
        _decision: Decision<T>,
        _statistics: &BnbSolverStatistics<T>,
    ) {
    }

    fn on_prune(
        &mut self,
        _state: &SearchState<T>,
        _reason: PruneReason,
        _statistics: &BnbSolverStatistics<T>,
    ) {
    }

    fn on_decisions_enqueued(
        &mut self,
        _state: &SearchState<T>,
        _count: usize,
        _statistics: &BnbSolverStatistics<T>,
    ) {
    }

    fn on_descend(
        &mut self,
        _state: &SearchState<T>,
        _decision: Decision<T>,
        _statistics: &BnbSolverStatistics<T>,
    ) {
    }

    fn on_backtrack(&mut self, _state: &SearchState<T>, _statistics: &BnbSolverStatistics<T>) {}

    fn on_solution_found(&mut self, solution: &Solution<T>, statistics: &BnbSolverStatistics<T>) {
        self.best_reward = Some(solution.total_reward());
        tracing::debug!(
            event = "incumbent_improved",
            reward = solution.total_reward().as_f64(),
            nodes = statistics.nodes_explored,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_model::{index::OptionIndex, model::InstanceBuilder};

    #[test]
    fn test_tracks_best_reward_across_search() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(3.0, 0.0)]);
        let inst = b.build().unwrap();
        let state = SearchState::new(&inst);
        let stats = BnbSolverStatistics::default();

        let mut monitor = LogTreeSearchMonitor::new(Duration::ZERO, 0);
        monitor.on_enter_search(&inst, &stats);
        monitor.on_step(&state, &stats);
        let solution = Solution::new(
            3.0,
            vec![OptionIndex::new(0)],
            vec![],
            vec![f64::INFINITY],
            vec![],
        );
        monitor.on_solution_found(&solution, &stats);
        assert_eq!(monitor.best_reward, Some(3.0));

        monitor.on_enter_search(&inst, &stats);
        assert_eq!(monitor.best_reward, None);
        monitor.on_exit_search(&stats);
    }

    #[test]
    fn test_display() {
        let monitor = LogTreeSearchMonitor::<f64>::new(Duration::from_secs(2), 1023);
        assert_eq!(
            monitor.to_string(),
            "LogTreeSearchMonitor(log_interval: 2s, clock_check_mask: 1023)"
        );
        assert_eq!(monitor.log_interval(), Duration::from_secs(2));
    }
}
