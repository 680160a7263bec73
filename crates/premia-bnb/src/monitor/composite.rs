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
use premia_search::{monitor::search_monitor::SearchCommand, num::SolverFloat};

/// Forwards every event to a list of tree search monitors.
pub struct CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    monitors: Vec<Box<dyn TreeSearchMonitor<T> + 'a>>,
}

impl<'a, T> Default for CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            monitors: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: TreeSearchMonitor<T> + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline(always)]
    pub fn add_monitor_boxed(&mut self, monitor: Box<dyn TreeSearchMonitor<T> + 'a>) {
        self.monitors.push(monitor);
    }

    #[inline(always)]
    pub fn monitors(&self) -> &[Box<dyn TreeSearchMonitor<T> + 'a>] {
        &self.monitors
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl<'a, T> FromIterator<Box<dyn TreeSearchMonitor<T> + 'a>> for CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    #[inline(always)]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn TreeSearchMonitor<T> + 'a>>,
    {
        Self {
            monitors: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> TreeSearchMonitor<T> for CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    #[inline(always)]
    fn name(&self) -> &str {
        "CompositeTreeSearchMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance<T>, statistics: &BnbSolverStatistics<T>) {
        for monitor in &mut self.monitors {
            monitor.on_enter_search(instance, statistics);
        }
    }

    fn on_exit_search(&mut self, statistics: &BnbSolverStatistics<T>) {
        for monitor in &mut self.monitors {
            monitor.on_exit_search(statistics);
        }
    }

    fn search_command(
        &mut self,
        state: &SearchState<T>,
        statistics: &BnbSolverStatistics<T>,
    ) -> SearchCommand {
        for monitor in &mut self.monitors {
            if let SearchCommand::Terminate(reason) = monitor.search_command(state, statistics) {
                return SearchCommand::Terminate(reason);
            }
        }
        SearchCommand::Continue
    }

    fn on_step(&mut self, state: &SearchState<T>, statistics: &BnbSolverStatistics<T>) {
        for monitor in &mut self.monitors {
            monitor.on_step(state, statistics);
        }
    }

    fn on_bound_computed(
        &mut self,
        state: &SearchState<T>,
        decision: Decision<T>,
        statistics: &BnbSolverStatistics<T>,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_bound_computed(state, decision, statistics);
        }
    }

    fn on_prune(
        &mut self,
        state: &SearchState<T>,
        reason: PruneReason,
        statistics: &BnbSolverStatistics<T>,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_prune(state, reason, statistics);
        }
    }

    fn on_decisions_enqueued(
        &mut self,
        state: &SearchState<T>,
        count: usize,
        statistics: &BnbSolverStatistics<T>,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_decisions_enqueued(state, count, statistics);
        }
    }

    fn on_descend(
        &mut self,
        state: &SearchState<T>,
        decision: Decision<T>,
        statistics: &BnbSolverStatistics<T>,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_descend(state, decision, statistics);
        }
    }

    fn on_backtrack(&mut self, state: &SearchState<T>, statistics: &BnbSolverStatistics<T>) {
        for monitor in &mut self.monitors {
            monitor.on_backtrack(state, statistics);
        }
    }

    fn on_solution_found(&mut self, solution: &Solution<T>, statistics: &BnbSolverStatistics<T>) {
        for monitor in &mut self.monitors {
            monitor.on_solution_found(solution, statistics);
        }
    }
}

impl<'a, T> std::fmt::Debug for CompositeTreeSearchMonitor<'a, T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.monitors.iter().map(|m| m.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_model::model::InstanceBuilder;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
        stop_after_steps: Option<usize>,
        steps: usize,
    }

    impl TreeSearchMonitor<f64> for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }
        fn on_enter_search(&mut self, _: &Instance<f64>, _: &BnbSolverStatistics<f64>) {
            self.events.borrow_mut().push("enter".into());
        }
        fn on_exit_search(&mut self, _: &BnbSolverStatistics<f64>) {
            self.events.borrow_mut().push("exit".into());
        }
        fn search_command(
            &mut self,
            _: &SearchState<f64>,
            _: &BnbSolverStatistics<f64>,
        ) -> SearchCommand {
            match self.stop_after_steps {
                Some(limit) if self.steps >= limit => SearchCommand::Terminate("stop".into()),
                _ => SearchCommand::Continue,
            }
        }
        fn on_step(&mut self, _: &SearchState<f64>, _: &BnbSolverStatistics<f64>) {
            self.steps += 1;
        }
        fn on_bound_computed(
            &mut self,
            _: &SearchState<f64>,
            _: Decision<f64>,
            _: &BnbSolverStatistics<f64>,
        ) {
        }
        fn on_prune(
            &mut self,
            _: &SearchState<f64>,
            reason: PruneReason,
            _: &BnbSolverStatistics<f64>,
        ) {
            self.events.borrow_mut().push(format!("prune:{reason}"));
        }
        fn on_decisions_enqueued(
            &mut self,
            _: &SearchState<f64>,
            _: usize,
            _: &BnbSolverStatistics<f64>,
        ) {
        }
        fn on_descend(
            &mut self,
            _: &SearchState<f64>,
            _: Decision<f64>,
            _: &BnbSolverStatistics<f64>,
        ) {
        }
        fn on_backtrack(&mut self, _: &SearchState<f64>, _: &BnbSolverStatistics<f64>) {}
        fn on_solution_found(&mut self, _: &Solution<f64>, _: &BnbSolverStatistics<f64>) {}
    }

    fn instance() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0)]);
        b.build().unwrap()
    }

    #[test]
    fn test_forwards_events_in_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut composite = CompositeTreeSearchMonitor::new();
        composite.add_monitor(Recorder {
            events: events.clone(),
            ..Default::default()
        });
        composite.add_monitor(Recorder {
            events: events.clone(),
            ..Default::default()
        });

        let inst = instance();
        let state = SearchState::new(&inst);
        let stats = BnbSolverStatistics::default();
        composite.on_enter_search(&inst, &stats);
        composite.on_prune(&state, PruneReason::BoundDominated, &stats);
        composite.on_exit_search(&stats);

        assert_eq!(
            *events.borrow(),
            vec![
                "enter",
                "enter",
                "prune:BoundDominated",
                "prune:BoundDominated",
                "exit",
                "exit"
            ]
        );
        assert_eq!(composite.len(), 2);
    }

    #[test]
    fn test_first_terminate_wins() {
        let mut composite = CompositeTreeSearchMonitor::new();
        composite.add_monitor(Recorder::default());
        composite.add_monitor(Recorder {
            stop_after_steps: Some(1),
            ..Default::default()
        });

        let inst = instance();
        let state = SearchState::new(&inst);
        let stats = BnbSolverStatistics::default();
        assert_eq!(composite.search_command(&state, &stats), SearchCommand::Continue);
        composite.on_step(&state, &stats);
        assert_eq!(
            composite.search_command(&state, &stats),
            SearchCommand::Terminate("stop".to_string())
        );
    }

    #[test]
    fn test_empty_composite_continues() {
        let mut composite = CompositeTreeSearchMonitor::<f64>::default();
        let inst = instance();
        let state = SearchState::new(&inst);
        assert!(composite.is_empty());
        assert_eq!(
            composite.search_command(&state, &BnbSolverStatistics::default()),
            SearchCommand::Continue
        );
    }
}
