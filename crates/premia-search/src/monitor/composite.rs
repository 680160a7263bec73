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
    monitor::{
        index::MonitorIndex,
        search_monitor::{SearchCommand, SearchMonitor},
    },
    num::SolverFloat,
};
use premia_model::{model::Instance, solution::Solution};

/// Fans every hook out to a list of monitors. The first monitor asking to
/// terminate wins.
pub struct CompositeMonitor<'a, T> {
    monitors: Vec<Box<dyn SearchMonitor<T> + 'a>>,
}

impl<'a, T> CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn names(&self) -> String {
        self.monitors
            .iter()
            .map(|m| m.name())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

impl<'a, T> std::fmt::Debug for CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeMonitor")
            .field("monitors", &self.names())
            .finish()
    }
}

impl<'a, T> std::fmt::Display for CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompositeMonitor([{}])", self.names())
    }
}

impl<'a, T> Default for CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    #[inline]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            monitors: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: SearchMonitor<T> + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline]
    pub fn add_monitor_boxed(&mut self, monitor: Box<dyn SearchMonitor<T> + 'a>) {
        self.monitors.push(monitor);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Returns the monitor at `monitor_index`.
    ///
    /// # Panics
    ///
    /// Panics if `monitor_index` is out of bounds.
    #[inline]
    pub fn monitor(&self, monitor_index: MonitorIndex) -> &dyn SearchMonitor<T> {
        let index = monitor_index.get();
        debug_assert!(
            index < self.monitors.len(),
            "called `CompositeMonitor::monitor` with monitor index out of bounds: the len is {} but the index is {}",
            self.monitors.len(),
            index
        );
        self.monitors[index].as_ref()
    }
}

impl<'a, T> FromIterator<Box<dyn SearchMonitor<T> + 'a>> for CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn SearchMonitor<T> + 'a>>,
    {
        Self {
            monitors: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> SearchMonitor<T> for CompositeMonitor<'a, T>
where
    T: SolverFloat,
{
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance<T>) {
        for monitor in &mut self.monitors {
            monitor.on_enter_search(instance);
        }
    }

    fn on_exit_search(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_exit_search();
        }
    }

    fn on_solution_found(&mut self, solution: &Solution<T>) {
        for monitor in &mut self.monitors {
            monitor.on_solution_found(solution);
        }
    }

    fn on_step(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_step();
        }
    }

    fn search_command(&self) -> SearchCommand {
        for monitor in &self.monitors {
            if let SearchCommand::Terminate(reason) = monitor.search_command() {
                return SearchCommand::Terminate(reason);
            }
        }
        SearchCommand::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{interrupt::InterruptMonitor, node_limit::NodeLimitMonitor};
    use premia_model::model::InstanceBuilder;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct Counting<'c> {
        steps: &'c AtomicU64,
        entered: &'c AtomicBool,
    }

    impl<'c> SearchMonitor<f64> for Counting<'c> {
        fn name(&self) -> &str {
            "Counting"
        }
        fn on_enter_search(&mut self, _instance: &Instance<f64>) {
            self.entered.store(true, Ordering::Relaxed);
        }
        fn on_exit_search(&mut self) {}
        fn on_solution_found(&mut self, _solution: &Solution<f64>) {}
        fn on_step(&mut self) {
            self.steps.fetch_add(1, Ordering::Relaxed);
        }
        fn search_command(&self) -> SearchCommand {
            SearchCommand::Continue
        }
    }

    #[test]
    fn test_hooks_fan_out() {
        let steps = AtomicU64::new(0);
        let entered = AtomicBool::new(false);
        let mut composite = CompositeMonitor::new();
        composite.add_monitor(Counting {
            steps: &steps,
            entered: &entered,
        });
        composite.add_monitor(Counting {
            steps: &steps,
            entered: &entered,
        });

        let instance = InstanceBuilder::<f64>::new().build().unwrap();
        composite.on_enter_search(&instance);
        composite.on_step();
        assert!(entered.load(Ordering::Relaxed));
        assert_eq!(steps.load(Ordering::Relaxed), 2);
        assert_eq!(composite.len(), 2);
        assert_eq!(composite.monitor(MonitorIndex::new(1)).name(), "Counting");
    }

    #[test]
    fn test_first_terminate_wins() {
        let flag = AtomicBool::new(true);
        let nodes = AtomicU64::new(0);
        let mut composite = CompositeMonitor::<f64>::with_capacity(2);
        composite.add_monitor(InterruptMonitor::new(&flag));
        composite.add_monitor(NodeLimitMonitor::new(&nodes, 0));
        assert_eq!(
            composite.search_command(),
            SearchCommand::Terminate("Interrupt signal received".to_string())
        );

        flag.store(false, Ordering::Relaxed);
        assert_eq!(
            composite.search_command(),
            SearchCommand::Terminate("Node limit reached".to_string())
        );
    }

    #[test]
    fn test_empty_composite_continues() {
        let composite = CompositeMonitor::<f64>::default();
        assert!(composite.is_empty());
        assert_eq!(composite.search_command(), SearchCommand::Continue);
        assert_eq!(format!("{}", composite), "CompositeMonitor([])");
    }

    #[test]
    fn test_from_iterator_and_display() {
        let flag = AtomicBool::new(false);
        let boxed: Box<dyn SearchMonitor<f64> + '_> = Box::new(InterruptMonitor::new(&flag));
        let composite: CompositeMonitor<'_, f64> = std::iter::once(boxed).collect();
        assert_eq!(format!("{}", composite), "CompositeMonitor([InterruptMonitor])");
        assert!(format!("{:?}", composite).contains("InterruptMonitor"));
    }
}
