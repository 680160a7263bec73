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
    monitor::search_monitor::{SearchCommand, SearchMonitor},
    num::SolverFloat,
};
use premia_model::{model::Instance, solution::Solution};
use std::sync::atomic::{AtomicU64, Ordering};

/// Enforces a node budget shared by every search holding the same counter.
///
/// Each step counts as one node. Components solved on different threads
/// draw from one budget by sharing `nodes_used`.
#[derive(Debug)]
pub struct NodeLimitMonitor<'a, T> {
    nodes_used: &'a AtomicU64,
    node_limit: u64,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> NodeLimitMonitor<'a, T>
where
    T: SolverFloat,
{
    #[inline]
    pub fn new(nodes_used: &'a AtomicU64, node_limit: u64) -> Self {
        Self {
            nodes_used,
            node_limit,
            _phantom: std::marker::PhantomData,
        }
    }

    #[inline]
    fn reached_limit(&self) -> bool {
        self.nodes_used.load(Ordering::Relaxed) >= self.node_limit
    }
}

impl<'a, T> SearchMonitor<T> for NodeLimitMonitor<'a, T>
where
    T: SolverFloat,
{
    fn name(&self) -> &str {
        "NodeLimitMonitor"
    }

    fn on_enter_search(&mut self, _instance: &Instance<T>) {}

    fn on_exit_search(&mut self) {}

    fn on_solution_found(&mut self, _solution: &Solution<T>) {}

    #[inline(always)]
    fn on_step(&mut self) {
        self.nodes_used.fetch_add(1, Ordering::Relaxed);
    }

    fn search_command(&self) -> SearchCommand {
        if self.reached_limit() {
            SearchCommand::Terminate("Node limit reached".to_string())
        } else {
            SearchCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_continue_before_limit_and_terminate_at_limit() {
        let counter = AtomicU64::new(0);
        let mut monitor = NodeLimitMonitor::<f64>::new(&counter, 3);

        assert_eq!(monitor.search_command(), SearchCommand::Continue);
        monitor.on_step();
        monitor.on_step();
        assert_eq!(monitor.search_command(), SearchCommand::Continue);
        monitor.on_step();
        assert!(matches!(monitor.search_command(), SearchCommand::Terminate(_)));
        assert!(matches!(monitor.search_command(), SearchCommand::Terminate(_)));
    }

    #[test]
    fn test_zero_limit_terminates_immediately() {
        let counter = AtomicU64::new(0);
        let monitor = NodeLimitMonitor::<f64>::new(&counter, 0);
        assert!(matches!(monitor.search_command(), SearchCommand::Terminate(_)));
    }

    #[test]
    fn test_monitors_share_one_budget() {
        let counter = AtomicU64::new(0);
        let mut m1 = NodeLimitMonitor::<f64>::new(&counter, 4);
        let mut m2 = NodeLimitMonitor::<f64>::new(&counter, 4);

        m1.on_step();
        m1.on_step();
        m2.on_step();
        assert_eq!(m1.search_command(), SearchCommand::Continue);
        m2.on_step();
        assert!(matches!(m1.search_command(), SearchCommand::Terminate(_)));
        assert!(matches!(m2.search_command(), SearchCommand::Terminate(_)));
    }

    #[test]
    fn test_concurrent_steps_reach_limit() {
        let counter = Arc::new(AtomicU64::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || {
                    let mut m = NodeLimitMonitor::<f64>::new(c.as_ref(), 1000);
                    for _ in 0..250 {
                        m.on_step();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let m = NodeLimitMonitor::<f64>::new(counter.as_ref(), 1000);
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
        assert!(matches!(m.search_command(), SearchCommand::Terminate(_)));
    }
}
