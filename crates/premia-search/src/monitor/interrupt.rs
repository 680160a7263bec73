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
use std::sync::atomic::{AtomicBool, Ordering};

/// Stops the search once an external flag is raised (e.g. from a Ctrl-C
/// handler or another thread).
#[derive(Debug, Clone)]
pub struct InterruptMonitor<'a, T> {
    stop_flag: &'a AtomicBool,
    reason: &'static str,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> InterruptMonitor<'a, T> {
    #[inline(always)]
    pub fn new(stop_flag: &'a AtomicBool) -> Self {
        Self::with_reason(stop_flag, "Interrupt signal received")
    }

    /// Like `new`, terminating with `reason` instead of the default message.
    #[inline(always)]
    pub fn with_reason(stop_flag: &'a AtomicBool, reason: &'static str) -> Self {
        Self {
            stop_flag,
            reason,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<'a, T> SearchMonitor<T> for InterruptMonitor<'a, T>
where
    T: SolverFloat,
{
    fn name(&self) -> &str {
        "InterruptMonitor"
    }

    fn on_enter_search(&mut self, _instance: &Instance<T>) {}
    fn on_exit_search(&mut self) {}
    fn on_solution_found(&mut self, _solution: &Solution<T>) {}
    fn on_step(&mut self) {}

    fn search_command(&self) -> SearchCommand {
        if self.stop_flag.load(Ordering::Relaxed) {
            SearchCommand::Terminate(self.reason.to_string())
        } else {
            SearchCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continues_while_flag_is_clear() {
        let flag = AtomicBool::new(false);
        let monitor = InterruptMonitor::<f64>::new(&flag);
        assert_eq!(monitor.search_command(), SearchCommand::Continue);
    }

    #[test]
    fn test_terminates_once_flag_is_set() {
        let flag = AtomicBool::new(false);
        let monitor = InterruptMonitor::<f64>::new(&flag);
        flag.store(true, Ordering::Relaxed);
        match monitor.search_command() {
            SearchCommand::Terminate(reason) => assert_eq!(reason, "Interrupt signal received"),
            other => panic!("expected Terminate, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_reason() {
        let flag = AtomicBool::new(true);
        let monitor = InterruptMonitor::<f64>::with_reason(&flag, "Sibling infeasible");
        assert_eq!(
            monitor.search_command(),
            SearchCommand::Terminate("Sibling infeasible".to_string())
        );
    }
}
