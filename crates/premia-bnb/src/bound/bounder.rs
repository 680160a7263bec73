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

use crate::state::SearchState;
use premia_model::model::Instance;
use premia_search::num::SolverFloat;

/// Upper estimate of the reward any completion of a partial assignment can
/// reach.
pub trait RelaxationBounder<T>
where
    T: SolverFloat,
{
    /// Returns the name of the bounder.
    fn name(&self) -> &str;

    /// Precomputes instance data. Called once per search, before the first
    /// call to `upper_bound`.
    fn prepare(&mut self, instance: &Instance<T>);

    /// Returns an upper bound on the total reward of every feasible
    /// completion of `state`, including the reward already decided.
    ///
    /// Returns `None` if the relaxation proves that no completion is
    /// feasible. Implementations must be admissible (never below a feasible
    /// completion) and must not increase when `state` is extended.
    fn upper_bound(&mut self, instance: &Instance<T>, state: &SearchState<T>) -> Option<T>;
}

impl<T> std::fmt::Debug for dyn RelaxationBounder<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RelaxationBounder({})", self.name())
    }
}

impl<T> std::fmt::Display for dyn RelaxationBounder<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RelaxationBounder({})", self.name())
    }
}
