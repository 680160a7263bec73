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

use crate::stats::BnbSolverStatistics;
use premia_model::solution::Solution;
use premia_search::{
    num::SolverFloat,
    result::{SolverOutcome, SolverResult, TerminationReason},
    stats::SolverStatisticsBuilder,
};

/// Outcome of one branch-and-bound search.
#[derive(Debug, Clone)]
pub struct BnbSolverOutcome<T> {
    result: SolverResult<T>,
    termination_reason: TerminationReason,
    statistics: BnbSolverStatistics<T>,
}

impl<T> BnbSolverOutcome<T> {
    #[inline]
    pub fn optimal(solution: Solution<T>, statistics: BnbSolverStatistics<T>) -> Self {
        Self {
            result: SolverResult::Optimal(solution),
            termination_reason: TerminationReason::OptimalityProven,
            statistics,
        }
    }

    #[inline]
    pub fn infeasible(statistics: BnbSolverStatistics<T>) -> Self {
        Self {
            result: SolverResult::Infeasible,
            termination_reason: TerminationReason::InfeasibilityProven,
            statistics,
        }
    }

    /// A search stopped by a monitor. With an incumbent the result is
    /// `Suboptimal`, otherwise `Unknown`: running out of budget proves
    /// nothing about feasibility.
    #[inline]
    pub fn aborted<R>(
        solution: Option<Solution<T>>,
        reason: R,
        statistics: BnbSolverStatistics<T>,
    ) -> Self
    where
        R: Into<String>,
    {
        let result = match solution {
            Some(solution) => SolverResult::Suboptimal(solution),
            None => SolverResult::Unknown,
        };

        Self {
            result,
            termination_reason: TerminationReason::Aborted(reason.into()),
            statistics,
        }
    }

    #[inline]
    pub fn result(&self) -> &SolverResult<T> {
        &self.result
    }

    #[inline]
    pub fn termination_reason(&self) -> &TerminationReason {
        &self.termination_reason
    }

    #[inline]
    pub fn statistics(&self) -> &BnbSolverStatistics<T> {
        &self.statistics
    }

    #[inline]
    pub fn solution(&self) -> Option<&Solution<T>> {
        self.result.solution()
    }

    #[inline]
    pub fn into_parts(self) -> (SolverResult<T>, TerminationReason, BnbSolverStatistics<T>) {
        (self.result, self.termination_reason, self.statistics)
    }
}

impl<T> From<BnbSolverOutcome<T>> for SolverOutcome<T>
where
    T: SolverFloat,
{
    fn from(outcome: BnbSolverOutcome<T>) -> Self {
        let statistics = SolverStatisticsBuilder::new()
            .nodes_explored(outcome.statistics.nodes_explored)
            .solutions_found(outcome.statistics.solutions_found)
            .components(1)
            .solve_duration(outcome.statistics.time_total)
            .build();
        SolverOutcome::new(outcome.result, outcome.termination_reason, statistics)
    }
}

impl<T> std::fmt::Display for BnbSolverOutcome<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result: {}", self.result)?;
        writeln!(f, "Termination: {}", self.termination_reason)?;
        write!(f, "{}", self.statistics)
    }
}
