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

use crate::{num::SolverFloat, stats::SolverStatistics};
use premia_model::solution::Solution;

#[derive(Debug, Clone, PartialEq)]
pub enum SolverResult<T> {
    /// No selection satisfies all constraints.
    Infeasible,
    /// The solution is proven optimal.
    Optimal(Solution<T>),
    /// A feasible solution was found but the search stopped before proving
    /// optimality.
    Suboptimal(Solution<T>),
    /// The search stopped without a solution and without proving
    /// infeasibility.
    Unknown,
}

impl<T> SolverResult<T> {
    /// Short status name, as used in reports.
    #[inline]
    pub fn status(&self) -> &'static str {
        match self {
            SolverResult::Infeasible => "Infeasible",
            SolverResult::Optimal(_) => "Optimal",
            SolverResult::Suboptimal(_) => "Suboptimal",
            SolverResult::Unknown => "Unknown",
        }
    }

    #[inline]
    pub fn solution(&self) -> Option<&Solution<T>> {
        match self {
            SolverResult::Optimal(solution) | SolverResult::Suboptimal(solution) => Some(solution),
            _ => None,
        }
    }

    #[inline]
    pub fn into_solution(self) -> Option<Solution<T>> {
        match self {
            SolverResult::Optimal(solution) | SolverResult::Suboptimal(solution) => Some(solution),
            _ => None,
        }
    }
}

impl<T> std::fmt::Display for SolverResult<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Infeasible => write!(f, "Infeasible"),
            SolverResult::Optimal(solution) => {
                write!(f, "Optimal(reward={})", solution.total_reward())
            }
            SolverResult::Suboptimal(solution) => {
                write!(f, "Suboptimal(reward={})", solution.total_reward())
            }
            SolverResult::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The search space was exhausted with an incumbent.
    OptimalityProven,
    /// The search space was exhausted without an incumbent.
    InfeasibilityProven,
    /// A monitor stopped the search; the string names the limit.
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::OptimalityProven => write!(f, "Optimality Proven"),
            TerminationReason::InfeasibilityProven => write!(f, "Infeasibility Proven"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

/// Final answer of a solver: status with solution, why the search ended,
/// and aggregated statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome<T> {
    pub result: SolverResult<T>,
    pub reason: TerminationReason,
    pub statistics: SolverStatistics,
}

impl<T> SolverOutcome<T>
where
    T: SolverFloat,
{
    #[inline]
    pub fn new(
        result: SolverResult<T>,
        reason: TerminationReason,
        statistics: SolverStatistics,
    ) -> Self {
        Self {
            result,
            reason,
            statistics,
        }
    }

    #[inline]
    pub fn optimal(solution: Solution<T>, statistics: SolverStatistics) -> Self {
        Self::new(
            SolverResult::Optimal(solution),
            TerminationReason::OptimalityProven,
            statistics,
        )
    }

    #[inline]
    pub fn suboptimal<R: Into<String>>(
        solution: Solution<T>,
        reason: R,
        statistics: SolverStatistics,
    ) -> Self {
        Self::new(
            SolverResult::Suboptimal(solution),
            TerminationReason::Aborted(reason.into()),
            statistics,
        )
    }

    #[inline]
    pub fn infeasible(statistics: SolverStatistics) -> Self {
        Self::new(
            SolverResult::Infeasible,
            TerminationReason::InfeasibilityProven,
            statistics,
        )
    }

    #[inline]
    pub fn unknown<R: Into<String>>(reason: R, statistics: SolverStatistics) -> Self {
        Self::new(
            SolverResult::Unknown,
            TerminationReason::Aborted(reason.into()),
            statistics,
        )
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self.result, SolverResult::Optimal(_))
    }

    #[inline]
    pub fn is_suboptimal(&self) -> bool {
        matches!(self.result, SolverResult::Suboptimal(_))
    }

    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self.result, SolverResult::Infeasible)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self.result, SolverResult::Unknown)
    }

    #[inline]
    pub fn has_solution(&self) -> bool {
        self.result.solution().is_some()
    }

    #[inline]
    pub fn solution(&self) -> Option<&Solution<T>> {
        self.result.solution()
    }
}

impl<T> std::fmt::Display for SolverOutcome<T>
where
    T: SolverFloat,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result: {}", self.result)?;
        writeln!(f, "Termination: {}", self.reason)?;
        write!(f, "{}", self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_model::index::OptionIndex;

    fn solution(reward: f64) -> Solution<f64> {
        Solution::new(reward, vec![OptionIndex::new(0)], vec![], vec![1.0], vec![])
    }

    #[test]
    fn test_constructors_set_status_and_reason() {
        let stats = SolverStatistics::default();

        let o = SolverOutcome::optimal(solution(3.0), stats.clone());
        assert!(o.is_optimal() && o.has_solution());
        assert_eq!(o.reason, TerminationReason::OptimalityProven);

        let o = SolverOutcome::suboptimal(solution(2.0), "Node limit reached", stats.clone());
        assert!(o.is_suboptimal());
        assert_eq!(o.solution().map(|s| s.total_reward()), Some(2.0));
        assert_eq!(
            o.reason,
            TerminationReason::Aborted("Node limit reached".to_string())
        );

        let o = SolverOutcome::<f64>::infeasible(stats.clone());
        assert!(o.is_infeasible() && !o.has_solution());
        assert_eq!(o.reason, TerminationReason::InfeasibilityProven);

        let o = SolverOutcome::<f64>::unknown("Time limit reached", stats);
        assert!(o.is_unknown());
        assert_eq!(o.result.status(), "Unknown");
    }

    #[test]
    fn test_into_solution() {
        assert!(SolverResult::Optimal(solution(1.0)).into_solution().is_some());
        assert!(SolverResult::<f64>::Infeasible.into_solution().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", SolverResult::Optimal(solution(45.0))),
            "Optimal(reward=45)"
        );
        assert_eq!(
            format!("{}", TerminationReason::Aborted("x".into())),
            "Aborted: x"
        );
        let o = SolverOutcome::<f64>::infeasible(SolverStatistics::default());
        let text = format!("{}", o);
        assert!(text.starts_with("Result: Infeasible\nTermination: Infeasibility Proven\n"));
        assert!(text.contains("Solver Statistics:"));
    }
}
