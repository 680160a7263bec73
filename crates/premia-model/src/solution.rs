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

use crate::index::{ConstraintIndex, EntityIndex, OptionIndex};
use num_traits::Float;

/// A complete selection together with its realized values.
///
/// Produced once per solve and never mutated afterwards. Slack values are
/// `bound - realized`; an entity without a local constraint has infinite
/// local slack.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution<T> {
    /// Sum of the rewards of all selected options.
    total_reward: T,

    /// `selections[e]` is the option chosen for entity `e`.
    selections: Vec<OptionIndex>,

    /// Realized left-hand side of every global constraint.
    global_lhs: Vec<T>,

    /// `threshold(e) - risk(selected(e))` per entity.
    local_slacks: Vec<T>,

    /// `budget(c) - global_lhs[c]` per global constraint.
    global_slacks: Vec<T>,
}

impl<T> Solution<T>
where
    T: Float,
{
    /// Constructs a new `Solution`.
    ///
    /// # Panics
    ///
    /// Panics if the per-entity or the per-constraint vectors have
    /// inconsistent lengths.
    pub fn new(
        total_reward: T,
        selections: Vec<OptionIndex>,
        global_lhs: Vec<T>,
        local_slacks: Vec<T>,
        global_slacks: Vec<T>,
    ) -> Self {
        assert_eq!(
            selections.len(),
            local_slacks.len(),
            "called Solution::new with inconsistent vector lengths: selections.len() = {}, local_slacks.len() = {}",
            selections.len(),
            local_slacks.len()
        );
        assert_eq!(
            global_lhs.len(),
            global_slacks.len(),
            "called Solution::new with inconsistent vector lengths: global_lhs.len() = {}, global_slacks.len() = {}",
            global_lhs.len(),
            global_slacks.len()
        );

        Self {
            total_reward,
            selections,
            global_lhs,
            local_slacks,
            global_slacks,
        }
    }

    /// The solution of an instance without entities.
    pub fn empty(num_constraints: usize, budgets: impl IntoIterator<Item = T>) -> Self {
        let global_slacks: Vec<T> = budgets.into_iter().collect();
        debug_assert_eq!(global_slacks.len(), num_constraints);
        Self {
            total_reward: T::zero(),
            selections: Vec::new(),
            global_lhs: vec![T::zero(); num_constraints],
            local_slacks: Vec::new(),
            global_slacks,
        }
    }

    #[inline]
    pub fn total_reward(&self) -> T {
        self.total_reward
    }

    #[inline]
    pub fn num_entities(&self) -> usize {
        self.selections.len()
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.global_lhs.len()
    }

    /// Returns the option selected for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is out of bounds.
    #[inline]
    pub fn selection(&self, entity: EntityIndex) -> OptionIndex {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities(),
            "called `Solution::selection` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities(),
            index
        );
        self.selections[index]
    }

    #[inline]
    pub fn selections(&self) -> &[OptionIndex] {
        &self.selections
    }

    /// Returns the realized left-hand side of `constraint`.
    ///
    /// # Panics
    ///
    /// Panics if `constraint` is out of bounds.
    #[inline]
    pub fn global_lhs(&self, constraint: ConstraintIndex) -> T {
        let index = constraint.get();
        debug_assert!(
            index < self.num_constraints(),
            "called `Solution::global_lhs` with constraint index out of bounds: the len is {} but the index is {}",
            self.num_constraints(),
            index
        );
        self.global_lhs[index]
    }

    #[inline]
    pub fn global_lhs_values(&self) -> &[T] {
        &self.global_lhs
    }

    #[inline]
    pub fn local_slack(&self, entity: EntityIndex) -> T {
        self.local_slacks[entity.get()]
    }

    #[inline]
    pub fn local_slacks(&self) -> &[T] {
        &self.local_slacks
    }

    #[inline]
    pub fn global_slack(&self, constraint: ConstraintIndex) -> T {
        self.global_slacks[constraint.get()]
    }

    #[inline]
    pub fn global_slacks(&self) -> &[T] {
        &self.global_slacks
    }
}

impl<T> std::fmt::Display for Solution<T>
where
    T: Float + std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution Summary")?;
        writeln!(f, "   Total Reward: {}", self.total_reward)?;
        writeln!(f)?;

        if self.num_entities() == 0 {
            writeln!(f, "   (No entities selected)")?;
            return Ok(());
        }

        writeln!(f, "   {:<10} | {:<10} | {:<12}", "Entity", "Option", "Local Slack")?;
        writeln!(f, "   {:-<10}-+-{:-<10}-+-{:-<12}", "", "", "")?;
        for (i, option) in self.selections.iter().enumerate() {
            writeln!(
                f,
                "   {:<10} | {:<10} | {:<12}",
                i,
                option.get(),
                self.local_slacks[i]
            )?;
        }

        if self.num_constraints() > 0 {
            writeln!(f)?;
            writeln!(f, "   {:<10} | {:<12} | {:<12}", "Constraint", "LHS", "Slack")?;
            writeln!(f, "   {:-<10}-+-{:-<12}-+-{:-<12}", "", "", "")?;
            for (c, (lhs, slack)) in self.global_lhs.iter().zip(&self.global_slacks).enumerate() {
                writeln!(f, "   {:<10} | {:<12} | {:<12}", c, lhs, slack)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oi(i: usize) -> OptionIndex {
        OptionIndex::new(i)
    }

    #[test]
    fn test_new_and_accessors() {
        let sol = Solution::new(
            45.0,
            vec![oi(1), oi(1), oi(1)],
            vec![0.13],
            vec![0.05, 0.05, 0.01],
            vec![0.02],
        );
        assert_eq!(sol.total_reward(), 45.0);
        assert_eq!(sol.num_entities(), 3);
        assert_eq!(sol.num_constraints(), 1);
        assert_eq!(sol.selection(EntityIndex::new(2)), oi(1));
        assert_eq!(sol.global_lhs(ConstraintIndex::new(0)), 0.13);
        assert_eq!(sol.global_slack(ConstraintIndex::new(0)), 0.02);
        assert_eq!(sol.local_slack(EntityIndex::new(2)), 0.01);
        assert_eq!(sol.selections(), &[oi(1), oi(1), oi(1)]);
    }

    #[test]
    #[should_panic(expected = "called Solution::new with inconsistent vector lengths")]
    fn test_new_panics_on_length_mismatch() {
        let _ = Solution::new(0.0, vec![oi(0)], vec![], vec![], vec![]);
    }

    #[test]
    fn test_empty_solution() {
        let sol = Solution::empty(2, [1.0, 3.0]);
        assert_eq!(sol.total_reward(), 0.0);
        assert_eq!(sol.num_entities(), 0);
        assert_eq!(sol.global_lhs_values(), &[0.0, 0.0]);
        assert_eq!(sol.global_slacks(), &[1.0, 3.0]);
    }

    #[test]
    fn test_display_formatting() {
        let sol = Solution::new(20.0, vec![oi(1), oi(0)], vec![], vec![0.5, 1.0], vec![]);

        let mut expected = String::new();
        expected.push_str("Solution Summary\n");
        expected.push_str("   Total Reward: 20\n");
        expected.push('\n');
        expected.push_str("   Entity     | Option     | Local Slack \n");
        expected.push_str("   -----------+------------+-------------\n");
        expected.push_str("   0          | 1          | 0.5         \n");
        expected.push_str("   1          | 0          | 1           \n");

        assert_eq!(format!("{}", sol), expected);
    }

    #[test]
    fn test_display_lists_constraints() {
        let sol = Solution::new(1.0, vec![oi(0)], vec![2.0], vec![f64::INFINITY], vec![1.0]);
        let out = format!("{}", sol);
        assert!(out.contains("Constraint"));
        assert!(out.contains("inf"));
    }
}
