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

//! Upper convex hull of `(weight, reward)` points, the efficient frontier
//! used by the fractional knapsack.

use premia_search::num::SolverFloat;

/// A `(weight, reward)` point of an entity's menu under one constraint.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HullPoint<T> {
    pub weight: T,
    pub reward: T,
}

impl<T> HullPoint<T> {
    #[inline]
    pub const fn new(weight: T, reward: T) -> Self {
        Self { weight, reward }
    }
}

/// Returns `true` if `b` lies on or below the segment from `a` to `c`.
#[inline]
fn is_below<T: SolverFloat>(a: HullPoint<T>, b: HullPoint<T>, c: HullPoint<T>) -> bool {
    (b.reward - a.reward) * (c.weight - b.weight) <= (c.reward - b.reward) * (b.weight - a.weight)
}

/// Computes the upper concave hull of `points` into `hull`.
///
/// The hull starts at the lightest point (highest reward among equally light
/// ones) and ends at the point of maximal reward. Weights and rewards are
/// strictly increasing along it, and slopes strictly decreasing. `points` is
/// reordered.
pub fn upper_hull<T>(points: &mut [HullPoint<T>], hull: &mut Vec<HullPoint<T>>)
where
    T: SolverFloat,
{
    hull.clear();
    points.sort_unstable_by(|a, b| {
        a.weight
            .partial_cmp(&b.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.reward
                    .partial_cmp(&a.reward)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    for &p in points.iter() {
        if let Some(last) = hull.last() {
            if p.reward <= last.reward {
                continue;
            }
        }
        while hull.len() >= 2 && is_below(hull[hull.len() - 2], hull[hull.len() - 1], p) {
            hull.pop();
        }
        hull.push(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(w: f64, r: f64) -> HullPoint<f64> {
        HullPoint::new(w, r)
    }

    fn hull_of(points: &[HullPoint<f64>]) -> Vec<HullPoint<f64>> {
        let mut pts = points.to_vec();
        let mut hull = Vec::new();
        upper_hull(&mut pts, &mut hull);
        hull
    }

    #[test]
    fn test_drops_dominated_points() {
        let hull = hull_of(&[p(2.0, 5.0), p(1.0, 5.0), p(3.0, 4.0), p(0.0, 1.0)]);
        assert_eq!(hull, vec![p(0.0, 1.0), p(1.0, 5.0)]);
    }

    #[test]
    fn test_drops_points_below_the_chord() {
        // (1, 1) lies below the segment from (0, 0) to (2, 4).
        let hull = hull_of(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 4.0)]);
        assert_eq!(hull, vec![p(0.0, 0.0), p(2.0, 4.0)]);
    }

    #[test]
    fn test_keeps_concave_chain() {
        let hull = hull_of(&[p(3.0, 5.0), p(0.0, 0.0), p(1.0, 3.0), p(2.0, 4.5)]);
        assert_eq!(hull, vec![p(0.0, 0.0), p(1.0, 3.0), p(2.0, 4.5), p(3.0, 5.0)]);
    }

    #[test]
    fn test_equal_weights_keep_best_reward() {
        let hull = hull_of(&[p(1.0, 2.0), p(1.0, 7.0), p(1.0, 3.0)]);
        assert_eq!(hull, vec![p(1.0, 7.0)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(hull_of(&[]).is_empty());
    }
}
