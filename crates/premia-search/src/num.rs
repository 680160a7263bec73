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

use num_traits::{Float, FromPrimitive};

/// Numeric types the solvers operate on.
pub trait SolverFloat:
    Float
    + FromPrimitive
    + Default
    + std::fmt::Debug
    + std::fmt::Display
    + std::iter::Sum
    + Send
    + Sync
    + 'static
{
    /// Tolerance for comparing two values of magnitude `a` and `b`:
    /// `1e-9 * (1 + max(|a|, |b|))`.
    #[inline]
    fn tolerance(a: Self, b: Self) -> Self {
        let eps = Self::from_f64(1e-9).unwrap_or_else(Self::epsilon);
        eps * (Self::one() + a.abs().max(b.abs()))
    }

    /// `self <= other` up to tolerance.
    #[inline]
    fn approx_le(self, other: Self) -> bool {
        self <= other + Self::tolerance(self, other)
    }

    /// `self == other` up to tolerance.
    #[inline]
    fn approx_eq(self, other: Self) -> bool {
        (self - other).abs() <= Self::tolerance(self, other)
    }

    /// `self < other` by more than the tolerance.
    #[inline]
    fn definitely_less(self, other: Self) -> bool {
        self + Self::tolerance(self, other) < other
    }

    /// Lossy view for statistics and error reports.
    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl<T> SolverFloat for T where
    T: Float
        + FromPrimitive
        + Default
        + std::fmt::Debug
        + std::fmt::Display
        + std::iter::Sum
        + Send
        + Sync
        + 'static
{
}
