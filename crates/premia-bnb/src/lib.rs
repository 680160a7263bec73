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

//! # Premia BnB
//!
//! Exact branch-and-bound engine for constrained multiple-choice selection.
//!
//! - `bnb`: the `BnbSolver` and its depth-first search session.
//! - `bound`: relaxation bounders (`IndependentBounder`,
//!   `KnapsackRelaxationBounder`) and the convex hull they rely on.
//! - `branching`: decisions and decision builders choosing the next entity.
//! - `extract`: turning a complete selection into a `Solution`.
//! - `fixed`: pins applied before the search starts.
//! - `monitor`: tree search monitors (logging, composition, adapters).
//! - `result` and `stats`: the search outcome and its counters.
//! - `state`: the partial assignment explored by the search.

pub mod bnb;
pub mod bound;
pub mod branching;
pub mod extract;
pub mod fixed;
pub mod monitor;
pub mod result;
mod stack;
pub mod state;
pub mod stats;
mod trail;
