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

//! # Premia Solver
//!
//! High-level entry point of the selection engine. The solver decomposes an
//! instance into independent components, answers purely local components
//! with a direct scan, runs branch-and-bound on the rest (optionally on
//! several threads) and merges the results into one `SolverOutcome`.
//!
//! ## Modules
//!
//! - `solver`: `Solver` and `SolverBuilder`, budgets, pins and outcome merging.
//! - `decompose`: connected components of the entity/constraint graph.
//! - `config`: TOML configuration (`SolverConfig`) and `ConfigError`.
//! - `report`: `SolutionReport`, rendered as a text table or JSON.

pub mod config;
pub mod decompose;
pub mod report;
pub mod solver;
