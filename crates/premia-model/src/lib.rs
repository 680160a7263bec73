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

//! # Premia Model
//!
//! Immutable problem description for constrained multiple-choice selection:
//! every entity picks exactly one option from its menu, options carry a
//! reward and a risk, each entity may cap its own risk, and named global
//! constraints bound weighted sums across entities.
//!
//! - `index`: typed indices for entities, options and constraints.
//! - `model`: declarations, validation and the flattened `Instance`.
//! - `solution`: the immutable `Solution` record produced by a solve.
//! - `loading`: the line-oriented text instance format.
//! - `error`: the `InvalidInstance` rejection reasons.

pub mod error;
pub mod index;
pub mod loading;
pub mod model;
pub mod solution;
