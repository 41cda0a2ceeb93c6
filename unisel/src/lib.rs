// Copyright 2024-2026 The unisel developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

//! # unisel
//!
//! A constraint-programming instruction selector for compiler back-ends.
//!
//! Given a function expressed as a language-neutral graph of operations,
//! values, blocks, and control/state flow, and a target machine whose
//! instructions are bound to pattern graphs, `unisel`:
//!
//! 1. enumerates all subgraph-isomorphic embeddings of every pattern into
//!    the function graph ([`matcher`]),
//! 2. assembles the matches and the function into a high-level constraint
//!    model ([`model`]),
//! 3. lowers that model into a dense array-indexed form for an external CP
//!    solver, and
//! 4. raises the solver's solution back into a form naming the original
//!    graph nodes, matches, and locations.
//!
//! # Architecture
//!
//! - [`ir`] - The graph kernel: typed labeled multi-digraph with ordered
//!   edges, CFG/SSA projections, dominator sets
//! - [`opstruct`] - Op-structures (graph + constraints + metadata) and the
//!   pre-matching transformation pipeline
//! - [`constraints`] - The constraint expression language with its generic
//!   reconstructor and folder
//! - [`matcher`] - The VF2-based pattern matcher with cyclic-dependency
//!   filtering and SIMD composition
//! - [`model`] - High-level model assembly, array-index lowering, solution
//!   raising
//! - [`target`] - The target machine description consumed by all of the
//!   above
//!
//! Everything in this crate is single-threaded and pure in semantics: each
//! operation produces a new value, and the only internal parallelism (the
//! matcher's per-pattern fan-out) is made deterministic before results
//! escape. The crate performs no I/O; persistence of models and solutions
//! is serde-based and belongs to the driver.
//!
//! # Example
//!
//! ```rust,ignore
//! use unisel::{function::Function, matcher, model, target::TargetMachine};
//!
//! let function: Function = /* from the front-end */;
//! let target: TargetMachine = /* target description */;
//!
//! let matches = matcher::find_matches(&function, &target)?;
//! let high = model::build_high_level_model(&function, &target, &matches)?;
//! let maps = model::ArrayIndexMaplists::from_model(&high);
//! let low = model::lower_model(&high, &maps)?;
//! // ... run the external solver on `low` ...
//! let solution = model::raise_solution(&ll_solution, &maps)?;
//! # Ok::<(), unisel::Error>(())
//! ```

pub mod constraints;
mod error;
pub mod function;
pub mod ir;
pub mod matcher;
pub mod model;
pub mod opstruct;
pub mod target;

pub use error::{Error, Result};
