//! Test utilities and mock simulations for lockbatch development.
//!
//! Provides small deterministic [`Simulation`](lockbatch_world::Simulation)
//! implementations whose state is easy to assert on, plus fixtures that
//! fail or panic on demand for exercising backend fault handling.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CounterSim, FailingSim, PanickingSim};
