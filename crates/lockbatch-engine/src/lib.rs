//! Batch manager for lockbatch.
//!
//! [`Manager`] owns a batch of worlds, drives them in lockstep through the
//! backend selected by [`ManagerConfig::exec_mode`], applies staged actions
//! and resets at the start of each step, and exposes every batched field as
//! a zero-copy [`TensorView`].
//!
//! [`ManagerConfig::exec_mode`]: lockbatch_core::ManagerConfig::exec_mode
//! [`TensorView`]: lockbatch_core::TensorView

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod export;
pub mod manager;
pub mod metrics;
pub mod staging;

pub use bridge::{BatchFrame, RenderBridge};
pub use manager::Manager;
pub use metrics::StepMetrics;
pub use staging::StagingArea;
