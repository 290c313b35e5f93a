//! Execution backends for lockbatch.
//!
//! A [`Backend`] advances every world of a [`BatchState`] by one step. It
//! is chosen once, at manager construction, from
//! [`ManagerConfig::exec_mode`]:
//!
//! - [`HostThreadedBackend`] forks the batch across scoped host threads
//!   and runs every tick phase per world.
//! - [`DeviceResidentBackend`] keeps the batch with a long-lived device
//!   thread and launches a precompiled [`KernelGraph`] whose nodes run
//!   phase by phase across all worlds. Each node forks and joins its own
//!   scoped lane threads.
//!
//! Both drive the same per-world phase functions from
//! [`lockbatch_world::tick`], so for the same simulation, seed and inputs
//! they produce bit-identical state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod device;
pub mod host;
pub mod partition;

use std::sync::Arc;

use lockbatch_core::config::{ExecMode, ManagerConfig};
use lockbatch_core::error::{BackendFault, ConfigError};
use lockbatch_core::tensor::Placement;
use lockbatch_world::{AdvanceReport, BatchState, Simulation, WorldContext};

pub use device::{DeviceContext, DeviceResidentBackend, KernelGraph, KernelNode};
pub use host::HostThreadedBackend;
pub use partition::partition;

/// The backend selected for a manager.
pub enum Backend {
    /// Fork/join over host threads.
    Host(HostThreadedBackend),
    /// Kernel-graph launches on a device.
    Device(DeviceResidentBackend),
}

impl Backend {
    /// Build the backend `config.exec_mode` selects.
    pub fn new(config: &ManagerConfig, sim: Arc<dyn Simulation>) -> Result<Self, ConfigError> {
        let workers = config.resolved_worker_count();
        match config.exec_mode {
            ExecMode::HostThreaded => Ok(Self::Host(HostThreadedBackend::new(
                sim,
                workers,
                config.auto_reset,
            ))),
            ExecMode::DeviceResident => Ok(Self::Device(DeviceResidentBackend::new(
                sim,
                config.gpu_id,
                workers,
                config.auto_reset,
            )?)),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Host(_) => "host-threaded",
            Self::Device(_) => "device-resident",
        }
    }

    /// Where the batch memory lives.
    pub fn placement(&self) -> Placement {
        match self {
            Self::Host(_) => Placement::Host,
            Self::Device(d) => Placement::Device {
                ordinal: d.ordinal(),
            },
        }
    }

    /// Host workers or device lanes.
    pub fn parallelism(&self) -> usize {
        match self {
            Self::Host(h) => h.workers(),
            Self::Device(d) => d.lanes(),
        }
    }

    /// Bring every world into its initial state.
    pub fn initialize(&self, state: &mut Box<BatchState>, ctx: &WorldContext) -> Result<(), BackendFault> {
        match self {
            Self::Host(h) => h.initialize(state, ctx),
            Self::Device(d) => d.initialize(state, ctx),
        }
    }

    /// Advance every world by one step.
    pub fn advance(&self, state: &mut Box<BatchState>, ctx: &WorldContext) -> Result<AdvanceReport, BackendFault> {
        match self {
            Self::Host(h) => h.advance(state, ctx),
            Self::Device(d) => d.advance(state, ctx),
        }
    }
}
