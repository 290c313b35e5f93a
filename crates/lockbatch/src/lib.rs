//! Lockbatch: a batched lockstep simulation manager for reinforcement learning.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! lockbatch sub-crates. For most users, adding `lockbatch` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use lockbatch::prelude::*;
//!
//! let config = ManagerConfig {
//!     exec_mode: ExecMode::HostThreaded,
//!     num_worlds: 4,
//!     seed: 42,
//!     ..ManagerConfig::default()
//! };
//! let mut mgr = Manager::new(config, Arc::new(RoomsSim::default())).unwrap();
//!
//! mgr.set_action(2, 0, 1, 0, 0).unwrap();
//! mgr.trigger_reset(3).unwrap();
//! mgr.step().unwrap();
//!
//! assert_eq!(mgr.current_tick(), TickId(1));
//! assert_eq!(mgr.action_tensor().shape(), &[4, 2, 3]);
//! assert_eq!(mgr.done_tensor().element_type(), ElementType::UInt8);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `lockbatch-core` | IDs, config, layout, errors, tensor views |
//! | [`world`] | `lockbatch-world` | Batch storage, `Simulation` trait, step phases, hashing |
//! | [`backend`] | `lockbatch-backend` | Host-threaded and device-resident backends |
//! | [`engine`] | `lockbatch-engine` | The batch `Manager`, staging, exports, render bridge |
//! | [`rooms`] | `lockbatch-rooms` | Multi-room navigation simulation |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, configuration, and errors (`lockbatch-core`).
///
/// Contains [`types::ManagerConfig`], [`types::WorldLayout`], the error
/// enums, and [`types::TensorView`].
pub use lockbatch_core as types;

/// Batch storage and the simulation contract (`lockbatch-world`).
///
/// Implement [`world::Simulation`] to plug a new world into the manager.
pub use lockbatch_world as world;

/// Execution backends (`lockbatch-backend`).
///
/// [`backend::HostThreadedBackend`] splits worlds across host threads;
/// [`backend::DeviceResidentBackend`] keeps the batch in a device context
/// and advances it by launching a [`backend::KernelGraph`].
pub use lockbatch_backend as backend;

/// The batch manager (`lockbatch-engine`).
pub use lockbatch_engine as engine;

/// Multi-room navigation simulation (`lockbatch-rooms`).
pub use lockbatch_rooms as rooms;

/// Common imports for typical lockbatch usage.
///
/// ```rust
/// use lockbatch::prelude::*;
/// ```
pub mod prelude {
    // Configuration and ids
    pub use lockbatch_core::{AgentIdx, ExecMode, ManagerConfig, TickId, WorldIdx, WorldLayout};

    // Errors
    pub use lockbatch_core::{BackendFault, ConfigError, IndexError, SimError};

    // Tensor views
    pub use lockbatch_core::{ElementType, Placement, TensorData, TensorView};

    // Simulation contract
    pub use lockbatch_world::{Simulation, WorldContext, WorldMut};

    // Manager
    pub use lockbatch_engine::{BatchFrame, Manager, RenderBridge, StepMetrics};

    // Reference simulation
    pub use lockbatch_rooms::{RoomsConfig, RoomsSim};
}
