//! Core types for the lockbatch batched simulation manager.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: world and agent
//! indices, the manager configuration, the per-world field layout, the
//! zero-copy [`TensorView`] descriptor, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod id;
pub mod layout;
pub mod tensor;

pub use config::{ExecMode, ManagerConfig};
pub use error::{BackendFault, ConfigError, IndexError, SimError};
pub use id::{AgentIdx, TickId, WorldIdx};
pub use layout::WorldLayout;
pub use tensor::{ElementType, Placement, Shape, TensorData, TensorView};
