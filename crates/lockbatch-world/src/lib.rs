//! World state bundle for lockbatch.
//!
//! [`BatchState`] owns every batched field for all worlds, laid out
//! world-major and contiguous per field. [`Simulation`] is the opaque
//! per-world step function the backends drive, and [`tick`] holds the
//! per-world phase functions both backends share so that they produce
//! identical results.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod hash;
pub mod sim;
pub mod state;
pub mod tick;

pub use hash::{batch_hash, world_hash};
pub use sim::{Simulation, WorldContext};
pub use state::{BatchState, WorldMut, WorldRef};
pub use tick::{AdvanceReport, WorldOutcome};
