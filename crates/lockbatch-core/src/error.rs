//! Error types for lockbatch.
//!
//! One enum per failure class: construction (`ConfigError`), staging
//! (`IndexError`), stepping (`BackendFault`), and the errors simulations
//! report from their per-world functions (`SimError`).

use std::error::Error;
use std::fmt;

use crate::id::WorldIdx;

/// Errors returned by a simulation's per-world functions.
///
/// Wrapped in [`BackendFault::Simulation`] by the backend that ran the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// The per-world function could not complete.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// World state was found inconsistent (e.g. a non-finite position).
    InvalidState {
        /// Description of the inconsistency.
        reason: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::InvalidState { reason } => write!(f, "invalid world state: {reason}"),
        }
    }
}

impl Error for SimError {}

/// Failure during `step()`.
///
/// Fatal for the manager instance: once a step has faulted the batch is in
/// an undefined state and every later step reports [`BackendFault::Poisoned`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendFault {
    /// A simulation function failed for one world.
    ///
    /// When several worlds fail within one step, the lowest index is reported.
    Simulation {
        /// The failing world.
        world: WorldIdx,
        /// The underlying simulation error.
        error: SimError,
    },
    /// A host worker thread panicked while advancing its world range.
    WorkerPanicked {
        /// Index of the worker within the pool.
        worker: usize,
        /// Panic payload, if it was a string.
        message: String,
    },
    /// A host worker thread could not be spawned.
    WorkerSpawn {
        /// Description of the spawn failure.
        reason: String,
    },
    /// The device reported a fault during a launch.
    Device {
        /// Device ordinal.
        device_id: i32,
        /// Description of the fault.
        reason: String,
    },
    /// The device context is gone (its thread exited without replying).
    DeviceLost {
        /// Device ordinal.
        device_id: i32,
    },
    /// A previous step faulted; the manager must be rebuilt.
    Poisoned,
}

impl fmt::Display for BackendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulation { world, error } => write!(f, "world {world}: {error}"),
            Self::WorkerPanicked { worker, message } => {
                write!(f, "host worker {worker} panicked: {message}")
            }
            Self::WorkerSpawn { reason } => write!(f, "host worker spawn failed: {reason}"),
            Self::Device { device_id, reason } => write!(f, "device {device_id} fault: {reason}"),
            Self::DeviceLost { device_id } => write!(f, "device {device_id} context lost"),
            Self::Poisoned => write!(f, "manager poisoned by an earlier backend fault"),
        }
    }
}

impl Error for BackendFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Simulation { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors detected while constructing a manager.
///
/// No partially built manager is ever returned alongside one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `num_worlds` was zero.
    ZeroWorlds,
    /// The simulation's world layout is unusable.
    InvalidLayout {
        /// Description of the layout problem.
        reason: String,
    },
    /// The requested device is unavailable or could not be initialised.
    DeviceInit {
        /// The requested device ordinal.
        device_id: i32,
        /// Description of the failure.
        reason: String,
    },
    /// A backend thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
    /// The construction-time reset of every world failed.
    InitialReset(BackendFault),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWorlds => write!(f, "num_worlds must be at least 1"),
            Self::InvalidLayout { reason } => write!(f, "invalid world layout: {reason}"),
            Self::DeviceInit { device_id, reason } => {
                write!(f, "device {device_id} initialisation failed: {reason}")
            }
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::InitialReset(e) => write!(f, "initial reset failed: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InitialReset(e) => Some(e),
            _ => None,
        }
    }
}

/// Out-of-range index or mis-sized buffer passed to a staging call.
///
/// The manager's state is untouched; the caller may retry with valid input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// World index outside `[0, num_worlds)`.
    World {
        /// The requested index.
        index: i32,
        /// Number of worlds in the batch.
        num_worlds: u32,
    },
    /// Agent index outside `[0, agents_per_world)`.
    Agent {
        /// The (valid) world the agent was addressed in.
        world: u32,
        /// The requested agent index.
        index: i32,
        /// Number of agents per world.
        agents_per_world: u32,
    },
    /// A bulk staging buffer has the wrong number of elements.
    Length {
        /// Required element count.
        expected: usize,
        /// Supplied element count.
        actual: usize,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::World { index, num_worlds } => {
                write!(f, "world index {index} out of range (num_worlds={num_worlds})")
            }
            Self::Agent {
                world,
                index,
                agents_per_world,
            } => write!(
                f,
                "agent index {index} out of range in world {world} \
                 (agents_per_world={agents_per_world})"
            ),
            Self::Length { expected, actual } => {
                write!(f, "staging buffer has {actual} elements, expected {expected}")
            }
        }
    }
}

impl Error for IndexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_fault_exposes_source() {
        let fault = BackendFault::Simulation {
            world: WorldIdx(3),
            error: SimError::ExecutionFailed {
                reason: "boom".into(),
            },
        };
        assert_eq!(fault.to_string(), "world 3: execution failed: boom");
        assert!(fault.source().is_some());
        assert!(BackendFault::Poisoned.source().is_none());
    }

    #[test]
    fn config_error_wraps_initial_reset() {
        let err = ConfigError::InitialReset(BackendFault::DeviceLost { device_id: 0 });
        assert!(err.to_string().contains("device 0 context lost"));
        assert!(err.source().is_some());
    }

    #[test]
    fn index_error_messages_name_bounds() {
        let w = IndexError::World {
            index: 4,
            num_worlds: 4,
        };
        assert!(w.to_string().contains("num_worlds=4"));
        let a = IndexError::Agent {
            world: 1,
            index: -1,
            agents_per_world: 2,
        };
        assert!(a.to_string().contains("agents_per_world=2"));
    }
}
