//! Manager configuration.
//!
//! [`ManagerConfig`] is fixed at construction and never changes for the
//! lifetime of the manager built from it.

use crate::error::ConfigError;

/// Upper bound on host workers / device lanes.
const MAX_WORKERS: usize = 256;

/// Which execution backend advances the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecMode {
    /// Worlds are split across a fork/join pool of host threads each step.
    HostThreaded,
    /// Worlds live in a device context and are advanced by a kernel-graph
    /// launch on that device.
    DeviceResident,
}

/// Configuration for a batch manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Backend selection.
    pub exec_mode: ExecMode,
    /// Device ordinal. Ignored unless `exec_mode` is `DeviceResident`.
    pub gpu_id: i32,
    /// Number of worlds in the batch. Must be at least 1.
    pub num_worlds: u32,
    /// Reinitialize a world within the same step it reports done.
    pub auto_reset: bool,
    /// Seed handed to the simulation for every world. Default: 0.
    pub seed: u64,
    /// Host worker threads (HostThreaded) or device lanes (DeviceResident).
    /// `None` = auto-detect from `available_parallelism`.
    pub worker_threads: Option<usize>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            exec_mode: ExecMode::HostThreaded,
            gpu_id: 0,
            num_worlds: 1,
            auto_reset: true,
            seed: 0,
            worker_threads: None,
        }
    }
}

impl ManagerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_worlds == 0 {
            return Err(ConfigError::ZeroWorlds);
        }
        Ok(())
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 256]`. The result never exceeds
    /// `num_worlds`, since a worker with no worlds has nothing to do.
    pub fn resolved_worker_count(&self) -> usize {
        let requested = match self.worker_threads {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .min(MAX_WORKERS),
        };
        requested.min(self.num_worlds.max(1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ManagerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.exec_mode, ExecMode::HostThreaded);
        assert!(cfg.auto_reset);
    }

    #[test]
    fn zero_worlds_rejected() {
        let cfg = ManagerConfig {
            num_worlds: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWorlds));
    }

    #[test]
    fn worker_count_bounded_by_worlds() {
        let cfg = ManagerConfig {
            num_worlds: 3,
            worker_threads: Some(16),
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 3);
    }

    #[test]
    fn worker_count_zero_clamps_to_one() {
        let cfg = ManagerConfig {
            num_worlds: 8,
            worker_threads: Some(0),
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 1);
    }

    #[test]
    fn auto_worker_count_is_positive() {
        let cfg = ManagerConfig {
            num_worlds: 1024,
            ..ManagerConfig::default()
        };
        let n = cfg.resolved_worker_count();
        assert!((1..=MAX_WORKERS).contains(&n));
    }
}
