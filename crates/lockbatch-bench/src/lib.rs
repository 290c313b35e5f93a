//! Benchmark profiles and utilities for the lockbatch batch manager.
//!
//! Provides pre-built [`ManagerConfig`] profiles for benchmarks and examples:
//!
//! - [`reference_profile`]: 256 rooms worlds, 2 agents each
//! - [`stress_profile`]: 4096 rooms worlds for stress testing
//! - [`ActionScript`]: deterministic per-tick action blocks via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use lockbatch_core::{ConfigError, ExecMode, ManagerConfig};
use lockbatch_engine::Manager;
use lockbatch_rooms::{RoomsConfig, RoomsSim};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Worlds in the reference profile.
pub const REFERENCE_WORLDS: u32 = 256;
/// Worlds in the stress profile.
pub const STRESS_WORLDS: u32 = 4096;

/// Reference benchmark profile: 256 worlds of the default rooms layout.
pub fn reference_profile(exec_mode: ExecMode, seed: u64) -> ManagerConfig {
    ManagerConfig {
        exec_mode,
        num_worlds: REFERENCE_WORLDS,
        seed,
        ..ManagerConfig::default()
    }
}

/// Stress benchmark profile: same as [`reference_profile`] at 16x the
/// world count.
pub fn stress_profile(exec_mode: ExecMode, seed: u64) -> ManagerConfig {
    ManagerConfig {
        num_worlds: STRESS_WORLDS,
        ..reference_profile(exec_mode, seed)
    }
}

/// Build a manager over the default rooms simulation.
pub fn rooms_manager(config: ManagerConfig) -> Result<Manager, ConfigError> {
    let sim = RoomsSim::new(RoomsConfig::default())?;
    Manager::new(config, Arc::new(sim))
}

/// Deterministic source of `[N, A, 3]` action blocks.
///
/// Components are drawn uniformly from `-2..=2`, the range the rooms
/// simulation accepts without saturation.
pub struct ActionScript {
    rng: ChaCha8Rng,
    block: Vec<i32>,
}

impl ActionScript {
    /// Script for `num_worlds` worlds of `agents` agents each.
    pub fn new(num_worlds: u32, agents: usize, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            block: vec![0; num_worlds as usize * agents * 3],
        }
    }

    /// Draw the next block.
    pub fn next_block(&mut self) -> &[i32] {
        for v in &mut self.block {
            *v = self.rng.random_range(-2..=2);
        }
        &self.block
    }
}
