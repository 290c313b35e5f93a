//! Reusable simulation test fixtures.
//!
//! - [`CounterSim`]: counts steps and episodes, rewards the action sum.
//! - [`FailingSim`]: a `CounterSim` that errors in one world at one tick.
//! - [`PanickingSim`]: a `CounterSim` that panics in one world at one tick.

use lockbatch_core::{SimError, WorldLayout};
use lockbatch_world::{Simulation, WorldContext, WorldMut};

/// Slot of the step counter in hidden state.
pub const HIDDEN_STEPS: usize = 0;
/// Slot of the episode counter in hidden state.
pub const HIDDEN_EPISODES: usize = 1;
/// Slot of the running action sum in hidden state.
pub const HIDDEN_ACTION_SUM: usize = 2;

/// Counts steps and episodes.
///
/// Per world:
/// - reward = sum of every action component of every agent,
/// - done once the step counter reaches `episode_len`,
/// - `position[a] = [world, steps, a]`, lidar sample `i` = `steps + i`,
///   inter-agent rows = episode count, room-entity rows = action sum.
///
/// The episode counter starts at 1 after the construction-time reset.
pub struct CounterSim {
    pub agents: u32,
    pub lidar_samples: u32,
    pub episode_len: u32,
}

impl CounterSim {
    pub fn new(agents: u32, episode_len: u32) -> Self {
        Self {
            agents,
            lidar_samples: 4,
            episode_len,
        }
    }
}

impl Default for CounterSim {
    fn default() -> Self {
        Self::new(2, 5)
    }
}

impl Simulation for CounterSim {
    fn name(&self) -> &str {
        "counter"
    }

    fn layout(&self) -> WorldLayout {
        WorldLayout {
            agents_per_world: self.agents,
            lidar_samples: self.lidar_samples,
            room_entities: 2,
            room_entity_features: 3,
            hidden_len: 3,
        }
    }

    fn reset_world(&self, _ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        w.hidden[HIDDEN_STEPS] = 0.0;
        w.hidden[HIDDEN_EPISODES] += 1.0;
        w.hidden[HIDDEN_ACTION_SUM] = 0.0;
        Ok(())
    }

    fn step_world(&self, _ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        let sum: i64 = w.actions.iter().map(|&v| v as i64).sum();
        w.hidden[HIDDEN_STEPS] += 1.0;
        w.hidden[HIDDEN_ACTION_SUM] += sum as f32;
        *w.reward = sum as f32;
        if w.hidden[HIDDEN_STEPS] >= self.episode_len as f32 {
            *w.done = 1;
        }
        Ok(())
    }

    fn observe_world(&self, _ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        let steps = w.hidden[HIDDEN_STEPS];
        let lidar = w.layout.lidar_samples as usize;
        for a in 0..w.layout.agents() {
            w.position[a * 3] = w.index.0 as f32;
            w.position[a * 3 + 1] = steps;
            w.position[a * 3 + 2] = a as f32;
            for i in 0..lidar {
                w.lidar[a * lidar + i] = steps + i as f32;
            }
        }
        w.other_agents.fill(w.hidden[HIDDEN_EPISODES]);
        w.room_entities.fill(w.hidden[HIDDEN_ACTION_SUM]);
        Ok(())
    }
}

/// A [`CounterSim`] whose `step_world` returns an error for one world once
/// the batch reaches a given tick.
pub struct FailingSim {
    pub inner: CounterSim,
    pub fail_world: u32,
    pub fail_at_tick: u64,
}

impl FailingSim {
    pub fn new(fail_world: u32, fail_at_tick: u64) -> Self {
        Self {
            inner: CounterSim::default(),
            fail_world,
            fail_at_tick,
        }
    }
}

impl Simulation for FailingSim {
    fn name(&self) -> &str {
        "failing"
    }

    fn layout(&self) -> WorldLayout {
        self.inner.layout()
    }

    fn reset_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.inner.reset_world(ctx, w)
    }

    fn step_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        if w.index.0 == self.fail_world && ctx.tick.0 >= self.fail_at_tick {
            return Err(SimError::ExecutionFailed {
                reason: format!("deliberate failure at tick {}", ctx.tick),
            });
        }
        self.inner.step_world(ctx, w)
    }

    fn observe_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.inner.observe_world(ctx, w)
    }
}

/// A [`CounterSim`] whose `step_world` panics for one world once the batch
/// reaches a given tick.
pub struct PanickingSim {
    pub inner: CounterSim,
    pub panic_world: u32,
    pub panic_at_tick: u64,
}

impl PanickingSim {
    pub fn new(panic_world: u32, panic_at_tick: u64) -> Self {
        Self {
            inner: CounterSim::default(),
            panic_world,
            panic_at_tick,
        }
    }
}

impl Simulation for PanickingSim {
    fn name(&self) -> &str {
        "panicking"
    }

    fn layout(&self) -> WorldLayout {
        self.inner.layout()
    }

    fn reset_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.inner.reset_world(ctx, w)
    }

    fn step_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        if w.index.0 == self.panic_world && ctx.tick.0 >= self.panic_at_tick {
            panic!("deliberate panic in world {}", w.index);
        }
        self.inner.step_world(ctx, w)
    }

    fn observe_world(&self, ctx: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.inner.observe_world(ctx, w)
    }
}
