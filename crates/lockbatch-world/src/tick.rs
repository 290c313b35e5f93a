//! Per-world tick phases.
//!
//! One step of one world runs four phases in order:
//!
//! 1. **Reset triggers**: a world whose reset flag is set starts a fresh
//!    episode. The flag is consumed, reward and done are cleared, and the
//!    world does not advance this step.
//! 2. **Step**: every other world advances using its actions. A world that
//!    is still done from the previous step with auto-reset off is frozen
//!    instead: it keeps `done = 1` and reports reward 0.
//! 3. **Auto-reset**: with auto-reset on, a world that became done in this
//!    step is reinitialized in place. Its reward and done flag from the
//!    terminal step are left visible.
//! 4. **Observe**: observation rows are refreshed for every world.
//!
//! Worlds never read each other's rows, so a phase can run over any subset
//! of the batch in any order. The host backend runs all four phases per
//! world; the device backend runs each phase across all worlds before the
//! next. Both produce bit-identical state.

use lockbatch_core::error::{BackendFault, SimError};

use crate::sim::{Simulation, WorldContext};
use crate::state::WorldMut;

// ── WorldOutcome ────────────────────────────────────────────────

/// What happened to one world during a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorldOutcome {
    /// The world advanced one step.
    Stepped,
    /// A staged reset was consumed; the world started a fresh episode
    /// instead of stepping.
    ResetTriggered,
    /// The world stepped, reported done, and was reinitialized.
    AutoReset,
    /// The world is done and auto-reset is off; nothing changed.
    Terminal,
}

// ── AdvanceReport ───────────────────────────────────────────────

/// Outcome counts over a set of worlds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Worlds that stepped (including those that were then auto-reset).
    pub stepped: u32,
    /// Worlds that consumed a staged reset.
    pub reset_triggered: u32,
    /// Worlds reinitialized by auto-reset.
    pub auto_reset: u32,
    /// Frozen terminal worlds.
    pub terminal: u32,
}

impl AdvanceReport {
    /// Count one world's outcome.
    pub fn record(&mut self, outcome: WorldOutcome) {
        match outcome {
            WorldOutcome::Stepped => self.stepped += 1,
            WorldOutcome::ResetTriggered => self.reset_triggered += 1,
            WorldOutcome::AutoReset => {
                self.stepped += 1;
                self.auto_reset += 1;
            }
            WorldOutcome::Terminal => self.terminal += 1,
        }
    }

    /// Add the counts of another report.
    pub fn merge(&mut self, other: &AdvanceReport) {
        self.stepped += other.stepped;
        self.reset_triggered += other.reset_triggered;
        self.auto_reset += other.auto_reset;
        self.terminal += other.terminal;
    }

    /// Total worlds accounted for.
    pub fn total(&self) -> u32 {
        self.stepped + self.reset_triggered + self.terminal
    }
}

fn fault(world: &WorldMut<'_>, error: SimError) -> BackendFault {
    BackendFault::Simulation {
        world: world.index,
        error,
    }
}

// ── Phases ──────────────────────────────────────────────────────

/// Bring a freshly allocated world into its initial state.
///
/// Run once per world at construction.
pub fn initialize_world(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
) -> Result<(), BackendFault> {
    *world.reset = 0;
    *world.reward = 0.0;
    *world.done = 0;
    sim.reset_world(ctx, world).map_err(|e| fault(world, e))?;
    observe_phase(sim, ctx, world)
}

/// Phase 1: consume a pending reset.
///
/// Returns `Some(ResetTriggered)` if the world was reset and must skip the
/// remaining step phases, `None` otherwise.
pub fn reset_phase(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
) -> Result<Option<WorldOutcome>, BackendFault> {
    if *world.reset == 0 {
        return Ok(None);
    }
    *world.reset = 0;
    *world.reward = 0.0;
    *world.done = 0;
    sim.reset_world(ctx, world).map_err(|e| fault(world, e))?;
    Ok(Some(WorldOutcome::ResetTriggered))
}

/// Phase 2: advance the world, or hold it if it is terminal.
pub fn step_phase(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
    auto_reset: bool,
) -> Result<WorldOutcome, BackendFault> {
    if world.is_done() && !auto_reset {
        *world.reward = 0.0;
        return Ok(WorldOutcome::Terminal);
    }
    *world.reward = 0.0;
    *world.done = 0;
    sim.step_world(ctx, world).map_err(|e| fault(world, e))?;
    Ok(WorldOutcome::Stepped)
}

/// Phase 3: reinitialize a world that just finished its episode.
pub fn auto_reset_phase(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
    outcome: WorldOutcome,
    auto_reset: bool,
) -> Result<WorldOutcome, BackendFault> {
    if outcome != WorldOutcome::Stepped || !auto_reset || !world.is_done() {
        return Ok(outcome);
    }
    sim.reset_world(ctx, world).map_err(|e| fault(world, e))?;
    Ok(WorldOutcome::AutoReset)
}

/// Phase 4: refresh observations.
pub fn observe_phase(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
) -> Result<(), BackendFault> {
    sim.observe_world(ctx, world).map_err(|e| fault(world, e))
}

/// Run all four phases for one world.
pub fn advance_world(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    world: &mut WorldMut<'_>,
    auto_reset: bool,
) -> Result<WorldOutcome, BackendFault> {
    let outcome = match reset_phase(sim, ctx, world)? {
        Some(outcome) => outcome,
        None => {
            let stepped = step_phase(sim, ctx, world, auto_reset)?;
            auto_reset_phase(sim, ctx, world, stepped, auto_reset)?
        }
    };
    observe_phase(sim, ctx, world)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BatchState;
    use lockbatch_core::id::TickId;
    use lockbatch_core::layout::WorldLayout;

    /// hidden[0] counts steps, hidden[1] counts resets. Done after
    /// `episode` steps; reward is the step count.
    struct Counter {
        episode: f32,
    }

    impl Simulation for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn layout(&self) -> WorldLayout {
            WorldLayout {
                agents_per_world: 1,
                lidar_samples: 1,
                room_entities: 0,
                room_entity_features: 0,
                hidden_len: 2,
            }
        }

        fn reset_world(&self, _: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
            w.hidden[0] = 0.0;
            w.hidden[1] += 1.0;
            Ok(())
        }

        fn step_world(&self, _: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
            w.hidden[0] += 1.0;
            *w.reward = w.hidden[0];
            if w.hidden[0] >= self.episode {
                *w.done = 1;
            }
            Ok(())
        }

        fn observe_world(&self, _: &WorldContext, w: &mut WorldMut<'_>) -> Result<(), SimError> {
            w.lidar[0] = w.hidden[0];
            Ok(())
        }
    }

    fn ctx() -> WorldContext {
        WorldContext {
            seed: 0,
            tick: TickId(1),
        }
    }

    fn state(sim: &Counter) -> BatchState {
        let mut s = BatchState::new(sim.layout(), 1).unwrap();
        for mut w in s.worlds_mut() {
            initialize_world(sim, &ctx(), &mut w).unwrap();
        }
        s
    }

    fn advance(sim: &Counter, s: &mut BatchState, auto_reset: bool) -> WorldOutcome {
        let mut worlds = s.worlds_mut();
        advance_world(sim, &ctx(), &mut worlds[0], auto_reset).unwrap()
    }

    #[test]
    fn plain_step_advances_and_observes() {
        let sim = Counter { episode: 10.0 };
        let mut s = state(&sim);
        assert_eq!(advance(&sim, &mut s, true), WorldOutcome::Stepped);
        assert_eq!(s.reward(), &[1.0]);
        assert_eq!(s.lidar(), &[1.0]);
        assert_eq!(s.done(), &[0]);
    }

    #[test]
    fn triggered_reset_replaces_the_step() {
        let sim = Counter { episode: 10.0 };
        let mut s = state(&sim);
        advance(&sim, &mut s, true);
        advance(&sim, &mut s, true);
        s.reset_mut()[0] = 1;
        assert_eq!(advance(&sim, &mut s, true), WorldOutcome::ResetTriggered);
        assert_eq!(s.reset(), &[0]);
        assert_eq!(s.reward(), &[0.0]);
        assert_eq!(s.hidden(), &[0.0, 2.0]);
        assert_eq!(s.lidar(), &[0.0]);
    }

    #[test]
    fn auto_reset_keeps_terminal_reward_and_done() {
        let sim = Counter { episode: 2.0 };
        let mut s = state(&sim);
        advance(&sim, &mut s, true);
        assert_eq!(advance(&sim, &mut s, true), WorldOutcome::AutoReset);
        assert_eq!(s.done(), &[1]);
        assert_eq!(s.reward(), &[2.0]);
        // Fresh episode observed in the same step.
        assert_eq!(s.lidar(), &[0.0]);
        assert_eq!(advance(&sim, &mut s, true), WorldOutcome::Stepped);
        assert_eq!(s.done(), &[0]);
    }

    #[test]
    fn terminal_world_freezes_without_auto_reset() {
        let sim = Counter { episode: 1.0 };
        let mut s = state(&sim);
        assert_eq!(advance(&sim, &mut s, false), WorldOutcome::Stepped);
        assert_eq!(s.done(), &[1]);
        let hidden = s.hidden().to_vec();
        for _ in 0..3 {
            assert_eq!(advance(&sim, &mut s, false), WorldOutcome::Terminal);
            assert_eq!(s.done(), &[1]);
            assert_eq!(s.reward(), &[0.0]);
            assert_eq!(s.hidden(), &hidden[..]);
        }
        s.reset_mut()[0] = 1;
        assert_eq!(advance(&sim, &mut s, false), WorldOutcome::ResetTriggered);
        assert_eq!(s.done(), &[0]);
    }

    #[test]
    fn report_counts_outcomes() {
        let mut a = AdvanceReport::default();
        a.record(WorldOutcome::Stepped);
        a.record(WorldOutcome::AutoReset);
        let mut b = AdvanceReport::default();
        b.record(WorldOutcome::ResetTriggered);
        b.record(WorldOutcome::Terminal);
        a.merge(&b);
        assert_eq!(a.stepped, 2);
        assert_eq!(a.auto_reset, 1);
        assert_eq!(a.reset_triggered, 1);
        assert_eq!(a.terminal, 1);
        assert_eq!(a.total(), 4);
    }
}
