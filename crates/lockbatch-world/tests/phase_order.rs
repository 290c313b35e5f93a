//! The tick phases give the same state whether they run world-major (all
//! phases for one world, then the next) or phase-major (one phase across
//! all worlds, then the next phase).

use lockbatch_core::id::TickId;
use lockbatch_test_utils::CounterSim;
use lockbatch_world::tick::{
    advance_world, auto_reset_phase, initialize_world, observe_phase, reset_phase, step_phase,
};
use lockbatch_world::{batch_hash, BatchState, Simulation, WorldContext};
use proptest::prelude::*;

fn fresh(sim: &CounterSim, n: u32) -> BatchState {
    let mut s = BatchState::new(sim.layout(), n).unwrap();
    let ctx = WorldContext {
        seed: 7,
        tick: TickId(0),
    };
    for mut w in s.worlds_mut() {
        initialize_world(sim, &ctx, &mut w).unwrap();
    }
    s
}

fn world_major(sim: &CounterSim, s: &mut BatchState, ctx: &WorldContext, auto_reset: bool) {
    for mut w in s.worlds_mut() {
        advance_world(sim, ctx, &mut w, auto_reset).unwrap();
    }
}

fn phase_major(sim: &CounterSim, s: &mut BatchState, ctx: &WorldContext, auto_reset: bool) {
    let mut worlds = s.worlds_mut();
    let mut outcomes: Vec<_> = worlds
        .iter_mut()
        .map(|w| reset_phase(sim, ctx, w).unwrap())
        .collect();
    for (w, o) in worlds.iter_mut().zip(outcomes.iter_mut()) {
        if o.is_none() {
            *o = Some(step_phase(sim, ctx, w, auto_reset).unwrap());
        }
    }
    for (w, o) in worlds.iter_mut().zip(outcomes.iter_mut()) {
        if let Some(outcome) = *o {
            *o = Some(auto_reset_phase(sim, ctx, w, outcome, auto_reset).unwrap());
        }
    }
    for w in worlds.iter_mut() {
        observe_phase(sim, ctx, w).unwrap();
    }
}

proptest! {
    #[test]
    fn phase_order_does_not_change_state(
        n in 1u32..12,
        episode_len in 1u32..6,
        auto_reset in any::<bool>(),
        script in prop::collection::vec((any::<u16>(), -3i32..4), 1..20),
    ) {
        let sim = CounterSim::new(2, episode_len);
        let mut a = fresh(&sim, n);
        let mut b = fresh(&sim, n);
        prop_assert_eq!(batch_hash(&a), batch_hash(&b));

        for (tick, (reset_mask, action)) in script.into_iter().enumerate() {
            for s in [&mut a, &mut b] {
                for (i, r) in s.reset_mut().iter_mut().enumerate() {
                    *r = i32::from(reset_mask & (1 << (i % 16)) != 0);
                }
                s.action_mut().fill(action);
            }
            let ctx = WorldContext { seed: 7, tick: TickId(tick as u64 + 1) };
            world_major(&sim, &mut a, &ctx, auto_reset);
            phase_major(&sim, &mut b, &ctx, auto_reset);
            prop_assert_eq!(batch_hash(&a), batch_hash(&b));
        }
    }
}
