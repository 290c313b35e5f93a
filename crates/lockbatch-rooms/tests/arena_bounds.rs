//! Agents stay inside the arena and only change rooms through a door,
//! whatever actions they are given.

use lockbatch_core::id::{TickId, WorldIdx};
use lockbatch_rooms::scene::{HiddenLayout, Scene};
use lockbatch_rooms::{RoomsConfig, RoomsSim};
use lockbatch_world::tick::{advance_world, initialize_world};
use lockbatch_world::{BatchState, Simulation, WorldContext};
use proptest::prelude::*;

fn room_of(cfg: &RoomsConfig, y: f32) -> i32 {
    (y / cfg.room_length).floor() as i32
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn agents_respect_walls(
        seed in any::<u64>(),
        actions in prop::collection::vec(prop::array::uniform6(-3i32..4), 1..60),
    ) {
        let sim = RoomsSim::default();
        let cfg = sim.config().clone();
        let hidden = sim.hidden_layout().clone();
        let mut state = BatchState::new(sim.layout(), 1).unwrap();
        let ctx = |tick| WorldContext { seed, tick: TickId(tick) };
        for mut w in state.worlds_mut() {
            initialize_world(&sim, &ctx(0), &mut w).unwrap();
        }

        for (t, act) in actions.iter().enumerate() {
            let before = state.hidden().to_vec();
            state.action_mut().copy_from_slice(act);
            for mut w in state.worlds_mut() {
                advance_world(&sim, &ctx(t as u64 + 1), &mut w, false).unwrap();
            }
            if state.done()[0] == 1 {
                break;
            }
            let after = state.hidden();
            for a in 0..cfg.agents_per_world as usize {
                let r = hidden.agent(a);
                let (x0, y0) = (before[r.start], before[r.start + 1]);
                let (x1, y1) = (after[r.start], after[r.start + 1]);
                prop_assert!(x1 >= cfg.agent_radius && x1 <= cfg.room_width - cfg.agent_radius);
                prop_assert!(y1 >= cfg.agent_radius && y1 <= cfg.arena_length() - cfg.agent_radius);
                let (ra, rb) = (room_of(&cfg, y0), room_of(&cfg, y1));
                if ra != rb {
                    // Crossed wall `min(ra, rb)`; the new x must be inside its door.
                    let door = after[hidden.doors.start + ra.min(rb) as usize];
                    prop_assert!((x1 - door).abs() <= cfg.door_width / 2.0);
                }
            }
            prop_assert!(state.reward()[0] >= 0.0);
            prop_assert!(after[HiddenLayout::STEP] == (t + 1) as f32);
        }
    }

    #[test]
    fn valid_configs_spawn_inside_the_first_room(
        agents in 1u32..5,
        radius in 0.1f32..10.0,
        door_slack in 0.01f32..5.0,
        width_slack in 0.01f32..10.0,
        length_slack in 0.01f32..40.0,
        seed in any::<u64>(),
    ) {
        let door_width = 2.0 * radius + door_slack;
        let cfg = RoomsConfig {
            agents_per_world: agents,
            agent_radius: radius,
            door_width,
            room_width: (door_width + 2.0).max(2.0 * radius * agents as f32) + width_slack,
            room_length: 4.0 * radius + length_slack,
            ..RoomsConfig::default()
        };
        prop_assume!(cfg.validate().is_ok());
        for world in 0..16 {
            let scene = Scene::generate(&cfg, seed, WorldIdx(world));
            for p in &scene.agents {
                let (x, y) = p.pos;
                prop_assert!(x >= radius && x <= cfg.room_width - radius, "world {world}: x={x}");
                prop_assert!(y >= radius && y <= cfg.room_length - radius, "world {world}: y={y}");
            }
        }
    }
}
