//! Integration test: multi-room navigation episodes through the manager.
//!
//! An auto-reset world reports `done = 1` alongside the first observation
//! of its next episode, and the two backends must produce bit-identical
//! batches for the same action sequence.

use std::sync::Arc;

use lockbatch_core::{ExecMode, ManagerConfig};
use lockbatch_engine::Manager;
use lockbatch_rooms::{RoomsConfig, RoomsSim};
use proptest::prelude::*;

fn rooms(episode_len: u32) -> Arc<RoomsSim> {
    let sim = RoomsSim::new(RoomsConfig {
        episode_len,
        ..RoomsConfig::default()
    })
    .unwrap();
    Arc::new(sim)
}

fn config(exec_mode: ExecMode, num_worlds: u32) -> ManagerConfig {
    ManagerConfig {
        exec_mode,
        num_worlds,
        seed: 7,
        worker_threads: Some(2),
        ..ManagerConfig::default()
    }
}

/// Every observation row of `world`, flattened.
fn observation(mgr: &Manager, world: usize) -> Vec<f32> {
    let mut out = Vec::new();
    for view in [
        mgr.position_observation_tensor(),
        mgr.to_other_agents_tensor(),
        mgr.to_room_entities_tensor(),
        mgr.lidar_tensor(),
    ] {
        let data = view.as_f32().unwrap_or_default();
        let row = data.len() / view.world_dim();
        out.extend_from_slice(&data[world * row..(world + 1) * row]);
    }
    out
}

#[test]
fn auto_reset_shows_initial_observation() {
    let n = 4;
    let mut mgr = Manager::new(config(ExecMode::HostThreaded, n), rooms(3)).unwrap();
    let initial: Vec<Vec<f32>> = (0..n as usize).map(|w| observation(&mgr, w)).collect();

    for step in 1..=3 {
        for w in 0..n as i32 {
            mgr.set_action(w, 0, 0, 1, 0).unwrap();
            mgr.set_action(w, 1, 1, 1, 1).unwrap();
        }
        mgr.step().unwrap();
        let done = mgr.done_tensor();
        let done = done.as_u8().unwrap();
        if step < 3 {
            assert!(done.iter().all(|&d| d == 0), "done early at step {step}");
            assert_ne!(observation(&mgr, 0), initial[0]);
        } else {
            assert!(done.iter().all(|&d| d == 1));
        }
    }

    assert_eq!(mgr.last_metrics().auto_resets, n);
    for (w, obs) in initial.iter().enumerate() {
        assert_eq!(&observation(&mgr, w), obs, "world {w}");
    }
    // The reward of the finished episode's last step survives the reset.
    assert!(mgr.reward_tensor().as_f32().unwrap().iter().all(|&r| r >= 0.0));
}

#[test]
fn single_idle_step_on_four_worlds() {
    let mut mgr = Manager::new(config(ExecMode::HostThreaded, 4), rooms(1)).unwrap();
    let position = mgr.position_observation_tensor().as_f32().unwrap().to_vec();
    mgr.step().unwrap();

    let done = mgr.done_tensor();
    assert_eq!(done.shape(), &[4, 1]);
    let row = position.len() / 4;
    let after = mgr.position_observation_tensor();
    let after = after.as_f32().unwrap();
    for (w, &d) in done.as_u8().unwrap().iter().enumerate() {
        assert!(d <= 1);
        if d == 1 {
            assert_eq!(&after[w * row..(w + 1) * row], &position[w * row..(w + 1) * row]);
        }
    }
    // One-step episodes: every world finished and started over.
    assert_eq!(mgr.last_metrics().auto_resets, 4);
}

#[test]
fn triggered_reset_restores_initial_observation() {
    let mut mgr = Manager::new(config(ExecMode::DeviceResident, 3), rooms(200)).unwrap();
    let initial = observation(&mgr, 1);
    for _ in 0..5 {
        mgr.set_action(1, 0, 1, 2, -1).unwrap();
        mgr.step().unwrap();
    }
    assert_ne!(observation(&mgr, 1), initial);

    mgr.trigger_reset(1).unwrap();
    mgr.step().unwrap();
    assert_eq!(observation(&mgr, 1), initial);
    assert_eq!(mgr.done_tensor().as_u8().unwrap()[1], 0);
    assert_eq!(mgr.reward_tensor().as_f32().unwrap()[1], 0.0);
}

#[test]
fn seed_changes_the_scene() {
    let a = Manager::new(config(ExecMode::HostThreaded, 2), rooms(200)).unwrap();
    let b = Manager::new(
        ManagerConfig {
            seed: 8,
            ..config(ExecMode::HostThreaded, 2)
        },
        rooms(200),
    )
    .unwrap();
    assert_ne!(a.state_hash(), b.state_hash());
    // Worlds within one batch draw different scenes.
    assert_ne!(observation(&a, 0), observation(&a, 1));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn backends_agree_bit_for_bit(
        num_worlds in 1u32..6,
        host_workers in 1usize..4,
        actions in prop::collection::vec(
            prop::collection::vec(-2i32..=2, 3 * 2 * 5),
            1..12,
        ),
        resets in prop::collection::vec(0u32..8, 0..4),
    ) {
        let mut host = Manager::new(
            ManagerConfig {
                worker_threads: Some(host_workers),
                ..config(ExecMode::HostThreaded, num_worlds)
            },
            rooms(6),
        )
        .unwrap();
        let mut device = Manager::new(config(ExecMode::DeviceResident, num_worlds), rooms(6))
            .unwrap();
        prop_assert_eq!(host.state_hash(), device.state_hash());

        let len = num_worlds as usize * 2 * 3;
        for (tick, block) in actions.iter().enumerate() {
            for mgr in [&mut host, &mut device] {
                mgr.stage_actions(&block[..len]).unwrap();
                if let Some(&w) = resets.get(tick) {
                    if w < num_worlds {
                        mgr.trigger_reset(w as i32).unwrap();
                    }
                }
                mgr.step().unwrap();
            }
            prop_assert_eq!(host.state_hash(), device.state_hash());
            prop_assert_eq!(host.last_metrics().worlds_stepped, device.last_metrics().worlds_stepped);
            prop_assert_eq!(host.last_metrics().auto_resets, device.last_metrics().auto_resets);
        }
    }
}
