//! Lockbatch quickstart: a batch of multi-room navigation worlds.
//!
//! Demonstrates:
//!   1. Building a `ManagerConfig` and a `Manager` over `RoomsSim`
//!   2. Staging per-agent actions and a reset
//!   3. Stepping and reading the exported tensor views
//!   4. Running the same batch on the device-resident backend
//!
//! Run with:
//!   RUST_LOG=lockbatch_engine=debug cargo run --example quickstart

use std::sync::Arc;

use lockbatch_core::{ExecMode, ManagerConfig};
use lockbatch_engine::Manager;
use lockbatch_rooms::{RoomsConfig, RoomsSim};
use tracing_subscriber::EnvFilter;

// ─── Batch parameters ───────────────────────────────────────────

const NUM_WORLDS: u32 = 8;
const STEPS: usize = 300;

fn config(exec_mode: ExecMode) -> ManagerConfig {
    ManagerConfig {
        exec_mode,
        num_worlds: NUM_WORLDS,
        seed: 42,
        ..ManagerConfig::default()
    }
}

/// Walk every agent forward, weaving left and right.
fn policy(step: usize, world: u32, agent: usize) -> [i32; 3] {
    let weave = if (step / 20 + world as usize + agent) % 2 == 0 { 1 } else { -1 };
    [weave, 2, 0]
}

fn run(mgr: &mut Manager) -> Result<(), Box<dyn std::error::Error>> {
    let agents = mgr.layout().agents();
    let mut episodes = 0u32;
    let mut total_reward = 0.0f32;

    for step in 0..STEPS {
        for w in 0..NUM_WORLDS {
            for a in 0..agents {
                let [x, y, r] = policy(step, w, a);
                mgr.set_action(w as i32, a as i32, x, y, r)?;
            }
        }
        if step == STEPS / 2 {
            mgr.trigger_reset(0)?;
        }
        mgr.step()?;

        let done = mgr.done_tensor();
        episodes += done.as_u8().unwrap_or_default().iter().map(|&d| d as u32).sum::<u32>();
        total_reward += mgr.reward_tensor().as_f32().unwrap_or_default().iter().sum::<f32>();
    }

    let metrics = mgr.last_metrics();
    println!(
        "  {} steps, {episodes} finished episodes, total reward {total_reward:.2}",
        mgr.current_tick()
    );
    println!(
        "  last step: {}us total, {}us advance, {} bytes",
        metrics.total_us, metrics.advance_us, metrics.memory_bytes
    );
    println!("  state hash: {:#018x}", mgr.state_hash());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let sim = Arc::new(RoomsSim::new(RoomsConfig::default())?);

    let mut host = Manager::new(config(ExecMode::HostThreaded), sim.clone())?;
    println!("host-threaded ({} worlds)", host.num_worlds());
    for (name, view) in host.tensors() {
        println!("  {name:<22} {:?} {:?}", view.element_type(), view.shape());
    }
    run(&mut host)?;

    let mut device = Manager::new(config(ExecMode::DeviceResident), sim)?;
    println!("device-resident ({:?})", device.placement());
    run(&mut device)?;

    assert_eq!(host.state_hash(), device.state_hash());
    println!("backends agree");
    Ok(())
}
