//! Device-resident backend.
//!
//! The batch lives with a device context owned by a dedicated device
//! thread. Each step is one launch of a kernel graph compiled at
//! construction: the graph's nodes run in order, and each node is executed
//! data-parallel across the device's lanes before the next node starts.
//!
//! The device here is a software device. The device thread lives as long
//! as the backend, but lanes do not: every kernel node forks one scoped
//! host thread per lane and joins them all before the next node starts,
//! so a step with four nodes spawns four rounds of lane threads. With a
//! single lane the nodes run inline on the device thread.
//!
//! The state bundle is moved to the device thread for the duration of a
//! launch and moved back with the completion. Buffer addresses do not
//! change across launches because only the owning `Box` travels.
//!
//! # Protocol
//!
//! The backend sends [`Launch`] requests over a bounded(1) channel, each
//! carrying a one-shot reply channel. The device thread always replies
//! with the state it was given, even when the launch faults. If the device
//! thread is gone the launch reports [`BackendFault::DeviceLost`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use lockbatch_core::error::{BackendFault, ConfigError};
use lockbatch_world::tick::{
    auto_reset_phase, initialize_world, observe_phase, reset_phase, step_phase,
};
use lockbatch_world::{AdvanceReport, BatchState, Simulation, WorldContext, WorldMut, WorldOutcome};

use crate::host::{merge_results, panic_message};
use crate::partition::{partition, shards_mut};

/// Number of software devices exposed by this runtime.
pub const DEVICE_COUNT: i32 = 1;

// ── DeviceContext ───────────────────────────────────────────────

/// An opened device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceContext {
    ordinal: i32,
    lanes: usize,
}

impl DeviceContext {
    /// Open device `ordinal` with `lanes` parallel lanes.
    ///
    /// Only ordinals in `0..DEVICE_COUNT` exist.
    pub fn open(ordinal: i32, lanes: usize) -> Result<Self, ConfigError> {
        if !(0..DEVICE_COUNT).contains(&ordinal) {
            return Err(ConfigError::DeviceInit {
                device_id: ordinal,
                reason: format!("no such device ({DEVICE_COUNT} available)"),
            });
        }
        Ok(Self {
            ordinal,
            lanes: lanes.max(1),
        })
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    /// Parallel lanes per kernel node.
    pub fn lanes(&self) -> usize {
        self.lanes
    }
}

// ── KernelGraph ─────────────────────────────────────────────────

/// One data-parallel kernel, run over every world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelNode {
    /// Construction-time reset and first observation.
    Initialize,
    /// Consume pending reset flags.
    ResetTriggers,
    /// Advance worlds that were not reset.
    Step,
    /// Reinitialize worlds that became done.
    AutoReset,
    /// Refresh observations.
    Observe,
}

/// A fixed sequence of kernel nodes, compiled once per backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelGraph {
    nodes: Vec<KernelNode>,
    auto_reset: bool,
}

impl KernelGraph {
    /// The graph run once at construction.
    pub fn init() -> Self {
        Self {
            nodes: vec![KernelNode::Initialize],
            auto_reset: false,
        }
    }

    /// The per-step graph. The auto-reset node is only present when
    /// `auto_reset` is on.
    pub fn step(auto_reset: bool) -> Self {
        let mut nodes = vec![KernelNode::ResetTriggers, KernelNode::Step];
        if auto_reset {
            nodes.push(KernelNode::AutoReset);
        }
        nodes.push(KernelNode::Observe);
        Self { nodes, auto_reset }
    }

    /// Nodes in launch order.
    pub fn nodes(&self) -> &[KernelNode] {
        &self.nodes
    }

    /// Run every node over `state`, in order.
    ///
    /// Each node forks its lanes as scoped threads and joins them before
    /// the next node runs. Stops after the first node that faults.
    pub fn launch(
        &self,
        device: &DeviceContext,
        sim: &dyn Simulation,
        state: &mut BatchState,
        ctx: &WorldContext,
    ) -> Result<AdvanceReport, BackendFault> {
        let mut worlds = state.worlds_mut();
        let mut outcomes: Vec<Option<WorldOutcome>> = vec![None; worlds.len()];
        let ranges = partition(worlds.len(), device.lanes);

        for &node in &self.nodes {
            if ranges.len() <= 1 {
                run_lane(node, sim, ctx, &mut worlds, &mut outcomes, self.auto_reset)?;
                continue;
            }
            let world_shards = shards_mut(&mut worlds, &ranges);
            let outcome_shards = shards_mut(&mut outcomes, &ranges);
            let auto_reset = self.auto_reset;
            let results: Vec<Result<AdvanceReport, BackendFault>> = thread::scope(|s| {
                let handles: Vec<_> = world_shards
                    .into_iter()
                    .zip(outcome_shards)
                    .enumerate()
                    .map(|(lane, (w, o))| {
                        thread::Builder::new()
                            .name(format!("lockbatch-device{}-lane{lane}", device.ordinal))
                            .spawn_scoped(s, move || {
                                run_lane(node, sim, ctx, w, o, auto_reset).map(|()| AdvanceReport::default())
                            })
                    })
                    .collect();
                handles
                    .into_iter()
                    .enumerate()
                    .map(|(lane, handle)| match handle {
                        Ok(h) => h.join().unwrap_or_else(|payload| {
                            Err(BackendFault::Device {
                                device_id: device.ordinal,
                                reason: format!(
                                    "lane {lane} panicked in {node:?}: {}",
                                    panic_message(payload.as_ref())
                                ),
                            })
                        }),
                        Err(e) => Err(BackendFault::Device {
                            device_id: device.ordinal,
                            reason: format!("lane {lane} could not start: {e}"),
                        }),
                    })
                    .collect()
            });
            merge_results(results)?;
        }

        let mut report = AdvanceReport::default();
        for outcome in outcomes.into_iter().flatten() {
            report.record(outcome);
        }
        Ok(report)
    }
}

/// Execute one node over a lane's worlds, stopping at the first failure.
fn run_lane(
    node: KernelNode,
    sim: &dyn Simulation,
    ctx: &WorldContext,
    worlds: &mut [WorldMut<'_>],
    outcomes: &mut [Option<WorldOutcome>],
    auto_reset: bool,
) -> Result<(), BackendFault> {
    for (world, outcome) in worlds.iter_mut().zip(outcomes.iter_mut()) {
        match node {
            KernelNode::Initialize => initialize_world(sim, ctx, world)?,
            KernelNode::ResetTriggers => *outcome = reset_phase(sim, ctx, world)?,
            KernelNode::Step => {
                if outcome.is_none() {
                    *outcome = Some(step_phase(sim, ctx, world, auto_reset)?);
                }
            }
            KernelNode::AutoReset => {
                if let Some(o) = *outcome {
                    *outcome = Some(auto_reset_phase(sim, ctx, world, o, auto_reset)?);
                }
            }
            KernelNode::Observe => observe_phase(sim, ctx, world)?,
        }
    }
    Ok(())
}

// ── Device thread ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GraphId {
    Init,
    Step,
}

/// A launch request sent to the device thread.
struct Launch {
    graph: GraphId,
    state: Box<BatchState>,
    ctx: WorldContext,
    reply: Sender<Completion>,
}

/// The device thread's reply: the state, always, plus the launch result.
struct Completion {
    state: Box<BatchState>,
    result: Result<AdvanceReport, BackendFault>,
}

fn device_loop(device: DeviceContext, sim: Arc<dyn Simulation>, init: KernelGraph, step: KernelGraph, rx: Receiver<Launch>) {
    tracing::debug!(ordinal = device.ordinal, lanes = device.lanes, "device thread started");
    while let Ok(launch) = rx.recv() {
        let Launch {
            graph,
            mut state,
            ctx,
            reply,
        } = launch;
        let kernel = match graph {
            GraphId::Init => &init,
            GraphId::Step => &step,
        };
        tracing::trace!(?graph, tick = ctx.tick.0, "launch");
        let result = panic::catch_unwind(AssertUnwindSafe(|| kernel.launch(&device, &*sim, &mut state, &ctx)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!(ordinal = device.ordinal, ?graph, %message, "launch panicked");
                Err(BackendFault::Device {
                    device_id: device.ordinal,
                    reason: format!("launch panicked: {message}"),
                })
            });
        // The receiver may have given up; the state is dropped with the
        // completion in that case.
        let _ = reply.send(Completion { state, result });
    }
    tracing::debug!(ordinal = device.ordinal, "device thread exiting");
}

// ── DeviceResidentBackend ───────────────────────────────────────

/// Backend that advances the batch by kernel-graph launches on a device.
pub struct DeviceResidentBackend {
    ordinal: i32,
    lanes: usize,
    commands: Option<Sender<Launch>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceResidentBackend {
    /// Open device `gpu_id`, compile the graphs and start the device thread.
    pub fn new(
        sim: Arc<dyn Simulation>,
        gpu_id: i32,
        lanes: usize,
        auto_reset: bool,
    ) -> Result<Self, ConfigError> {
        let device = DeviceContext::open(gpu_id, lanes)?;
        let lanes = device.lanes();
        let init = KernelGraph::init();
        let step = KernelGraph::step(auto_reset);
        tracing::debug!(
            sim = sim.name(),
            ordinal = gpu_id,
            lanes,
            nodes = ?step.nodes(),
            "compiled step graph"
        );

        let (tx, rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name(format!("lockbatch-device-{gpu_id}"))
            .spawn(move || device_loop(device, sim, init, step, rx))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("device {gpu_id} thread: {e}"),
            })?;

        Ok(Self {
            ordinal: gpu_id,
            lanes,
            commands: Some(tx),
            thread: Some(thread),
        })
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    /// Parallel lanes per kernel node.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Run the init graph over `state`.
    pub fn initialize(&self, state: &mut Box<BatchState>, ctx: &WorldContext) -> Result<(), BackendFault> {
        self.launch(GraphId::Init, state, ctx).map(|_| ())
    }

    /// Run the step graph over `state`.
    pub fn advance(&self, state: &mut Box<BatchState>, ctx: &WorldContext) -> Result<AdvanceReport, BackendFault> {
        self.launch(GraphId::Step, state, ctx)
    }

    /// Hand `state` to the device thread and wait for it to come back.
    ///
    /// While the launch is in flight `state` holds an empty bundle. If the
    /// device is lost it keeps holding it.
    fn launch(
        &self,
        graph: GraphId,
        state: &mut Box<BatchState>,
        ctx: &WorldContext,
    ) -> Result<AdvanceReport, BackendFault> {
        let lost = BackendFault::DeviceLost {
            device_id: self.ordinal,
        };
        let Some(commands) = &self.commands else {
            return Err(lost);
        };
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let resident = std::mem::replace(state, Box::new(BatchState::empty()));
        let request = Launch {
            graph,
            state: resident,
            ctx: *ctx,
            reply: reply_tx,
        };
        if let Err(e) = commands.send(request) {
            *state = e.into_inner().state;
            return Err(lost);
        }
        match reply_rx.recv() {
            Ok(done) => {
                *state = done.state;
                done.result
            }
            Err(_) => Err(lost),
        }
    }
}

impl Drop for DeviceResidentBackend {
    fn drop(&mut self) {
        // Closing the channel ends the device loop.
        self.commands.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::warn!(ordinal = self.ordinal, "device thread panicked during shutdown");
            } else {
                tracing::debug!(ordinal = self.ordinal, "device thread joined");
            }
        }
    }
}
