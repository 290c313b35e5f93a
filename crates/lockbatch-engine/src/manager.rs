//! The batch manager.
//!
//! [`Manager`] is the single entry point a training loop talks to. It is
//! fully synchronous: every mutating call takes `&mut self`, so staging,
//! stepping and reading tensor views are serialized by the borrow checker
//! rather than by locks.
//!
//! # Step sequence
//!
//! 1. Refuse if a previous step faulted (the batch is in an undefined state).
//! 2. Drain the [`StagingArea`] into the batch: raise reset flags and
//!    overwrite staged action slots.
//! 3. Dispatch one backend step over all worlds (reset triggers, simulation
//!    step, auto-reset, observe).
//! 4. Record [`StepMetrics`], advance the tick and notify the render bridge.
//!
//! Any fault in step 3 poisons the manager: the fault is returned once and
//! every later `step()` returns [`BackendFault::Poisoned`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;

use lockbatch_backend::Backend;
use lockbatch_core::config::ManagerConfig;
use lockbatch_core::error::{BackendFault, ConfigError, IndexError};
use lockbatch_core::id::{AgentIdx, TickId, WorldIdx};
use lockbatch_core::layout::WorldLayout;
use lockbatch_core::tensor::{Placement, TensorView};
use lockbatch_world::{batch_hash, world_hash, BatchState, Simulation, WorldContext};

use crate::bridge::{BatchFrame, RenderBridge};
use crate::export;
use crate::metrics::StepMetrics;
use crate::staging::StagingArea;

/// Owns a batch of lockstep worlds and the backend that advances them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lockbatch_engine::Manager;
/// use lockbatch_core::{ExecMode, ManagerConfig};
/// use lockbatch_rooms::RoomsSim;
///
/// let config = ManagerConfig {
///     exec_mode: ExecMode::HostThreaded,
///     num_worlds: 4,
///     ..ManagerConfig::default()
/// };
/// let mut mgr = Manager::new(config, Arc::new(RoomsSim::default())).unwrap();
/// mgr.set_action(2, 0, 1, 0, 0).unwrap();
/// mgr.step().unwrap();
///
/// let action = mgr.action_tensor();
/// assert_eq!(action.shape(), &[4, 2, 3]);
/// assert_eq!(&action.as_i32().unwrap()[12..15], &[1, 0, 0]);
/// ```
pub struct Manager {
    config: ManagerConfig,
    sim: Arc<dyn Simulation>,
    layout: WorldLayout,
    backend: Backend,
    state: Box<BatchState>,
    staging: StagingArea,
    tick: TickId,
    poisoned: bool,
    last_metrics: StepMetrics,
    bridge: Option<Box<dyn RenderBridge>>,
}

impl Manager {
    /// Build a manager, select its backend and reset every world.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroWorlds`] if `num_worlds` is 0.
    /// - [`ConfigError::InvalidLayout`] if the simulation's layout is
    ///   unusable or the buffers would overflow.
    /// - [`ConfigError::DeviceInit`] / [`ConfigError::ThreadSpawnFailed`]
    ///   if the device backend cannot be brought up.
    /// - [`ConfigError::InitialReset`] if the construction-time reset fails.
    pub fn new(config: ManagerConfig, sim: Arc<dyn Simulation>) -> Result<Self, ConfigError> {
        Self::build(config, sim, None)
    }

    /// Like [`new`](Self::new), with a render bridge that receives a frame
    /// after construction and after every successful step.
    pub fn with_render_bridge(
        config: ManagerConfig,
        sim: Arc<dyn Simulation>,
        bridge: Box<dyn RenderBridge>,
    ) -> Result<Self, ConfigError> {
        Self::build(config, sim, Some(bridge))
    }

    fn build(
        config: ManagerConfig,
        sim: Arc<dyn Simulation>,
        bridge: Option<Box<dyn RenderBridge>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = sim.layout();
        layout.validate(config.num_worlds)?;

        let backend = Backend::new(&config, Arc::clone(&sim))?;
        let mut state = Box::new(BatchState::new(layout, config.num_worlds)?);
        let ctx = WorldContext {
            seed: config.seed,
            tick: TickId::default(),
        };
        backend.initialize(&mut state, &ctx).map_err(|fault| {
            tracing::error!(sim = sim.name(), %fault, "initial reset failed");
            ConfigError::InitialReset(fault)
        })?;

        tracing::info!(
            sim = sim.name(),
            backend = backend.name(),
            num_worlds = config.num_worlds,
            agents_per_world = layout.agents_per_world,
            parallelism = backend.parallelism(),
            auto_reset = config.auto_reset,
            memory_bytes = state.memory_bytes(),
            "manager ready"
        );

        let staging = StagingArea::new(config.num_worlds as usize, layout.agents());
        let mut mgr = Self {
            config,
            sim,
            layout,
            backend,
            state,
            staging,
            tick: TickId::default(),
            poisoned: false,
            last_metrics: StepMetrics::default(),
            bridge,
        };
        mgr.publish_frame();
        Ok(mgr)
    }

    // ── Stepping ────────────────────────────────────────────────

    /// Apply staged resets and actions, then advance every world by one
    /// step. Blocks until the whole batch has finished.
    ///
    /// # Errors
    ///
    /// The first failing world's [`BackendFault`]. The manager is poisoned
    /// afterwards and every later call returns [`BackendFault::Poisoned`].
    pub fn step(&mut self) -> Result<(), BackendFault> {
        if self.poisoned {
            return Err(BackendFault::Poisoned);
        }
        let start = Instant::now();

        let pending_resets = self.staging.pending_resets();
        let pending_actions = self.staging.pending_actions();
        let staged = self.staging.apply(&mut self.state);
        let stage_us = start.elapsed().as_micros() as u64;

        let next = self.tick.next();
        let ctx = WorldContext {
            seed: self.config.seed,
            tick: next,
        };
        let advance_start = Instant::now();
        let report = match self.backend.advance(&mut self.state, &ctx) {
            Ok(report) => report,
            Err(fault) => {
                self.poisoned = true;
                tracing::error!(
                    sim = self.sim.name(),
                    backend = self.backend.name(),
                    tick = next.0,
                    %fault,
                    "step failed, manager poisoned"
                );
                return Err(fault);
            }
        };
        let advance_us = advance_start.elapsed().as_micros() as u64;

        self.tick = next;
        self.last_metrics = StepMetrics {
            total_us: start.elapsed().as_micros() as u64,
            stage_us,
            advance_us,
            staged_actions: staged.actions,
            worlds_stepped: report.stepped,
            triggered_resets: report.reset_triggered,
            auto_resets: report.auto_reset,
            terminal_worlds: report.terminal,
            memory_bytes: self.state.memory_bytes(),
        };
        tracing::trace!(
            tick = next.0,
            total_us = self.last_metrics.total_us,
            advance_us,
            pending_resets,
            pending_actions,
            stepped = report.stepped,
            triggered_resets = report.reset_triggered,
            auto_resets = report.auto_reset,
            terminal = report.terminal,
            "step"
        );
        self.publish_frame();
        Ok(())
    }

    fn publish_frame(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            let frame = BatchFrame {
                tick: self.tick,
                state: &self.state,
                placement: self.backend.placement(),
            };
            bridge.on_frame(&frame);
        }
    }

    // ── Staging ─────────────────────────────────────────────────

    fn world_index(&self, world_idx: i32) -> Result<WorldIdx, IndexError> {
        match u32::try_from(world_idx) {
            Ok(i) if i < self.config.num_worlds => Ok(WorldIdx(i)),
            _ => Err(IndexError::World {
                index: world_idx,
                num_worlds: self.config.num_worlds,
            }),
        }
    }

    /// Request that `world_idx` start a fresh episode during the next step.
    ///
    /// Calling this more than once before the next step has the same
    /// effect as calling it once.
    pub fn trigger_reset(&mut self, world_idx: i32) -> Result<(), IndexError> {
        let w = self.world_index(world_idx)?;
        self.staging.stage_reset(w);
        Ok(())
    }

    /// Stage the `(x, y, rotation)` action of one agent for the next step,
    /// replacing any action staged earlier for the same agent.
    pub fn set_action(
        &mut self,
        world_idx: i32,
        agent_idx: i32,
        x: i32,
        y: i32,
        r: i32,
    ) -> Result<(), IndexError> {
        let w = self.world_index(world_idx)?;
        let a = match u32::try_from(agent_idx) {
            Ok(a) if a < self.layout.agents_per_world => AgentIdx(a),
            _ => {
                return Err(IndexError::Agent {
                    world: w.0,
                    index: agent_idx,
                    agents_per_world: self.layout.agents_per_world,
                })
            }
        };
        self.staging.stage_action(w, a, [x, y, r]);
        Ok(())
    }

    /// Stage the actions of every agent in every world from a flat
    /// world-major `[num_worlds, agents_per_world, 3]` block.
    pub fn stage_actions(&mut self, actions: &[i32]) -> Result<(), IndexError> {
        let expected = self.config.num_worlds as usize * self.layout.action_len();
        if actions.len() != expected {
            return Err(IndexError::Length {
                expected,
                actual: actions.len(),
            });
        }
        self.staging.stage_all(actions);
        Ok(())
    }

    // ── Tensor views ────────────────────────────────────────────

    /// Reset flags, int32 `[N, 1]`.
    pub fn reset_tensor(&self) -> TensorView<'_> {
        export::reset(&self.state, self.placement())
    }

    /// Actions applied by the last step, int32 `[N, A, 3]`.
    pub fn action_tensor(&self) -> TensorView<'_> {
        export::action(&self.state, self.placement())
    }

    /// Rewards, float32 `[N, 1]`.
    pub fn reward_tensor(&self) -> TensorView<'_> {
        export::reward(&self.state, self.placement())
    }

    /// Done flags (0/1), uint8 `[N, 1]`.
    pub fn done_tensor(&self) -> TensorView<'_> {
        export::done(&self.state, self.placement())
    }

    /// Agent positions, float32 `[N, A, 3]`.
    pub fn position_observation_tensor(&self) -> TensorView<'_> {
        export::position_observation(&self.state, self.placement())
    }

    /// Observations of the other agents, float32 `[N, A, A-1, 2]`.
    pub fn to_other_agents_tensor(&self) -> TensorView<'_> {
        export::to_other_agents(&self.state, self.placement())
    }

    /// Observations of room entities, float32 `[N, A, E, F]`.
    pub fn to_room_entities_tensor(&self) -> TensorView<'_> {
        export::to_room_entities(&self.state, self.placement())
    }

    /// Lidar samples, float32 `[N, A, L]`.
    pub fn lidar_tensor(&self) -> TensorView<'_> {
        export::lidar(&self.state, self.placement())
    }

    /// All eight views keyed by export name, in a fixed order.
    pub fn tensors(&self) -> IndexMap<&'static str, TensorView<'_>> {
        let placement = self.placement();
        export::EXPORT_NAMES
            .iter()
            .filter_map(|&name| export::view(&self.state, name, placement).map(|v| (name, v)))
            .collect()
    }

    // ── Introspection ───────────────────────────────────────────

    /// Number of worlds in the batch.
    pub fn num_worlds(&self) -> u32 {
        self.config.num_worlds
    }

    /// The configuration the manager was built with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The simulation's per-world layout.
    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Steps completed since construction.
    pub fn current_tick(&self) -> TickId {
        self.tick
    }

    /// Metrics of the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// FNV-1a hash over every batched field, including hidden state.
    pub fn state_hash(&self) -> u64 {
        batch_hash(&self.state)
    }

    /// Hash of one world's rows, or `None` if `world` is out of range.
    pub fn world_hash(&self, world: WorldIdx) -> Option<u64> {
        world_hash(&self.state, world)
    }

    /// Whether a step has faulted.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Where the batch memory lives.
    pub fn placement(&self) -> Placement {
        self.backend.placement()
    }

    /// The simulation driven by this manager.
    pub fn simulation(&self) -> &Arc<dyn Simulation> {
        &self.sim
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("sim", &self.sim.name())
            .field("backend", &self.backend.name())
            .field("num_worlds", &self.config.num_worlds)
            .field("tick", &self.tick)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        tracing::debug!(
            sim = self.sim.name(),
            backend = self.backend.name(),
            tick = self.tick.0,
            "manager dropped"
        );
    }
}
