//! The [`Simulation`] trait.
//!
//! A simulation is the opaque per-world step function the manager drives.
//! It never sees the batch: every call gets the rows of exactly one world,
//! so the same implementation runs unchanged on either backend.

use lockbatch_core::error::SimError;
use lockbatch_core::id::TickId;
use lockbatch_core::layout::WorldLayout;

use crate::state::WorldMut;

/// Read-only per-call context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldContext {
    /// Batch seed from the manager configuration.
    pub seed: u64,
    /// Tick the batch is advancing to (0 during the initial reset).
    pub tick: TickId,
}

/// Per-world simulation logic driven by a batch manager.
///
/// # Contract
///
/// - Every function MUST be deterministic: identical inputs produce
///   bit-identical outputs, independent of which thread or backend calls it.
/// - `&self`: simulations are stateless; all per-world state lives in
///   [`WorldMut::hidden`] and the observation rows.
/// - [`reset_world`](Self::reset_world) reinitializes hidden state and
///   observations. It MUST NOT touch actions, reward or done; the caller
///   owns those.
/// - [`step_world`](Self::step_world) reads the actions and writes reward
///   and done. Reward and done are zero on entry.
/// - [`observe_world`](Self::observe_world) refreshes the observation rows
///   from hidden state.
///
/// # Examples
///
/// ```
/// use lockbatch_core::{SimError, WorldLayout};
/// use lockbatch_world::{Simulation, WorldContext, WorldMut};
///
/// struct Idle;
///
/// impl Simulation for Idle {
///     fn name(&self) -> &str { "idle" }
///
///     fn layout(&self) -> WorldLayout {
///         WorldLayout {
///             agents_per_world: 1,
///             lidar_samples: 0,
///             room_entities: 0,
///             room_entity_features: 0,
///             hidden_len: 0,
///         }
///     }
///
///     fn reset_world(&self, _: &WorldContext, _: &mut WorldMut<'_>) -> Result<(), SimError> {
///         Ok(())
///     }
///
///     fn step_world(&self, _: &WorldContext, _: &mut WorldMut<'_>) -> Result<(), SimError> {
///         Ok(())
///     }
///
///     fn observe_world(&self, _: &WorldContext, _: &mut WorldMut<'_>) -> Result<(), SimError> {
///         Ok(())
///     }
/// }
///
/// assert_eq!(Idle.layout().agents(), 1);
/// ```
pub trait Simulation: Send + Sync + 'static {
    /// Human-readable name for logs and error reports.
    fn name(&self) -> &str;

    /// Shape constants of one world. Called once at manager construction.
    fn layout(&self) -> WorldLayout;

    /// Start a fresh episode in `world`.
    fn reset_world(&self, ctx: &WorldContext, world: &mut WorldMut<'_>) -> Result<(), SimError>;

    /// Advance `world` by one step using its staged actions.
    fn step_world(&self, ctx: &WorldContext, world: &mut WorldMut<'_>) -> Result<(), SimError>;

    /// Recompute the observation rows of `world`.
    fn observe_world(&self, ctx: &WorldContext, world: &mut WorldMut<'_>)
        -> Result<(), SimError>;
}
