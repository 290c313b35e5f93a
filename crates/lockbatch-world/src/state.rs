//! The batched world state bundle.
//!
//! [`BatchState`] stores one `Vec` per field, each holding the rows of all
//! worlds back to back (world-major). Buffers are sized once in
//! [`BatchState::new`] and never resized afterwards, so their addresses are
//! stable for the lifetime of the bundle; this is what lets a manager hand
//! out zero-copy tensor views.
//!
//! Backends work on per-world [`WorldMut`] rows obtained from
//! [`BatchState::worlds_mut`]. The rows borrow disjoint regions of every
//! buffer, so they can be distributed across threads without locking.

use lockbatch_core::error::ConfigError;
use lockbatch_core::id::WorldIdx;
use lockbatch_core::layout::{WorldLayout, ACTION_DIMS};

/// Every batched field of every world.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchState {
    layout: WorldLayout,
    num_worlds: u32,
    reset: Vec<i32>,
    action: Vec<i32>,
    reward: Vec<f32>,
    done: Vec<u8>,
    position: Vec<f32>,
    other_agents: Vec<f32>,
    room_entities: Vec<f32>,
    lidar: Vec<f32>,
    hidden: Vec<f32>,
}

impl BatchState {
    /// Allocate zeroed buffers for `num_worlds` worlds of `layout`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroWorlds`] for an empty batch and
    /// [`ConfigError::InvalidLayout`] if the layout is unusable or its
    /// buffers would overflow.
    pub fn new(layout: WorldLayout, num_worlds: u32) -> Result<Self, ConfigError> {
        if num_worlds == 0 {
            return Err(ConfigError::ZeroWorlds);
        }
        layout.validate(num_worlds)?;
        let n = num_worlds as usize;
        Ok(Self {
            layout,
            num_worlds,
            reset: vec![0; n],
            action: vec![0; n * layout.action_len()],
            reward: vec![0.0; n],
            done: vec![0; n],
            position: vec![0.0; n * layout.position_len()],
            other_agents: vec![0.0; n * layout.other_agents_len()],
            room_entities: vec![0.0; n * layout.room_entities_len()],
            lidar: vec![0.0; n * layout.lidar_len()],
            hidden: vec![0.0; n * layout.hidden_len()],
        })
    }

    /// A bundle with no worlds and no allocations.
    ///
    /// Used as a stand-in while the real bundle is away on a device launch.
    pub fn empty() -> Self {
        Self {
            layout: WorldLayout {
                agents_per_world: 0,
                lidar_samples: 0,
                room_entities: 0,
                room_entity_features: 0,
                hidden_len: 0,
            },
            num_worlds: 0,
            reset: Vec::new(),
            action: Vec::new(),
            reward: Vec::new(),
            done: Vec::new(),
            position: Vec::new(),
            other_agents: Vec::new(),
            room_entities: Vec::new(),
            lidar: Vec::new(),
            hidden: Vec::new(),
        }
    }

    /// Number of worlds.
    pub fn num_worlds(&self) -> u32 {
        self.num_worlds
    }

    /// Per-world layout.
    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Reset flags, `[N]`.
    pub fn reset(&self) -> &[i32] {
        &self.reset
    }

    /// Mutable reset flags, for applying staged triggers.
    pub fn reset_mut(&mut self) -> &mut [i32] {
        &mut self.reset
    }

    /// Actions, `[N, A, 3]`.
    pub fn action(&self) -> &[i32] {
        &self.action
    }

    /// Mutable actions, for applying staged actions.
    pub fn action_mut(&mut self) -> &mut [i32] {
        &mut self.action
    }

    /// Rewards, `[N]`.
    pub fn reward(&self) -> &[f32] {
        &self.reward
    }

    /// Done flags, `[N]`.
    pub fn done(&self) -> &[u8] {
        &self.done
    }

    /// Position observations, `[N, A, 3]`.
    pub fn position(&self) -> &[f32] {
        &self.position
    }

    /// Inter-agent observations, `[N, A, A-1, 2]`.
    pub fn other_agents(&self) -> &[f32] {
        &self.other_agents
    }

    /// Room-entity observations, `[N, A, E, F]`.
    pub fn room_entities(&self) -> &[f32] {
        &self.room_entities
    }

    /// Lidar samples, `[N, A, L]`.
    pub fn lidar(&self) -> &[f32] {
        &self.lidar
    }

    /// Simulation-private state, `[N, H]`.
    pub fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    /// Total bytes held by all buffers.
    pub fn memory_bytes(&self) -> usize {
        (self.reset.len() + self.action.len()) * std::mem::size_of::<i32>()
            + self.done.len()
            + (self.reward.len()
                + self.position.len()
                + self.other_agents.len()
                + self.room_entities.len()
                + self.lidar.len()
                + self.hidden.len())
                * std::mem::size_of::<f32>()
    }

    /// Split the bundle into one mutable row set per world, in index order.
    pub fn worlds_mut(&mut self) -> Vec<WorldMut<'_>> {
        let n = self.num_worlds as usize;
        let layout = self.layout;

        let rows = self
            .reset
            .iter_mut()
            .zip(rows_mut(&mut self.action, layout.action_len(), n))
            .zip(self.reward.iter_mut())
            .zip(self.done.iter_mut())
            .zip(rows_mut(&mut self.position, layout.position_len(), n))
            .zip(rows_mut(&mut self.other_agents, layout.other_agents_len(), n))
            .zip(rows_mut(&mut self.room_entities, layout.room_entities_len(), n))
            .zip(rows_mut(&mut self.lidar, layout.lidar_len(), n))
            .zip(rows_mut(&mut self.hidden, layout.hidden_len(), n));

        rows.enumerate()
            .map(
                |(i, ((((((((reset, actions), reward), done), position), other), rooms), lidar), hidden))| {
                    WorldMut {
                        index: WorldIdx(i as u32),
                        layout,
                        reset,
                        actions,
                        reward,
                        done,
                        position,
                        other_agents: other,
                        room_entities: rooms,
                        lidar,
                        hidden,
                    }
                },
            )
            .collect()
    }

    /// Read-only rows of one world, or `None` if out of range.
    pub fn world(&self, index: WorldIdx) -> Option<WorldRef<'_>> {
        let i = index.as_usize();
        if i >= self.num_worlds as usize {
            return None;
        }
        let l = &self.layout;
        Some(WorldRef {
            index,
            layout: *l,
            reset: self.reset[i],
            actions: row(&self.action, l.action_len(), i),
            reward: self.reward[i],
            done: self.done[i],
            position: row(&self.position, l.position_len(), i),
            other_agents: row(&self.other_agents, l.other_agents_len(), i),
            room_entities: row(&self.room_entities, l.room_entities_len(), i),
            lidar: row(&self.lidar, l.lidar_len(), i),
            hidden: row(&self.hidden, l.hidden_len(), i),
        })
    }
}

/// Split `buf` into `rows` consecutive slices of `width` elements.
///
/// A zero width yields `rows` empty slices (e.g. the inter-agent row of a
/// single-agent world).
fn rows_mut<T>(buf: &mut [T], width: usize, rows: usize) -> Vec<&mut [T]> {
    if width == 0 {
        return (0..rows).map(|_| <&mut [T]>::default()).collect();
    }
    buf.chunks_exact_mut(width).collect()
}

fn row<T>(buf: &[T], width: usize, i: usize) -> &[T] {
    &buf[i * width..(i + 1) * width]
}

/// Mutable rows of one world.
///
/// Handed to [`Simulation`](crate::Simulation) functions. Action, reward and
/// done belong to the driver; a simulation reads actions and writes reward
/// and done only from `step_world`.
#[derive(Debug)]
pub struct WorldMut<'a> {
    /// Which world these rows belong to.
    pub index: WorldIdx,
    /// Shape constants of the rows.
    pub layout: WorldLayout,
    /// Reset flag (non-zero = reset requested).
    pub reset: &'a mut i32,
    /// Actions, `[A, 3]`.
    pub actions: &'a mut [i32],
    /// Reward for the last step.
    pub reward: &'a mut f32,
    /// Done flag (0 or 1).
    pub done: &'a mut u8,
    /// Position observation, `[A, 3]`.
    pub position: &'a mut [f32],
    /// Inter-agent observation, `[A, A-1, 2]`.
    pub other_agents: &'a mut [f32],
    /// Room-entity observation, `[A, E, F]`.
    pub room_entities: &'a mut [f32],
    /// Lidar, `[A, L]`.
    pub lidar: &'a mut [f32],
    /// Simulation-private state, `[H]`.
    pub hidden: &'a mut [f32],
}

impl WorldMut<'_> {
    /// The `(x, y, rotation)` action of `agent`.
    ///
    /// Panics if `agent` is out of range.
    pub fn action(&self, agent: usize) -> [i32; 3] {
        let a = &self.actions[agent * ACTION_DIMS..(agent + 1) * ACTION_DIMS];
        [a[0], a[1], a[2]]
    }

    /// Whether the done flag is set.
    pub fn is_done(&self) -> bool {
        *self.done != 0
    }
}

/// Read-only rows of one world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRef<'a> {
    /// Which world these rows belong to.
    pub index: WorldIdx,
    /// Shape constants of the rows.
    pub layout: WorldLayout,
    /// Reset flag.
    pub reset: i32,
    /// Actions, `[A, 3]`.
    pub actions: &'a [i32],
    /// Reward for the last step.
    pub reward: f32,
    /// Done flag.
    pub done: u8,
    /// Position observation, `[A, 3]`.
    pub position: &'a [f32],
    /// Inter-agent observation, `[A, A-1, 2]`.
    pub other_agents: &'a [f32],
    /// Room-entity observation, `[A, E, F]`.
    pub room_entities: &'a [f32],
    /// Lidar, `[A, L]`.
    pub lidar: &'a [f32],
    /// Simulation-private state, `[H]`.
    pub hidden: &'a [f32],
}
