//! Staged mutations waiting for the next step.
//!
//! Staging calls never write into the batch directly: the batch may be away
//! on a device launch, and a staged write must become visible to exactly
//! the next step. The manager drains a [`StagingArea`] into the batch at the
//! start of every `step()`.

use lockbatch_core::id::{AgentIdx, WorldIdx};
use lockbatch_core::layout::ACTION_DIMS;
use lockbatch_world::BatchState;

/// Counts of mutations applied by one [`StagingArea::apply`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StagingSummary {
    /// Worlds with a reset flag raised.
    pub resets: u32,
    /// Agent action slots written.
    pub actions: u32,
}

/// Pending reset triggers and actions.
///
/// Indices are trusted: the manager validates them before staging.
#[derive(Clone, Debug)]
pub struct StagingArea {
    agents: usize,
    resets: Vec<bool>,
    actions: Vec<Option<[i32; ACTION_DIMS]>>,
}

impl StagingArea {
    /// Empty staging for `num_worlds` worlds of `agents` agents each.
    pub fn new(num_worlds: usize, agents: usize) -> Self {
        Self {
            agents,
            resets: vec![false; num_worlds],
            actions: vec![None; num_worlds * agents],
        }
    }

    /// Request a reset of `world`. Staging the same world twice is the same
    /// as staging it once.
    pub fn stage_reset(&mut self, world: WorldIdx) {
        self.resets[world.as_usize()] = true;
    }

    /// Stage one agent's action, replacing any earlier one for the slot.
    pub fn stage_action(&mut self, world: WorldIdx, agent: AgentIdx, action: [i32; ACTION_DIMS]) {
        self.actions[world.as_usize() * self.agents + agent.as_usize()] = Some(action);
    }

    /// Stage every agent's action from a flat `[N, A, 3]` block.
    ///
    /// `block` must hold exactly `num_worlds * agents * 3` elements.
    pub fn stage_all(&mut self, block: &[i32]) {
        for (slot, a) in self.actions.iter_mut().zip(block.chunks_exact(ACTION_DIMS)) {
            *slot = Some([a[0], a[1], a[2]]);
        }
    }

    /// Number of worlds with a pending reset.
    pub(crate) fn pending_resets(&self) -> usize {
        self.resets.iter().filter(|&&r| r).count()
    }

    /// Number of action slots with a pending write.
    pub(crate) fn pending_actions(&self) -> usize {
        self.actions.iter().filter(|a| a.is_some()).count()
    }

    /// Whether nothing is staged.
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.pending_resets() == 0 && self.pending_actions() == 0
    }

    /// Write everything staged into `state` and clear the staging area.
    ///
    /// Actions that were not staged keep their previous value.
    pub fn apply(&mut self, state: &mut BatchState) -> StagingSummary {
        let mut summary = StagingSummary::default();
        for (flag, staged) in state.reset_mut().iter_mut().zip(self.resets.iter_mut()) {
            if std::mem::take(staged) {
                *flag = 1;
                summary.resets += 1;
            }
        }
        let rows = state.action_mut().chunks_exact_mut(ACTION_DIMS);
        for (row, staged) in rows.zip(self.actions.iter_mut()) {
            if let Some(action) = staged.take() {
                row.copy_from_slice(&action);
                summary.actions += 1;
            }
        }
        summary
    }
}
