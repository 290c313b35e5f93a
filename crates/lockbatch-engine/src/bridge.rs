//! Hook for an external renderer or recorder.

use lockbatch_core::id::TickId;
use lockbatch_core::tensor::Placement;
use lockbatch_world::BatchState;

/// Read-only view of the batch handed to a [`RenderBridge`].
#[derive(Clone, Copy, Debug)]
pub struct BatchFrame<'a> {
    /// Tick the batch is at (0 right after construction).
    pub tick: TickId,
    /// The whole batch.
    pub state: &'a BatchState,
    /// Where the batch memory lives.
    pub placement: Placement,
}

/// Receives a frame after construction and after every successful step.
///
/// Runs on the thread calling `step()`, before `step()` returns.
pub trait RenderBridge: Send {
    /// Consume one frame.
    fn on_frame(&mut self, frame: &BatchFrame<'_>);
}
