//! Per-step metrics for the batch manager.

/// Timing and outcome counts collected during a single step.
///
/// All durations are in microseconds. The manager populates these after
/// each successful `step()`; read them with `Manager::last_metrics()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Time spent applying staged resets and actions.
    pub stage_us: u64,
    /// Time spent in the backend dispatch.
    pub advance_us: u64,
    /// Staged action slots applied this step.
    pub staged_actions: u32,
    /// Worlds that ran the simulation step (including auto-reset ones).
    pub worlds_stepped: u32,
    /// Worlds that consumed a triggered reset instead of stepping.
    pub triggered_resets: u32,
    /// Worlds reinitialized by auto-reset.
    pub auto_resets: u32,
    /// Frozen terminal worlds (auto-reset off).
    pub terminal_worlds: u32,
    /// Bytes held by the batch buffers.
    pub memory_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.worlds_stepped, 0);
        assert_eq!(m.memory_bytes, 0);
    }
}
