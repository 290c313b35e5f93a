//! Strongly-typed indices for worlds, agents and ticks.

use std::fmt;

/// Index of a world within a batch.
///
/// `WorldIdx(n)` addresses row `n` of every batched field. The mapping is
/// fixed for the lifetime of a manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldIdx(pub u32);

impl WorldIdx {
    /// The index as a `usize` row offset.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorldIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorldIdx {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Index of an agent within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentIdx(pub u32);

impl AgentIdx {
    /// The index as a `usize` offset within a world row.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentIdx {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter.
///
/// Zero after construction; incremented once per successful `step()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
