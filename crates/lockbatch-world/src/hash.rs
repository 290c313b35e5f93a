//! Hashing utilities for state comparison.
//!
//! Uses FNV-1a for fast, deterministic hashing of batched state. These
//! hashes are not cryptographically secure; they exist so that two runs
//! (or two backends) can be compared step by step without copying buffers.

use lockbatch_core::id::WorldIdx;

use crate::state::BatchState;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

fn fold_f32(mut hash: u64, tag: u32, data: &[f32]) -> u64 {
    hash = fnv1a_u32(hash, tag);
    for &v in data {
        hash = fnv1a_u32(hash, v.to_bits());
    }
    hash
}

fn fold_i32(mut hash: u64, tag: u32, data: &[i32]) -> u64 {
    hash = fnv1a_u32(hash, tag);
    for &v in data {
        hash = fnv1a_u32(hash, v as u32);
    }
    hash
}

fn fold_u8(mut hash: u64, tag: u32, data: &[u8]) -> u64 {
    hash = fnv1a_u32(hash, tag);
    for &b in data {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash every batched field, including hidden state.
///
/// Floats are hashed by bit pattern, so `-0.0` and `0.0` differ and NaNs
/// with different payloads differ. A field tag is folded in at each field
/// boundary so that field order matters.
pub fn batch_hash(state: &BatchState) -> u64 {
    let mut hash = FNV_OFFSET;
    hash = fnv1a_u32(hash, state.num_worlds());
    hash = fold_i32(hash, 0, state.reset());
    hash = fold_i32(hash, 1, state.action());
    hash = fold_f32(hash, 2, state.reward());
    hash = fold_u8(hash, 3, state.done());
    hash = fold_f32(hash, 4, state.position());
    hash = fold_f32(hash, 5, state.other_agents());
    hash = fold_f32(hash, 6, state.room_entities());
    hash = fold_f32(hash, 7, state.lidar());
    fold_f32(hash, 8, state.hidden())
}

/// Hash the fields of a single world, or `None` if `index` is out of range.
pub fn world_hash(state: &BatchState, index: WorldIdx) -> Option<u64> {
    let w = state.world(index)?;
    let mut hash = FNV_OFFSET;
    hash = fnv1a_u32(hash, index.0);
    hash = fold_i32(hash, 0, &[w.reset]);
    hash = fold_i32(hash, 1, w.actions);
    hash = fold_f32(hash, 2, &[w.reward]);
    hash = fold_u8(hash, 3, &[w.done]);
    hash = fold_f32(hash, 4, w.position);
    hash = fold_f32(hash, 5, w.other_agents);
    hash = fold_f32(hash, 6, w.room_entities);
    hash = fold_f32(hash, 7, w.lidar);
    Some(fold_f32(hash, 8, w.hidden))
}
