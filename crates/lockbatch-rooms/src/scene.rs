//! Per-world scene generation and the hidden-state layout.
//!
//! A world's hidden row stores everything the arena needs between steps:
//!
//! | slots | content |
//! |-------|---------|
//! | 0 | step counter |
//! | 1 | furthest y reached this episode |
//! | `doors` | x centre of each interior wall's door |
//! | `entities` | `(x, y, type)` per room entity |
//! | `agents` | `(x, y, heading)` per agent |

use std::ops::Range;

use lockbatch_core::id::WorldIdx;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use crate::config::{RoomsConfig, ENTITY_TYPES};
use crate::geometry::{Vec2, Wall};

/// Walls of a typical arena fit without spilling.
pub type WallSet = SmallVec<[Wall; 12]>;

/// Offsets into a world's hidden row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HiddenLayout {
    /// Interior-wall door centres.
    pub doors: Range<usize>,
    /// Room entities, 3 slots each.
    pub entities: Range<usize>,
    /// Agents, 3 slots each.
    pub agents: Range<usize>,
}

impl HiddenLayout {
    /// Slot of the step counter.
    pub const STEP: usize = 0;
    /// Slot of the episode's furthest progress.
    pub const PROGRESS: usize = 1;

    /// Compute the offsets for `cfg`.
    pub fn new(cfg: &RoomsConfig) -> Self {
        let doors = 2..2 + cfg.num_walls() as usize;
        let entities = doors.end..doors.end + 3 * cfg.total_entities() as usize;
        let agents = entities.end..entities.end + 3 * cfg.agents_per_world as usize;
        Self {
            doors,
            entities,
            agents,
        }
    }

    /// Total hidden slots.
    pub fn len(&self) -> usize {
        self.agents.end
    }

    /// Always false: the counters are always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Slots of agent `a`.
    pub fn agent(&self, a: usize) -> Range<usize> {
        let start = self.agents.start + 3 * a;
        start..start + 3
    }

    /// Slots of entity `e`.
    pub fn entity(&self, e: usize) -> Range<usize> {
        let start = self.entities.start + 3 * e;
        start..start + 3
    }
}

/// An object placed in a room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    /// Position.
    pub pos: Vec2,
    /// Type tag in `0..ENTITY_TYPES`.
    pub kind: u32,
}

/// An agent's pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Position.
    pub pos: Vec2,
    /// Heading in radians, 0 facing +y.
    pub heading: f32,
}

/// The initial state of one world's episode.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Door centre per interior wall, lowest wall first.
    pub doors: Vec<f32>,
    /// Room entities, room by room.
    pub entities: Vec<Entity>,
    /// Agent spawn poses.
    pub agents: Vec<Pose>,
}

/// Per-world RNG seed derived from the batch seed.
pub fn world_seed(seed: u64, world: WorldIdx) -> u64 {
    seed ^ (u64::from(world.0) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Scene {
    /// Draw the scene of `world`. The same `(seed, world)` always gives the
    /// same scene.
    pub fn generate(cfg: &RoomsConfig, seed: u64, world: WorldIdx) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(world_seed(seed, world));
        let w = cfg.room_width;
        let l = cfg.room_length;
        let r = cfg.agent_radius;

        let half_door = cfg.door_width / 2.0;
        let doors = (0..cfg.num_walls())
            .map(|_| rng.random_range(half_door + 1.0..=w - half_door - 1.0))
            .collect();

        let mut entities = Vec::with_capacity(cfg.total_entities() as usize);
        for room in 0..cfg.num_rooms {
            let y0 = room as f32 * l;
            for _ in 0..cfg.entities_per_room {
                let x = rng.random_range(r..=w - r);
                let y = rng.random_range(y0 + r..=y0 + l - r);
                let kind = rng.random_range(0..ENTITY_TYPES);
                entities.push(Entity { pos: (x, y), kind });
            }
        }

        let spacing = w / (cfg.agents_per_world + 1) as f32;
        let agents = (0..cfg.agents_per_world)
            .map(|a| {
                let jitter = rng.random_range(-0.25f32..=0.25) * r;
                // Wide agents in a narrow room would spawn inside a wall.
                let x = (spacing * (a + 1) as f32 + jitter).clamp(r, w - r);
                let y = r + rng.random_range(0.0..=r);
                Pose {
                    pos: (x, y),
                    heading: 0.0,
                }
            })
            .collect();

        Self {
            doors,
            entities,
            agents,
        }
    }

    /// Write the scene into a hidden row as a fresh episode.
    pub fn write(&self, layout: &HiddenLayout, hidden: &mut [f32]) {
        hidden[HiddenLayout::STEP] = 0.0;
        hidden[HiddenLayout::PROGRESS] = self
            .agents
            .iter()
            .map(|p| p.pos.1)
            .fold(f32::NEG_INFINITY, f32::max);
        hidden[layout.doors.clone()].copy_from_slice(&self.doors);
        for (e, ent) in self.entities.iter().enumerate() {
            hidden[layout.entity(e)].copy_from_slice(&[ent.pos.0, ent.pos.1, ent.kind as f32]);
        }
        for (a, pose) in self.agents.iter().enumerate() {
            hidden[layout.agent(a)].copy_from_slice(&[pose.pos.0, pose.pos.1, pose.heading]);
        }
    }
}

/// Arena boundary plus the interior walls, split around their doors.
pub fn walls(cfg: &RoomsConfig, doors: &[f32]) -> WallSet {
    let w = cfg.room_width;
    let h = cfg.arena_length();
    let half_door = cfg.door_width / 2.0;
    let mut set = WallSet::new();
    set.push(Wall::Horizontal {
        y: 0.0,
        x0: 0.0,
        x1: w,
    });
    set.push(Wall::Horizontal { y: h, x0: 0.0, x1: w });
    set.push(Wall::Vertical {
        x: 0.0,
        y0: 0.0,
        y1: h,
    });
    set.push(Wall::Vertical { x: w, y0: 0.0, y1: h });
    for (k, &door) in doors.iter().enumerate() {
        let y = (k + 1) as f32 * cfg.room_length;
        set.push(Wall::Horizontal {
            y,
            x0: 0.0,
            x1: door - half_door,
        });
        set.push(Wall::Horizontal {
            y,
            x0: door + half_door,
            x1: w,
        });
    }
    set
}
