//! Reference simulation for lockbatch: a multi-room 2D arena.
//!
//! The arena is a strip of rooms stacked along the y axis, separated by
//! walls with one door gap each. Agents start in the first room and are
//! rewarded for pushing the team's furthest progress along y; an episode
//! ends when an agent reaches the far wall of the last room or the step
//! limit is hit.
//!
//! Every world's scene (door positions, room entities, spawn points) is
//! drawn from a ChaCha8 stream seeded by `(seed, world index)`, so a
//! world's fresh episode is always the same scene and both backends see
//! identical inputs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod geometry;
pub mod scene;
pub mod sim;

pub use config::RoomsConfig;
pub use scene::Scene;
pub use sim::RoomsSim;
