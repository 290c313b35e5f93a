//! [`RoomsSim`]: the arena's per-world step, reset and observation.

use std::f32::consts::{PI, TAU};

use lockbatch_core::error::{ConfigError, SimError};
use lockbatch_core::layout::{WorldLayout, OTHER_AGENT_DIMS, POSITION_DIMS};
use lockbatch_world::{Simulation, WorldContext, WorldMut};
use smallvec::SmallVec;

use crate::config::{RoomsConfig, ENTITY_FEATURES};
use crate::geometry::{cast_ray, frame, polar, wrap_angle, Vec2};
use crate::scene::{walls, HiddenLayout, Pose, Scene};

/// Action buckets are saturated to `[-MAX_ACTION, MAX_ACTION]`.
pub const MAX_ACTION: i32 = 2;

type Poses = SmallVec<[Pose; 8]>;

/// Multi-room arena simulation.
///
/// Actions are `(x, y, rotation)` integer buckets: `x` strafes right, `y`
/// moves forward, `rotation` turns counter-clockwise, each scaled by the
/// configured speed per bucket.
///
/// Observations, per agent:
/// - position: `(x / width, y / length, heading / π)`,
/// - other agents, in index order skipping self: `(distance / diagonal,
///   bearing / π)`,
/// - room entities: `(distance / diagonal, bearing / π, type)`,
/// - lidar: hit distance / range for evenly spaced rays starting at the
///   agent's heading.
#[derive(Clone, Debug)]
pub struct RoomsSim {
    cfg: RoomsConfig,
    hidden: HiddenLayout,
}

impl RoomsSim {
    /// Build the simulation after validating `cfg`.
    pub fn new(cfg: RoomsConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let hidden = HiddenLayout::new(&cfg);
        Ok(Self { cfg, hidden })
    }

    /// The arena configuration.
    pub fn config(&self) -> &RoomsConfig {
        &self.cfg
    }

    /// Offsets into each world's hidden row.
    pub fn hidden_layout(&self) -> &HiddenLayout {
        &self.hidden
    }

    fn check_row(&self, world: &WorldMut<'_>) -> Result<(), SimError> {
        if world.hidden.len() != self.hidden.len() || world.layout != self.layout() {
            return Err(SimError::InvalidState {
                reason: format!(
                    "world {} rows do not match the arena layout (hidden {} vs {})",
                    world.index,
                    world.hidden.len(),
                    self.hidden.len()
                ),
            });
        }
        Ok(())
    }

    fn poses(&self, hidden: &[f32]) -> Poses {
        (0..self.cfg.agents_per_world as usize)
            .map(|a| {
                let s = &hidden[self.hidden.agent(a)];
                Pose {
                    pos: (s[0], s[1]),
                    heading: s[2],
                }
            })
            .collect()
    }

    /// Move from `pos` by `delta`, stopping at the boundary and at walls
    /// outside their door gap.
    fn collide(&self, doors: &[f32], pos: Vec2, delta: Vec2) -> Vec2 {
        let r = self.cfg.agent_radius;
        let x = (pos.0 + delta.0).clamp(r, self.cfg.room_width - r);
        let mut y = (pos.1 + delta.1).clamp(r, self.cfg.arena_length() - r);
        let clearance = self.cfg.door_width / 2.0 - r;
        for (k, &door) in doors.iter().enumerate() {
            let wall_y = (k + 1) as f32 * self.cfg.room_length;
            if (x - door).abs() <= clearance {
                continue;
            }
            if pos.1 < wall_y && y > wall_y - r {
                y = wall_y - r;
            } else if pos.1 >= wall_y && y < wall_y + r {
                y = wall_y + r;
            }
        }
        (x, y)
    }
}

impl Default for RoomsSim {
    fn default() -> Self {
        let cfg = RoomsConfig::default();
        let hidden = HiddenLayout::new(&cfg);
        Self { cfg, hidden }
    }
}

impl Simulation for RoomsSim {
    fn name(&self) -> &str {
        "rooms"
    }

    fn layout(&self) -> WorldLayout {
        self.cfg.layout()
    }

    fn reset_world(&self, ctx: &WorldContext, world: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.check_row(world)?;
        Scene::generate(&self.cfg, ctx.seed, world.index).write(&self.hidden, world.hidden);
        Ok(())
    }

    fn step_world(&self, _ctx: &WorldContext, world: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.check_row(world)?;
        let doors: SmallVec<[f32; 8]> = SmallVec::from_slice(&world.hidden[self.hidden.doors.clone()]);
        let poses = self.poses(world.hidden);
        let speed = self.cfg.move_speed;

        let mut best = f32::NEG_INFINITY;
        for (a, pose) in poses.iter().enumerate() {
            let [ax, ay, ar] = world.action(a).map(|v| v.clamp(-MAX_ACTION, MAX_ACTION) as f32);
            let heading = wrap_angle(pose.heading + ar * self.cfg.turn_speed);
            let (fwd, right) = frame(heading);
            let delta = (
                speed * (ax * right.0 + ay * fwd.0),
                speed * (ax * right.1 + ay * fwd.1),
            );
            let (x, y) = self.collide(&doors, pose.pos, delta);
            if !(x.is_finite() && y.is_finite() && heading.is_finite()) {
                return Err(SimError::InvalidState {
                    reason: format!("world {} agent {a} left the arena", world.index),
                });
            }
            world.hidden[self.hidden.agent(a)].copy_from_slice(&[x, y, heading]);
            best = best.max(y);
        }

        let step = world.hidden[HiddenLayout::STEP] + 1.0;
        let progress = world.hidden[HiddenLayout::PROGRESS];
        world.hidden[HiddenLayout::STEP] = step;
        world.hidden[HiddenLayout::PROGRESS] = progress.max(best);
        *world.reward = (best - progress).max(0.0) / self.cfg.room_length;

        let goal = self.cfg.arena_length() - 2.0 * self.cfg.agent_radius;
        if step >= self.cfg.episode_len as f32 || best >= goal {
            *world.done = 1;
        }
        Ok(())
    }

    fn observe_world(&self, _ctx: &WorldContext, world: &mut WorldMut<'_>) -> Result<(), SimError> {
        self.check_row(world)?;
        let cfg = &self.cfg;
        let poses = self.poses(world.hidden);
        let set = walls(cfg, &world.hidden[self.hidden.doors.clone()]);
        let diag = cfg.diagonal();
        let n_agents = poses.len();
        let n_entities = cfg.total_entities() as usize;
        let n_lidar = cfg.lidar_samples as usize;
        let feat = ENTITY_FEATURES as usize;

        for (a, me) in poses.iter().enumerate() {
            let p = &mut world.position[a * POSITION_DIMS..(a + 1) * POSITION_DIMS];
            p.copy_from_slice(&[
                me.pos.0 / cfg.room_width,
                me.pos.1 / cfg.arena_length(),
                me.heading / PI,
            ]);

            let others = poses.iter().enumerate().filter(|&(b, _)| b != a);
            for (j, (_, other)) in others.enumerate() {
                let (dist, bearing) = polar(me.pos, me.heading, other.pos);
                let o = (a * (n_agents - 1) + j) * OTHER_AGENT_DIMS;
                world.other_agents[o..o + OTHER_AGENT_DIMS].copy_from_slice(&[dist / diag, bearing / PI]);
            }

            for e in 0..n_entities {
                let s = &world.hidden[self.hidden.entity(e)];
                let (target, kind) = ((s[0], s[1]), s[2]);
                let (dist, bearing) = polar(me.pos, me.heading, target);
                let o = (a * n_entities + e) * feat;
                world.room_entities[o..o + feat].copy_from_slice(&[dist / diag, bearing / PI, kind]);
            }

            for i in 0..n_lidar {
                let angle = me.heading + TAU * i as f32 / n_lidar as f32;
                let hit = cast_ray(me.pos, angle, &set, cfg.lidar_range);
                world.lidar[a * n_lidar + i] = hit / cfg.lidar_range;
            }
        }
        Ok(())
    }
}
