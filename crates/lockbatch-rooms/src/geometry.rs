//! Planar geometry helpers: headings, bearings and ray casting against
//! axis-aligned walls.
//!
//! Heading 0 faces +y; positive rotation is counter-clockwise, so an agent
//! turning by a positive amount swings toward -x.

use std::f32::consts::{PI, TAU};

/// A 2D point or vector.
pub type Vec2 = (f32, f32);

/// An axis-aligned wall segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Wall {
    /// Segment at constant `y` spanning `x0..=x1`.
    Horizontal {
        /// y coordinate of the wall.
        y: f32,
        /// Left end.
        x0: f32,
        /// Right end.
        x1: f32,
    },
    /// Segment at constant `x` spanning `y0..=y1`.
    Vertical {
        /// x coordinate of the wall.
        x: f32,
        /// Lower end.
        y0: f32,
        /// Upper end.
        y1: f32,
    },
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(theta: f32) -> f32 {
    let mut t = theta.rem_euclid(TAU);
    if t > PI {
        t -= TAU;
    }
    t
}

/// Unit vectors `(forward, right)` for a heading.
pub fn frame(heading: f32) -> (Vec2, Vec2) {
    let (s, c) = heading.sin_cos();
    ((-s, c), (c, s))
}

/// Direction of a ray at `angle` in world coordinates.
pub fn direction(angle: f32) -> Vec2 {
    frame(angle).0
}

/// Distance and bearing of `target` as seen from `pos` facing `heading`.
///
/// The bearing is in `(-π, π]`, zero straight ahead, positive to the left.
pub fn polar(pos: Vec2, heading: f32, target: Vec2) -> (f32, f32) {
    let rel = (target.0 - pos.0, target.1 - pos.1);
    let dist = rel.0.hypot(rel.1);
    if dist == 0.0 {
        return (0.0, 0.0);
    }
    let absolute = (-rel.0).atan2(rel.1);
    (dist, wrap_angle(absolute - heading))
}

/// Distance along a ray from `origin` at `angle` to the first wall hit,
/// capped at `max`.
pub fn cast_ray(origin: Vec2, angle: f32, walls: &[Wall], max: f32) -> f32 {
    let (dx, dy) = direction(angle);
    let mut best = max;
    for wall in walls {
        let t = match *wall {
            Wall::Horizontal { y, x0, x1 } => {
                if dy.abs() < f32::EPSILON {
                    continue;
                }
                let t = (y - origin.1) / dy;
                let x = origin.0 + t * dx;
                if x < x0 || x > x1 {
                    continue;
                }
                t
            }
            Wall::Vertical { x, y0, y1 } => {
                if dx.abs() < f32::EPSILON {
                    continue;
                }
                let t = (x - origin.0) / dx;
                let y = origin.1 + t * dy;
                if y < y0 || y > y1 {
                    continue;
                }
                t
            }
        };
        if t >= 0.0 && t < best {
            best = t;
        }
    }
    best
}
