//! Arena configuration.

use lockbatch_core::error::ConfigError;
use lockbatch_core::layout::WorldLayout;

/// Features per observed room entity: distance, bearing, type.
pub const ENTITY_FEATURES: u32 = 3;

/// Number of distinct entity types.
pub const ENTITY_TYPES: u32 = 3;

/// Shape and dynamics of the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomsConfig {
    /// Agents per world. Default: 2.
    pub agents_per_world: u32,
    /// Rooms stacked along y. Default: 3.
    pub num_rooms: u32,
    /// Arena width along x. Default: 20.0.
    pub room_width: f32,
    /// Depth of each room along y. Default: 16.0.
    pub room_length: f32,
    /// Width of the door gap in each interior wall. Default: 4.0.
    pub door_width: f32,
    /// Entities placed in each room. Default: 2.
    pub entities_per_room: u32,
    /// Lidar rays per agent, evenly spread over a full turn. Default: 30.
    pub lidar_samples: u32,
    /// Maximum lidar range; longer hits read as 1.0. Default: 32.0.
    pub lidar_range: f32,
    /// Steps before an episode is cut off. Default: 200.
    pub episode_len: u32,
    /// Distance covered per action bucket per step. Default: 0.5.
    pub move_speed: f32,
    /// Rotation per action bucket per step, in radians. Default: π/16.
    pub turn_speed: f32,
    /// Collision radius of an agent. Default: 0.5.
    pub agent_radius: f32,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            agents_per_world: 2,
            num_rooms: 3,
            room_width: 20.0,
            room_length: 16.0,
            door_width: 4.0,
            entities_per_room: 2,
            lidar_samples: 30,
            lidar_range: 32.0,
            episode_len: 200,
            move_speed: 0.5,
            turn_speed: std::f32::consts::PI / 16.0,
            agent_radius: 0.5,
        }
    }
}

impl RoomsConfig {
    /// Check that the arena can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidLayout { reason });
        if self.agents_per_world == 0 {
            return invalid("agents_per_world must be at least 1".into());
        }
        if self.num_rooms == 0 {
            return invalid("num_rooms must be at least 1".into());
        }
        if self.episode_len == 0 {
            return invalid("episode_len must be at least 1".into());
        }
        for (name, v) in [
            ("room_width", self.room_width),
            ("room_length", self.room_length),
            ("door_width", self.door_width),
            ("lidar_range", self.lidar_range),
            ("move_speed", self.move_speed),
            ("turn_speed", self.turn_speed),
            ("agent_radius", self.agent_radius),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return invalid(format!("{name} must be finite and positive, got {v}"));
            }
        }
        if self.door_width <= 2.0 * self.agent_radius {
            return invalid(format!(
                "door_width {} does not fit an agent of radius {}",
                self.door_width, self.agent_radius
            ));
        }
        if self.room_width < self.door_width + 2.0 {
            return invalid(format!(
                "room_width {} leaves no wall around a door of width {}",
                self.room_width, self.door_width
            ));
        }
        if self.room_length <= 4.0 * self.agent_radius
            || self.room_width <= 2.0 * self.agent_radius * self.agents_per_world as f32
        {
            return invalid("rooms are too small for the agents".into());
        }
        Ok(())
    }

    /// Total room entities in a world; every agent observes all of them.
    pub fn total_entities(&self) -> u32 {
        self.num_rooms.saturating_mul(self.entities_per_room)
    }

    /// Interior walls (one fewer than rooms).
    pub fn num_walls(&self) -> u32 {
        self.num_rooms.saturating_sub(1)
    }

    /// Arena extent along y.
    pub fn arena_length(&self) -> f32 {
        self.room_length * self.num_rooms as f32
    }

    /// Length of the diagonal, used to normalize distances.
    pub fn diagonal(&self) -> f32 {
        self.room_width.hypot(self.arena_length())
    }

    /// The per-world layout this arena exports.
    pub fn layout(&self) -> WorldLayout {
        WorldLayout {
            agents_per_world: self.agents_per_world,
            lidar_samples: self.lidar_samples,
            room_entities: self.total_entities(),
            room_entity_features: ENTITY_FEATURES,
            hidden_len: crate::scene::HiddenLayout::new(self).len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = RoomsConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.total_entities(), 6);
        assert_eq!(cfg.num_walls(), 2);
        assert_eq!(cfg.arena_length(), 48.0);
    }

    #[test]
    fn layout_matches_config() {
        let cfg = RoomsConfig::default();
        let l = cfg.layout();
        assert_eq!(l.agents_per_world, 2);
        assert_eq!(l.lidar_samples, 30);
        assert_eq!(l.room_entities, 6);
        assert_eq!(l.room_entity_features, 3);
        assert!(l.hidden_len > 0);
    }

    #[test]
    fn narrow_door_rejected() {
        let cfg = RoomsConfig {
            door_width: 0.8,
            ..RoomsConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidLayout { .. })));
    }

    #[test]
    fn non_finite_dimension_rejected() {
        let cfg = RoomsConfig {
            room_length: f32::NAN,
            ..RoomsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_rooms_rejected() {
        let cfg = RoomsConfig {
            num_rooms: 0,
            ..RoomsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
