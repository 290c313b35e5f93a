//! Per-world field layout.
//!
//! The number of agents, lidar samples and room entities per world are
//! properties of the simulation, not of the manager. A simulation reports
//! them once through [`WorldLayout`]; every batched field's shape is derived
//! from it and stays fixed for the manager's lifetime.

use crate::error::ConfigError;

/// Components per agent action: x, y, rotation.
pub const ACTION_DIMS: usize = 3;
/// Components per agent position observation: x, y, heading.
pub const POSITION_DIMS: usize = 3;
/// Components per inter-agent observation: distance, bearing.
pub const OTHER_AGENT_DIMS: usize = 2;

/// Shape constants of one world, as supplied by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldLayout {
    /// Agents per world. Must be at least 1.
    pub agents_per_world: u32,
    /// Lidar samples per agent.
    pub lidar_samples: u32,
    /// Room entities observed per agent.
    pub room_entities: u32,
    /// Features per observed room entity.
    pub room_entity_features: u32,
    /// Length of the simulation-private per-world state, in f32 slots.
    pub hidden_len: u32,
}

impl WorldLayout {
    /// Agents per world as `usize`.
    pub fn agents(&self) -> usize {
        self.agents_per_world as usize
    }

    /// Other agents each agent observes (`agents_per_world - 1`).
    pub fn other_agents(&self) -> usize {
        self.agents().saturating_sub(1)
    }

    /// i32 elements of one world's action row.
    pub fn action_len(&self) -> usize {
        self.agents() * ACTION_DIMS
    }

    /// f32 elements of one world's position observation row.
    pub fn position_len(&self) -> usize {
        self.agents() * POSITION_DIMS
    }

    /// f32 elements of one world's inter-agent observation row.
    pub fn other_agents_len(&self) -> usize {
        self.agents() * self.other_agents() * OTHER_AGENT_DIMS
    }

    /// f32 elements of one world's room-entity observation row.
    pub fn room_entities_len(&self) -> usize {
        self.agents() * self.room_entities as usize * self.room_entity_features as usize
    }

    /// f32 elements of one world's lidar row.
    pub fn lidar_len(&self) -> usize {
        self.agents() * self.lidar_samples as usize
    }

    /// f32 elements of one world's hidden state.
    pub fn hidden_len(&self) -> usize {
        self.hidden_len as usize
    }

    /// Check that the layout is usable for a batch of `num_worlds`.
    ///
    /// Rejects layouts without agents and any layout whose batched buffers
    /// would overflow `usize` or `isize::MAX` bytes.
    pub fn validate(&self, num_worlds: u32) -> Result<(), ConfigError> {
        if self.agents_per_world == 0 {
            return Err(ConfigError::InvalidLayout {
                reason: "agents_per_world must be at least 1".into(),
            });
        }
        let n = num_worlds as usize;
        let a = self.agents();
        let rows = [
            ("action", a.checked_mul(ACTION_DIMS)),
            ("position", a.checked_mul(POSITION_DIMS)),
            (
                "to_other_agents",
                a.checked_mul(self.other_agents())
                    .and_then(|v| v.checked_mul(OTHER_AGENT_DIMS)),
            ),
            (
                "to_room_entities",
                a.checked_mul(self.room_entities as usize)
                    .and_then(|v| v.checked_mul(self.room_entity_features as usize)),
            ),
            ("lidar", a.checked_mul(self.lidar_samples as usize)),
            ("hidden", Some(self.hidden_len())),
        ];
        for (name, per_world) in rows {
            let bytes = per_world
                .and_then(|v| v.checked_mul(n))
                .and_then(|v| v.checked_mul(4));
            match bytes {
                Some(b) if b <= isize::MAX as usize => {}
                _ => {
                    return Err(ConfigError::InvalidLayout {
                        reason: format!("{name} buffer size overflows for {num_worlds} worlds"),
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> WorldLayout {
        WorldLayout {
            agents_per_world: 2,
            lidar_samples: 30,
            room_entities: 4,
            room_entity_features: 3,
            hidden_len: 16,
        }
    }

    #[test]
    fn row_lengths() {
        let l = layout();
        assert_eq!(l.action_len(), 6);
        assert_eq!(l.position_len(), 6);
        assert_eq!(l.other_agents_len(), 4);
        assert_eq!(l.room_entities_len(), 24);
        assert_eq!(l.lidar_len(), 60);
        assert_eq!(l.hidden_len(), 16);
    }

    #[test]
    fn single_agent_has_empty_inter_agent_row() {
        let l = WorldLayout {
            agents_per_world: 1,
            ..layout()
        };
        assert_eq!(l.other_agents(), 0);
        assert_eq!(l.other_agents_len(), 0);
        assert!(l.validate(4).is_ok());
    }

    #[test]
    fn zero_agents_rejected() {
        let l = WorldLayout {
            agents_per_world: 0,
            ..layout()
        };
        assert!(matches!(l.validate(1), Err(ConfigError::InvalidLayout { .. })));
    }

    #[test]
    fn overflowing_layout_rejected() {
        let l = WorldLayout {
            agents_per_world: u32::MAX,
            lidar_samples: u32::MAX,
            ..layout()
        };
        assert!(matches!(
            l.validate(u32::MAX),
            Err(ConfigError::InvalidLayout { .. })
        ));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn small_layouts_validate_with_product_row_widths(
            agents in 1u32..64,
            lidar in 0u32..256,
            entities in 0u32..32,
            features in 0u32..8,
            hidden in 0u32..512,
            num_worlds in 1u32..4096,
        ) {
            let l = WorldLayout {
                agents_per_world: agents,
                lidar_samples: lidar,
                room_entities: entities,
                room_entity_features: features,
                hidden_len: hidden,
            };
            prop_assert!(l.validate(num_worlds).is_ok());
            let a = agents as usize;
            prop_assert_eq!(l.action_len(), a * ACTION_DIMS);
            prop_assert_eq!(l.position_len(), a * POSITION_DIMS);
            prop_assert_eq!(l.other_agents_len(), a * (a - 1) * OTHER_AGENT_DIMS);
            prop_assert_eq!(l.room_entities_len(), a * (entities * features) as usize);
            prop_assert_eq!(l.lidar_len(), a * lidar as usize);
        }

        #[test]
        fn agentless_layouts_never_validate(
            lidar in any::<u32>(),
            hidden in any::<u32>(),
            num_worlds in 1u32..=u32::MAX,
        ) {
            let l = WorldLayout {
                agents_per_world: 0,
                lidar_samples: lidar,
                room_entities: 0,
                room_entity_features: 0,
                hidden_len: hidden,
            };
            prop_assert!(l.validate(num_worlds).is_err());
        }
    }
}
