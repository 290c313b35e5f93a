//! The eight exported fields: names, shapes and view construction.
//!
//! Shapes are derived from the batch itself, so they always cover exactly
//! the elements of the underlying buffer.

use lockbatch_core::layout::{ACTION_DIMS, OTHER_AGENT_DIMS, POSITION_DIMS};
use lockbatch_core::tensor::{Placement, Shape, TensorData, TensorView};
use lockbatch_world::BatchState;
use smallvec::smallvec;

/// Export name of the reset flags.
pub const RESET: &str = "reset";
/// Export name of the actions.
pub const ACTION: &str = "action";
/// Export name of the rewards.
pub const REWARD: &str = "reward";
/// Export name of the done flags.
pub const DONE: &str = "done";
/// Export name of the position observation.
pub const POSITION_OBSERVATION: &str = "position_observation";
/// Export name of the inter-agent observation.
pub const TO_OTHER_AGENTS: &str = "to_other_agents";
/// Export name of the room-entity observation.
pub const TO_ROOM_ENTITIES: &str = "to_room_entities";
/// Export name of the lidar samples.
pub const LIDAR: &str = "lidar";

/// Every export, in registry order.
pub const EXPORT_NAMES: [&str; 8] = [
    RESET,
    ACTION,
    REWARD,
    DONE,
    POSITION_OBSERVATION,
    TO_OTHER_AGENTS,
    TO_ROOM_ENTITIES,
    LIDAR,
];

fn batch_dims(state: &BatchState) -> (usize, usize) {
    (state.num_worlds() as usize, state.layout().agents())
}

/// Reset flags, int32 `[N, 1]`.
pub fn reset(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, _) = batch_dims(state);
    TensorView::new(RESET, TensorData::I32(state.reset()), smallvec![n, 1], placement)
}

/// Actions, int32 `[N, A, 3]`.
pub fn action(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, a) = batch_dims(state);
    TensorView::new(
        ACTION,
        TensorData::I32(state.action()),
        smallvec![n, a, ACTION_DIMS],
        placement,
    )
}

/// Rewards, float32 `[N, 1]`.
pub fn reward(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, _) = batch_dims(state);
    TensorView::new(REWARD, TensorData::F32(state.reward()), smallvec![n, 1], placement)
}

/// Done flags, uint8 `[N, 1]`.
pub fn done(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, _) = batch_dims(state);
    TensorView::new(DONE, TensorData::U8(state.done()), smallvec![n, 1], placement)
}

/// Position observation, float32 `[N, A, 3]`.
pub fn position_observation(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, a) = batch_dims(state);
    TensorView::new(
        POSITION_OBSERVATION,
        TensorData::F32(state.position()),
        smallvec![n, a, POSITION_DIMS],
        placement,
    )
}

/// Inter-agent observation, float32 `[N, A, A-1, 2]`.
pub fn to_other_agents(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, a) = batch_dims(state);
    let others = state.layout().other_agents();
    TensorView::new(
        TO_OTHER_AGENTS,
        TensorData::F32(state.other_agents()),
        smallvec![n, a, others, OTHER_AGENT_DIMS],
        placement,
    )
}

/// Room-entity observation, float32 `[N, A, E, F]`.
pub fn to_room_entities(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, a) = batch_dims(state);
    let l = state.layout();
    let shape: Shape = smallvec![
        n,
        a,
        l.room_entities as usize,
        l.room_entity_features as usize
    ];
    TensorView::new(TO_ROOM_ENTITIES, TensorData::F32(state.room_entities()), shape, placement)
}

/// Lidar samples, float32 `[N, A, L]`.
pub fn lidar(state: &BatchState, placement: Placement) -> TensorView<'_> {
    let (n, a) = batch_dims(state);
    let samples = state.layout().lidar_samples as usize;
    TensorView::new(
        LIDAR,
        TensorData::F32(state.lidar()),
        smallvec![n, a, samples],
        placement,
    )
}

/// Build the view of export `name`, or `None` for an unknown name.
pub fn view<'a>(state: &'a BatchState, name: &str, placement: Placement) -> Option<TensorView<'a>> {
    let build: for<'b> fn(&'b BatchState, Placement) -> TensorView<'b> = match name {
        RESET => reset,
        ACTION => action,
        REWARD => reward,
        DONE => done,
        POSITION_OBSERVATION => position_observation,
        TO_OTHER_AGENTS => to_other_agents,
        TO_ROOM_ENTITIES => to_room_entities,
        LIDAR => lidar,
        _ => return None,
    };
    Some(build(state, placement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbatch_core::layout::WorldLayout;
    use lockbatch_core::tensor::ElementType;

    fn state() -> BatchState {
        BatchState::new(
            WorldLayout {
                agents_per_world: 3,
                lidar_samples: 8,
                room_entities: 4,
                room_entity_features: 3,
                hidden_len: 2,
            },
            5,
        )
        .unwrap()
    }

    #[test]
    fn every_export_has_a_view() {
        let s = state();
        for name in EXPORT_NAMES {
            let v = view(&s, name, Placement::Host).unwrap();
            assert_eq!(v.name(), name);
            assert_eq!(v.world_dim(), 5);
            assert_eq!(v.shape().iter().product::<usize>(), v.num_elements());
        }
        assert!(view(&s, "hidden", Placement::Host).is_none());
    }

    #[test]
    fn shapes_and_types() {
        let s = state();
        let get = |name: &str| view(&s, name, Placement::Host).unwrap();
        assert_eq!(get(RESET).shape(), &[5, 1]);
        assert_eq!(get(RESET).element_type(), ElementType::Int32);
        assert_eq!(get(ACTION).shape(), &[5, 3, 3]);
        assert_eq!(get(DONE).element_type(), ElementType::UInt8);
        assert_eq!(get(TO_OTHER_AGENTS).shape(), &[5, 3, 2, 2]);
        assert_eq!(get(TO_ROOM_ENTITIES).shape(), &[5, 3, 4, 3]);
        assert_eq!(get(LIDAR).shape(), &[5, 3, 8]);
    }

    #[test]
    fn empty_bundle_views_are_empty() {
        let s = BatchState::empty();
        for name in EXPORT_NAMES {
            let v = view(&s, name, Placement::Device { ordinal: 0 }).unwrap();
            assert_eq!(v.num_elements(), 0);
            assert_eq!(v.world_dim(), 0);
        }
    }
}
