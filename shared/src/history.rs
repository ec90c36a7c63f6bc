use crate::protocol::{EntityId, StateSnapshot};
use crate::ring_buffer::RingBuffer;

/// Read access to an authority's per-entity snapshot history.
pub trait SnapshotHistory {
    fn history(&self, entity: EntityId) -> Option<&RingBuffer<StateSnapshot>>;
}
