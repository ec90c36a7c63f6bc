//! Fixed-capacity, tick-indexed history store.
//!
//! Slots are addressed by `tick % capacity` and every write overwrites
//! unconditionally. Reads never check staleness: a slot not written within the
//! last `capacity` ticks returns whatever occupied it before (the default value
//! if never written). Callers only read ticks they know were written recently.

use crate::tick::Tick;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Creates a buffer with `capacity` default-initialised slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity.max(1)],
        }
    }

    pub fn put(&mut self, tick: Tick, value: T) {
        let index = self.slot_index(tick);
        self.slots[index] = value;
    }

    pub fn get(&self, tick: Tick) -> &T {
        &self.slots[self.slot_index(tick)]
    }

    /// Direct slot access for callers that already computed a wrapped index.
    pub fn get_slot(&self, index: usize) -> &T {
        &self.slots[index % self.slots.len()]
    }

    pub fn slot_index(&self, tick: Tick) -> usize {
        tick as usize % self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
