//! Per-line debouncing of quantity updates.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::ids::LineItemId;

#[derive(Debug, Default)]
struct Generations {
    next: u64,
    latest: FxHashMap<LineItemId, u64>,
}

/// Hands out a generation per request; only the newest one for a line may write.
///
/// Generations come from one counter shared by all lines, so a line's entry can
/// be dropped at any time without an older request ever matching a newer one.
#[derive(Debug, Default)]
pub(crate) struct Debouncer {
    generations: Mutex<Generations>,
}

impl Debouncer {
    /// Register a new request for `item_id`, superseding any earlier one.
    pub(crate) fn begin(&self, item_id: LineItemId) -> u64 {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        generations.next = generations.next.wrapping_add(1);

        let generation = generations.next;

        generations.latest.insert(item_id, generation);

        generation
    }

    /// Whether `generation` is still the newest request for `item_id`.
    pub(crate) fn is_current(&self, item_id: LineItemId, generation: u64) -> bool {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .get(&item_id)
            == Some(&generation)
    }

    /// Forget `item_id` once its newest request is done.
    pub(crate) fn finish(&self, item_id: LineItemId, generation: u64) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if generations.latest.get(&item_id) == Some(&generation) {
            generations.latest.remove(&item_id);
        }
    }

    /// Forget every line; pending requests become superseded.
    pub(crate) fn reset(&self) {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clear();
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .len()
    }
}
