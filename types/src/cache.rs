use core::num::NonZeroU64;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::{nonstandard::RelativeEpoch, phase0::primitives::ValidatorIndex};

/// Caches stored inside a `BeaconState`.
///
/// The fields are rotated rather than cleared on epoch boundaries because the
/// active validator sets of adjacent epochs overlap almost entirely.
#[derive(Clone, Default, Debug)]
pub struct Cache {
    pub proposer_index: OnceCell<ValidatorIndex>,
    pub active_validator_indices_ordered: [OnceCell<Arc<[ValidatorIndex]>>; 3],
    pub active_validator_indices_shuffled: [OnceCell<Arc<[ValidatorIndex]>>; 3],
    pub total_active_balance: [OnceCell<NonZeroU64>; 3],
}

// Caches never affect the observable contents of a state.
impl PartialEq for Cache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Cache {}

impl Cache {
    pub fn advance_slot(&mut self) {
        self.proposer_index.take();
    }

    pub fn advance_epoch(&mut self) {
        Self::rotate(&mut self.active_validator_indices_ordered);
        Self::rotate(&mut self.active_validator_indices_shuffled);
        Self::rotate(&mut self.total_active_balance);
    }

    #[must_use]
    pub const fn index(relative_epoch: RelativeEpoch) -> usize {
        match relative_epoch {
            RelativeEpoch::Previous => 0,
            RelativeEpoch::Current => 1,
            RelativeEpoch::Next => 2,
        }
    }

    fn rotate<T>(cells: &mut [OnceCell<T>; 3]) {
        cells[0] = core::mem::take(&mut cells[1]);
        cells[1] = core::mem::take(&mut cells[2]);
        cells[2] = OnceCell::new();
    }
}
