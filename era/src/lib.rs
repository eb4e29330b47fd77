//! The era archive format: append-only, length-prefixed, Snappy-framed
//! records of finalized block and state history, with a trailing
//! self-describing index per group.
//!
//! An era file is laid out as
//! `Version | Block_0 … Block_{n-1} | BlockIndex (if n > 0) | State | StateIndex`.

pub use crate::{
    reader::{EraIndex, EraReader},
    record::{RecordType, E2_INDEX, E2_VERSION, SNAPPY_BEACON_BLOCK, SNAPPY_BEACON_STATE},
    writer::EraWriter,
};

use thiserror::Error;
use types::{
    phase0::primitives::{Slot, H256},
    preset::Preset,
    traits::BeaconState,
};

mod reader;
mod record;
mod writer;

/// The number of slots covered by one era file.
#[must_use]
pub fn slots_per_era<P: Preset>() -> u64 {
    <P::SlotsPerHistoricalRoot as typenum::Unsigned>::U64
}

/// The era an archived state belongs to.
#[must_use]
pub fn era_number<P: Preset>(state_slot: Slot) -> u64 {
    state_slot / slots_per_era::<P>()
}

/// The root identifying an era in its file name:
/// the genesis validators root for era 0, the accumulated historical root
/// for eras the state has seen, zero otherwise.
#[must_use]
pub fn era_historical_root<P: Preset>(state: &impl BeaconState<P>, era: u64) -> H256 {
    if era == 0 {
        return state.genesis_validators_root();
    }

    usize::try_from(era - 1)
        .ok()
        .and_then(|index| state.historical_roots().get(index).copied())
        .unwrap_or_else(H256::zero)
}

/// `"<network>-<era:05>-<1:05>-<shortlog(historical_root)>.era"`
#[must_use]
pub fn file_name(network: &str, era: u64, historical_root: H256) -> String {
    let mut shortlog = String::with_capacity(8);

    for byte in &historical_root[..4] {
        shortlog.push_str(&format!("{byte:02x}"));
    }

    format!("{network}-{era:05}-{:05}-{shortlog}.era", 1)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("file does not start with a version record")]
    BadVersionRecord,
    #[error("index record declares {count} entries but is {length} bytes long")]
    CountMismatch { count: u64, length: u64 },
    #[error("index record declares {count} entries but the file only fits {maximum}")]
    CountOutOfRange { count: u64, maximum: u64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("record of {length} bytes does not fit in a 6-byte length")]
    LengthOverflow { length: usize },
    #[error("index entry {index} points to {offset:#x}, outside the file of {file_length} bytes")]
    OffsetOutOfRange {
        index: usize,
        offset: u64,
        file_length: u64,
    },
    #[error("slot {slot} is out of order (next expected slot is {expected})")]
    SlotOutOfOrder { slot: Slot, expected: Slot },
    #[error("index start slot {start_slot} does not fit in 32 bits")]
    StartSlotTooLarge { start_slot: Slot },
    #[error("file of {file_length} bytes is too short to hold an era index")]
    Truncated { file_length: u64 },
    #[error("expected record type {expected:02x?}, found {actual:02x?}")]
    UnexpectedRecordType {
        expected: RecordType,
        actual: RecordType,
    },
}

#[cfg(test)]
mod tests {
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn file_names_embed_era_and_short_root() {
        let root = H256::repeat_byte(0xab);

        assert_eq!(
            file_name("mainnet", 42, root),
            "mainnet-00042-00001-abababab.era",
        );
    }

    #[test]
    fn era_numbers_follow_the_historical_root_period() {
        assert_eq!(era_number::<Minimal>(0), 0);
        assert_eq!(era_number::<Minimal>(63), 0);
        assert_eq!(era_number::<Minimal>(64), 1);
    }
}
