use thiserror::Error;
use types::phase0::primitives::{Slot, H256};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("block {root} is already present in the block tree")]
    DuplicateBlock { root: H256 },
    #[error("parent {parent_root} of block {root} is not present in the block tree")]
    MissingParent { root: H256, parent_root: H256 },
    #[error("block {root} at slot {slot} precedes the finalized slot {finalized_slot}")]
    BlockPrecedesFinalized {
        root: H256,
        slot: Slot,
        finalized_slot: Slot,
    },
    #[error(
        "backfill block {root} does not link to the earliest known block \
         (expected {expected_root})"
    )]
    BackfillChainMismatch { root: H256, expected_root: H256 },
}
