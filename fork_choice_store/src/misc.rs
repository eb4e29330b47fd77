use core::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use helper_functions::misc;
use types::{
    combined::{BeaconState, SignedBeaconBlock},
    nonstandard::PayloadStatus,
    phase0::primitives::{Epoch, ExecutionBlockHash, Slot, H256},
    preset::Preset,
};

/// A block in the tree together with its post-state.
///
/// The canonical state cache lives here: states are owned exclusively by the
/// block tree, everything else gets `Arc` clones.
#[derive(Clone)]
pub struct ChainLink<P: Preset> {
    pub block_root: H256,
    pub block: Arc<SignedBeaconBlock<P>>,
    pub state: Arc<BeaconState<P>>,
    pub payload_status: PayloadStatus,
}

impl<P: Preset> Debug for ChainLink<P> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter
            .debug_struct("ChainLink")
            .field("block_root", &self.block_root)
            .field("slot", &self.slot())
            .field("parent_root", &self.block.parent_root())
            .field("payload_status", &self.payload_status)
            .finish_non_exhaustive()
    }
}

impl<P: Preset> ChainLink<P> {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.message_slot()
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot())
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        self.block.parent_root()
    }

    #[must_use]
    pub fn execution_block_hash(&self) -> Option<ExecutionBlockHash> {
        self.block.execution_block_hash()
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.payload_status.is_valid()
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.payload_status.is_invalid()
    }

    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        self.payload_status.is_optimistic()
    }
}

/// The most recent attestation accepted from a validator,
/// the "latest message" of LMD-GHOST.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    pub root: H256,
}
