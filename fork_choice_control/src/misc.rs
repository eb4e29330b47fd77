use core::time::Duration;
use std::sync::Arc;

use futures::channel::oneshot::Sender;
use strum::AsRefStr;
use types::{combined::SignedBeaconBlock, phase0::primitives::H256, preset::Preset};

/// Where a block entered the node from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BlockOrigin {
    Gossip,
    Sync,
    Requested,
    OptimisticSync,
}

impl BlockOrigin {
    #[must_use]
    pub const fn is_optimistic_sync(self) -> bool {
        matches!(self, Self::OptimisticSync)
    }
}

/// The final disposition of a submitted block, reported exactly once
/// through the entry's result sender.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BlockOutcome {
    Accepted,
    /// The block was already in the block tree. Idempotent success.
    Duplicate,
    Invalid(String),
    MissingParent { parent_root: H256 },
    UnviableFork,
    Cancelled,
}

pub struct BlockEntry<P: Preset> {
    pub origin: BlockOrigin,
    pub block: Arc<SignedBeaconBlock<P>>,
    pub result_tx: Option<Sender<BlockOutcome>>,
    /// Time the networking layer already spent validating the block,
    /// carried along for logging.
    pub validation_duration: Duration,
}

impl<P: Preset> BlockEntry<P> {
    pub fn resolve(&mut self, outcome: BlockOutcome) {
        if let Some(sender) = self.result_tx.take() {
            // The submitter may have stopped waiting. That is not an error.
            let _ = sender.send(outcome);
        }
    }
}
