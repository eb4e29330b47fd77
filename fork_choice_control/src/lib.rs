pub use crate::{
    block_processor::{BlockProcessor, BlockProcessorHandle, VERIFIED_HEAD_PREFERENCE_SLOTS},
    consensus_manager::{BlockAction, ConsensusManager},
    misc::{BlockEntry, BlockOrigin, BlockOutcome},
    quarantine::{Quarantine, QuarantineConfig},
    validator_monitor::{NullValidatorMonitor, ValidatorMonitor},
};

mod block_processor;
mod consensus_manager;
mod misc;
mod quarantine;
mod validator_monitor;
