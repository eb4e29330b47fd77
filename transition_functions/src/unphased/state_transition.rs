use anyhow::{ensure, Result};
use ssz::SszHash as _;
use types::{preset::Preset, traits::{BeaconBlock, BeaconState}};

use crate::unphased::Error;

pub enum ProcessSlots {
    Always,
    IfNeeded,
    Never,
}

impl ProcessSlots {
    pub fn should_process<P: Preset>(
        &self,
        state: &impl BeaconState<P>,
        block: &impl BeaconBlock<P>,
    ) -> bool {
        match self {
            Self::Always => true,
            // The test for equality is intentional. It ensures that blocks attempting to "rewind"
            // the state are rejected early by `process_slots` instead of failing state root
            // verification much later.
            Self::IfNeeded => state.slot() != block.slot(),
            Self::Never => false,
        }
    }
}

#[derive(Clone, Copy)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    pub fn verify<P: Preset>(
        self,
        state: &impl BeaconState<P>,
        block: &impl BeaconBlock<P>,
    ) -> Result<()> {
        match self {
            Self::Verify => {
                let actual = state.hash_tree_root();
                let expected = block.state_root();

                ensure!(
                    actual == expected,
                    Error::StateRootMismatch { expected, actual },
                );

                Ok(())
            }
            Self::Trust => Ok(()),
        }
    }
}
