use anyhow::Result;
use helper_functions::{
    accessors, error::SignatureKind, signing::SignForSingleFork as _, verifier::Verifier,
};
use types::{
    altair::{beacon_state::BeaconState, containers::SignedBeaconBlock},
    config::Config,
    preset::Preset,
};

use crate::unphased::{self, ProcessSlots, StateRootPolicy};

use super::{block_processing, epoch_processing};

pub fn state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    process_slots: ProcessSlots,
    state_root_policy: StateRootPolicy,
    mut verifier: impl Verifier,
) -> Result<()> {
    let block = &signed_block.message;

    // > Process slots (including those with no blocks) since block
    if process_slots.should_process(state, block) {
        self::process_slots(config, state, block.slot)?;
    }

    // > Verify signature
    verifier.verify_singular(
        signed_block.message.signing_root(config, state),
        signed_block.signature,
        accessors::public_key(state, signed_block.message.proposer_index)?,
        SignatureKind::Block,
    )?;

    // > Process block
    block_processing::process_block(config, state, block, &mut verifier)?;

    // > Verify state root
    state_root_policy.verify(state, block)?;

    Ok(())
}

pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slot: types::phase0::primitives::Slot,
) -> Result<()> {
    unphased::slot_processing::process_slots(config, state, slot, |config, state| {
        epoch_processing::process_epoch(
            config,
            state,
            epoch_processing::PenaltyParams::altair::<P>(),
        )
    })
}
