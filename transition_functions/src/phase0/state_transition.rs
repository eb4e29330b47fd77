use anyhow::Result;
use helper_functions::{
    accessors, error::SignatureKind, signing::SignForSingleFork as _, verifier::Verifier,
};
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, containers::SignedBeaconBlock},
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
    verify_block_signature(config, state, signed_block, &mut verifier)?;

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
    unphased::slot_processing::process_slots(
        config,
        state,
        slot,
        epoch_processing::process_epoch,
    )
}

pub fn verify_block_signature<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    verifier.verify_singular(
        signed_block.message.signing_root(config, state),
        signed_block.signature,
        accessors::public_key(state, signed_block.message.proposer_index)?,
        SignatureKind::Block,
    )
}
