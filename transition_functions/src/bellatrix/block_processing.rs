use anyhow::{ensure, Result};
use helper_functions::{accessors, misc, predicates, verifier::Verifier};
use types::{
    bellatrix::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, ExecutionPayload},
    },
    config::Config,
    preset::Preset,
    traits::BeaconState as _,
};

use crate::{altair, unphased};

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    unphased::block_processing::process_block_header(state, block)?;

    // > [New in Bellatrix]
    if predicates::is_execution_enabled(state, block.body.execution_payload.is_default_payload()) {
        process_execution_payload(config, state, &block.body.execution_payload)?;
    }

    unphased::block_processing::process_randao(config, state, &block.body, &mut verifier)?;
    unphased::block_processing::process_eth1_data(state, &block.body)?;

    altair::block_processing::process_operations(
        config,
        state,
        &block.body,
        P::MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX,
        &mut verifier,
    )?;

    altair::block_processing::process_sync_aggregate(
        config,
        state,
        &block.body.sync_aggregate,
        &mut verifier,
    )?;

    verifier.finish()
}

/// [`process_execution_payload`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/beacon-chain.md#process_execution_payload)
///
/// Only the consensus-side checks live here. Sending the payload to the
/// execution engine is the block processor's job, before the state transition.
fn process_execution_payload<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    payload: &ExecutionPayload<P>,
) -> Result<()> {
    // > Verify consistency of the parent hash with respect to the previous execution payload header
    if predicates::is_merge_transition_complete(state) {
        let expected = state.latest_execution_payload_header.block_hash;

        ensure!(
            payload.parent_hash == expected,
            unphased::Error::PayloadParentHashMismatch {
                expected,
                actual: payload.parent_hash,
            },
        );
    }

    // > Verify prev_randao
    let expected_randao = accessors::get_randao_mix(state, accessors::get_current_epoch(state));

    ensure!(
        payload.prev_randao == expected_randao,
        unphased::Error::PayloadPrevRandaoMismatch {
            expected: expected_randao,
            actual: payload.prev_randao,
        },
    );

    // > Verify timestamp
    let expected_timestamp =
        misc::compute_timestamp_at_slot::<P>(config, state.genesis_time, state.slot);

    ensure!(
        payload.timestamp == expected_timestamp,
        unphased::Error::PayloadTimestampMismatch {
            expected: expected_timestamp,
            actual: payload.timestamp,
        },
    );

    // > Cache execution payload header
    state.latest_execution_payload_header = payload.to_header();

    Ok(())
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use types::{nonstandard::Phase, phase0::primitives::H256, preset::Minimal};

    use crate::fixtures;

    use super::*;

    fn block_with_payload(
        config: &Config,
        state: &BeaconState<Minimal>,
    ) -> BeaconBlock<Minimal> {
        let mut block = fixtures::empty_bellatrix_block(state);

        let payload = &mut block.body.execution_payload;

        payload.prev_randao =
            accessors::get_randao_mix(state, accessors::get_current_epoch(state));
        payload.timestamp =
            misc::compute_timestamp_at_slot::<Minimal>(config, state.genesis_time, state.slot);
        payload.block_hash = H256::repeat_byte(0xbb);

        block
    }

    #[test]
    fn a_real_payload_is_validated_and_cached() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 1);
        let block = block_with_payload(&config, &state);

        process_block(&config, &mut state, &block, NullVerifier)
            .expect("a block with a consistent payload is valid");

        assert_eq!(
            state.latest_execution_payload_header.block_hash,
            H256::repeat_byte(0xbb),
        );
        assert!(predicates::is_merge_transition_complete(&state));
    }

    #[test]
    fn payloads_with_a_wrong_timestamp_are_rejected() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 1);
        let mut block = block_with_payload(&config, &state);

        block.body.execution_payload.timestamp += 1;

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("a payload with the wrong timestamp is invalid");

        assert!(error.to_string().contains("timestamp"));
    }

    #[test]
    fn payloads_with_a_wrong_randao_mix_are_rejected() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 1);
        let mut block = block_with_payload(&config, &state);

        block.body.execution_payload.prev_randao = H256::repeat_byte(0x99);

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("a payload with the wrong prev_randao is invalid");

        assert!(error.to_string().contains("randao"));
    }

    #[test]
    fn default_payloads_are_skipped_before_the_merge() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 1);
        let block = fixtures::empty_bellatrix_block(&state);

        process_block(&config, &mut state, &block, NullVerifier)
            .expect("a default payload is vacuously valid before the merge");

        assert_eq!(
            state.latest_execution_payload_header,
            Default::default(),
        );
        assert!(!predicates::is_merge_transition_complete(&state));
    }

    #[test]
    fn parent_hashes_are_chained_after_the_merge() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 1);

        // Complete the merge with a first real payload.
        let block = block_with_payload(&config, &state);
        process_block(&config, &mut state, &block, NullVerifier)
            .expect("a block with a consistent payload is valid");

        // A follow-up payload must chain off the cached block hash.
        crate::bellatrix::state_transition::process_slots(&config, &mut state, 2)
            .expect("empty slots can be processed");

        let mut next_block = block_with_payload(&config, &state);
        next_block.body.execution_payload.parent_hash = H256::repeat_byte(0x77);

        let error = process_block(&config, &mut state, &next_block, NullVerifier)
            .expect_err("a payload that does not chain is invalid");

        assert!(error.to_string().contains("parent hash"));
    }
}
