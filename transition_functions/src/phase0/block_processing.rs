use anyhow::Result;
use helper_functions::{accessors, mutators, predicates, verifier::Verifier};
use types::{
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, BeaconBlock, PendingAttestation},
    },
    preset::Preset,
};

use crate::unphased;

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    unphased::block_processing::process_block_header(state, block)?;
    unphased::block_processing::process_randao(config, state, &block.body, &mut verifier)?;
    unphased::block_processing::process_eth1_data(state, &block.body)?;
    process_operations(config, state, block, &mut verifier)?;
    verifier.finish()
}

fn process_operations<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let body = &block.body;

    for proposer_slashing in &body.proposer_slashings {
        let index = unphased::block_processing::validate_proposer_slashing(
            config,
            state,
            proposer_slashing,
            verifier,
        )?;

        slash(config, state, index)?;
    }

    for attester_slashing in &body.attester_slashings {
        let indices = unphased::block_processing::validate_attester_slashing(
            config,
            state,
            attester_slashing,
            verifier,
        )?;

        for index in indices {
            slash(config, state, index)?;
        }
    }

    for attestation in &body.attestations {
        process_attestation(config, state, attestation, block, verifier)?;
    }

    unphased::block_processing::process_deposits(config, state, &body.deposits, |_| Ok(()))?;

    for voluntary_exit in &body.voluntary_exits {
        unphased::block_processing::process_voluntary_exit(
            config,
            state,
            *voluntary_exit,
            verifier,
        )?;
    }

    Ok(())
}

/// [`process_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#attestations)
fn process_attestation<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    attestation: &Attestation<P>,
    block: &BeaconBlock<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let attestation_epoch =
        unphased::block_processing::validate_attestation(state, attestation)?;

    // > Verify signature
    let indexed_attestation = accessors::get_indexed_attestation(state, attestation)?;

    predicates::validate_indexed_attestation(config, state, &indexed_attestation, verifier)?;

    let pending_attestation = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: attestation.data,
        inclusion_delay: state.slot - attestation.data.slot,
        proposer_index: block.proposer_index,
    };

    match attestation_epoch {
        AttestationEpoch::Current => state
            .current_epoch_attestations
            .push(pending_attestation)?,
        AttestationEpoch::Previous => state
            .previous_epoch_attestations
            .push(pending_attestation)?,
    }

    Ok(())
}

fn slash<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    index: types::phase0::primitives::ValidatorIndex,
) -> Result<()> {
    mutators::slash_validator(
        config,
        state,
        index,
        None,
        P::MIN_SLASHING_PENALTY_QUOTIENT,
        |whistleblower_reward| whistleblower_reward / P::PROPOSER_REWARD_QUOTIENT,
    )
}

/// The number of signatures verified while processing a block,
/// used to size batch verifier allocations.
#[must_use]
pub fn count_required_signatures<P: Preset>(block: &BeaconBlock<P>) -> usize {
    let body = &block.body;

    // RANDAO reveal
    1 + body.proposer_slashings.len() * 2
        + body.attester_slashings.len() * 2
        + body.attestations.len()
        + body.voluntary_exits.len()
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use ssz::BitList;
    use types::{
        nonstandard::Phase,
        phase0::{
            containers::{
                AttestationData, BeaconBlockHeader, Checkpoint, ProposerSlashing,
                SignedBeaconBlockHeader,
            },
            primitives::H256,
        },
    };

    use crate::fixtures;

    use super::*;

    #[test]
    fn an_empty_block_applies_cleanly() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);
        let block = fixtures::empty_phase0_block(&state);

        process_block(&config, &mut state, &block, NullVerifier)
            .expect("an empty block on top of the current state is valid");

        assert_eq!(state.latest_block_header.slot, 1);
        assert_eq!(state.latest_block_header.proposer_index, block.proposer_index);
        assert_eq!(state.eth1_data_votes.len(), 1);
        assert!(state.current_epoch_attestations.is_empty());
    }

    #[test]
    fn attestations_are_recorded_as_pending() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 9);

        let committee = accessors::beacon_committee(&state, 8, 0)
            .expect("the committee can be computed");

        let mut aggregation_bits = BitList::with_length(committee.len());

        for position in 0..committee.len() {
            aggregation_bits.set(position, true);
        }

        let attestation = Attestation {
            aggregation_bits,
            data: AttestationData {
                slot: 8,
                index: 0,
                beacon_block_root: accessors::get_block_root_at_slot(&state, 8)
                    .expect("the slot is in range"),
                source: state.current_justified_checkpoint,
                target: Checkpoint {
                    epoch: 1,
                    root: accessors::get_block_root(&state, 1)
                        .expect("the target root is in range"),
                },
            },
            signature: Default::default(),
        };

        let mut block = fixtures::empty_phase0_block(&state);

        block.body.attestations =
            vec![attestation].try_into().expect("the list is not full");

        process_block(&config, &mut state, &block, NullVerifier)
            .expect("a block with one valid attestation is valid");

        assert_eq!(state.current_epoch_attestations.len(), 1);
        assert!(state.previous_epoch_attestations.is_empty());

        let pending = &state.current_epoch_attestations[0];

        assert_eq!(pending.inclusion_delay, 1);
        assert_eq!(pending.proposer_index, block.proposer_index);
    }

    #[test]
    fn proposer_slashings_slash_the_offender() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);

        let mut block = fixtures::empty_phase0_block(&state);

        // Any validator other than the block proposer works as the offender.
        let offender = (block.proposer_index + 1) % fixtures::VALIDATOR_COUNT;

        let header = |state_root| SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: 0,
                proposer_index: offender,
                parent_root: H256::zero(),
                state_root,
                body_root: H256::zero(),
            },
            signature: Default::default(),
        };

        let proposer_slashing = ProposerSlashing {
            signed_header_1: header(H256::repeat_byte(1)),
            signed_header_2: header(H256::repeat_byte(2)),
        };

        block.body.proposer_slashings =
            vec![proposer_slashing].try_into().expect("the list is not full");

        let balance_before = state.balances[offender as usize];

        process_block(&config, &mut state, &block, NullVerifier)
            .expect("a block with one valid proposer slashing is valid");

        let offender_validator = &state.validators[offender as usize];

        assert!(offender_validator.slashed);
        assert_ne!(offender_validator.exit_epoch, types::phase0::consts::FAR_FUTURE_EPOCH);
        assert!(state.balances[offender as usize] < balance_before);
    }

    #[test]
    fn identical_slashing_headers_are_rejected() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);

        let mut block = fixtures::empty_phase0_block(&state);

        let header = SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                proposer_index: (block.proposer_index + 1) % fixtures::VALIDATOR_COUNT,
                ..BeaconBlockHeader::default()
            },
            signature: Default::default(),
        };

        let proposer_slashing = ProposerSlashing {
            signed_header_1: header,
            signed_header_2: header,
        };

        block.body.proposer_slashings =
            vec![proposer_slashing].try_into().expect("the list is not full");

        process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("a slashing with identical headers is invalid");
    }
}
