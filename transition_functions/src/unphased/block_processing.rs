use anyhow::{ensure, Result};
use helper_functions::{
    accessors,
    error::SignatureKind,
    misc, mutators, predicates,
    signing::{RandaoEpoch, SignForSingleFork as _},
    verifier::{SingleVerifier, Verifier},
};
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{
            Attestation, AttesterSlashing, Deposit, DepositMessage, ProposerSlashing,
            SignedVoluntaryExit, Validator,
        },
        primitives::{ValidatorIndex, H256},
    },
    preset::Preset,
    traits::{BeaconBlock, BeaconBlockBody, BeaconState},
};

use crate::unphased::Error;

/// [`process_block_header`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#block-header)
pub fn process_block_header<P: Preset>(
    state: &mut impl BeaconState<P>,
    block: &impl BeaconBlock<P>,
) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        block.slot() == state.slot(),
        Error::BlockSlotMismatch {
            state_slot: state.slot(),
            block_slot: block.slot(),
        },
    );

    // > Verify that the block is newer than latest block header
    ensure!(
        block.slot() > state.latest_block_header().slot,
        Error::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot(),
            header_slot: state.latest_block_header().slot,
        },
    );

    // > Verify that proposer index is the correct index
    let computed = accessors::get_beacon_proposer_index(state)?;

    ensure!(
        block.proposer_index() == computed,
        Error::ProposerIndexMismatch {
            expected: computed,
            actual: block.proposer_index(),
        },
    );

    // > Verify that the parent matches
    let expected = state.latest_block_header().hash_tree_root();

    ensure!(
        block.parent_root() == expected,
        Error::BlockParentRootMismatch {
            expected,
            actual: block.parent_root(),
        },
    );

    // > Cache current block as the new latest block
    let mut header = block.to_header();
    header.state_root = H256::zero();
    *state.latest_block_header_mut() = header;

    // > Verify proposer is not slashed
    let proposer = accessors::get_validator(state, block.proposer_index())?;

    ensure!(
        !proposer.slashed,
        Error::ProposerSlashed {
            index: block.proposer_index(),
        },
    );

    Ok(())
}

/// [`process_randao`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#randao)
pub fn process_randao<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    body: &impl BeaconBlockBody<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let epoch = accessors::get_current_epoch(state);
    let randao_reveal = body.randao_reveal();

    // > Verify RANDAO reveal
    let proposer_index = accessors::get_beacon_proposer_index(state)?;

    verifier.verify_singular(
        RandaoEpoch::from(epoch).signing_root(config, state),
        randao_reveal,
        accessors::public_key(state, proposer_index)?,
        SignatureKind::Randao,
    )?;

    // > Mix in RANDAO reveal
    let mut mix = accessors::get_randao_mix(state, epoch);

    for (mix_byte, reveal_byte) in mix
        .as_bytes_mut()
        .iter_mut()
        .zip(hashing::hash_bytes(randao_reveal.as_bytes()).as_bytes())
    {
        *mix_byte ^= reveal_byte;
    }

    *state.randao_mixes_mut().mod_index_mut(epoch) = mix;

    Ok(())
}

/// [`process_eth1_data`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#eth1-data)
pub fn process_eth1_data<P: Preset>(
    state: &mut impl BeaconState<P>,
    body: &impl BeaconBlockBody<P>,
) -> Result<()> {
    let eth1_data = body.eth1_data();

    state
        .eth1_data_votes_mut()
        .push(eth1_data)
        .map_err(|_| Error::Eth1DataVotesFull)?;

    let vote_count = state
        .eth1_data_votes()
        .iter()
        .filter(|vote| **vote == eth1_data)
        .count();

    if vote_count * 2 > P::SlotsPerEth1VotingPeriod::USIZE {
        *state.eth1_data_mut() = eth1_data;
    }

    Ok(())
}

/// Validates everything about a proposer slashing except the slashing itself
/// and returns the index of the validator to slash.
pub fn validate_proposer_slashing<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    proposer_slashing: &ProposerSlashing,
    verifier: &mut impl Verifier,
) -> Result<ValidatorIndex> {
    let header_1 = proposer_slashing.signed_header_1.message;
    let header_2 = proposer_slashing.signed_header_2.message;

    // > Verify header slots match
    ensure!(
        header_1.slot == header_2.slot,
        Error::ProposerSlashingSlotMismatch,
    );

    // > Verify header proposer indices match
    ensure!(
        header_1.proposer_index == header_2.proposer_index,
        Error::ProposerSlashingProposerMismatch,
    );

    // > Verify the headers are different
    ensure!(header_1 != header_2, Error::ProposerSlashingHeadersIdentical);

    // > Verify the proposer is slashable
    let index = header_1.proposer_index;
    let proposer = accessors::get_validator(state, index)?;

    ensure!(
        predicates::is_slashable_validator(proposer, accessors::get_current_epoch(state)),
        Error::ValidatorNotSlashable { index },
    );

    // > Verify signatures
    for signed_header in [
        proposer_slashing.signed_header_1,
        proposer_slashing.signed_header_2,
    ] {
        verifier.verify_singular(
            signed_header.message.signing_root(config, state),
            signed_header.signature,
            accessors::public_key(state, index)?,
            SignatureKind::BlockHeaderInProposerSlashing,
        )?;
    }

    Ok(index)
}

/// Validates an attester slashing and returns the validators it slashes,
/// in increasing index order.
pub fn validate_attester_slashing<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    attester_slashing: &AttesterSlashing<P>,
    verifier: &mut impl Verifier,
) -> Result<Vec<ValidatorIndex>> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    ensure!(
        predicates::is_slashable_attestation_data(attestation_1.data, attestation_2.data),
        Error::AttesterSlashingNotSlashable,
    );

    predicates::validate_indexed_attestation(config, state, attestation_1, verifier)?;
    predicates::validate_indexed_attestation(config, state, attestation_2, verifier)?;

    let current_epoch = accessors::get_current_epoch(state);

    let in_both = attestation_1
        .attesting_indices
        .iter()
        .filter(|index| attestation_2.attesting_indices.contains(index));

    let slashable = in_both
        .copied()
        .filter(|index| {
            accessors::get_validator(state, *index)
                .map(|validator| predicates::is_slashable_validator(validator, current_epoch))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    ensure!(!slashable.is_empty(), Error::AttesterSlashingSlashedNothing);

    Ok(slashable)
}

/// The structural and FFG checks shared by all forks' attestation processing.
pub fn validate_attestation<P: Preset>(
    state: &impl BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<AttestationEpoch> {
    let data = attestation.data;

    let current_epoch = accessors::get_current_epoch(state);
    let previous_epoch = accessors::get_previous_epoch(state);

    let attestation_epoch = if data.target.epoch == current_epoch {
        AttestationEpoch::Current
    } else if data.target.epoch == previous_epoch {
        AttestationEpoch::Previous
    } else {
        anyhow::bail!(Error::AttestationTargetsWrongEpoch {
            target_epoch: data.target.epoch,
        })
    };

    ensure!(
        data.target.epoch == misc::compute_epoch_at_slot::<P>(data.slot),
        Error::AttestationTargetsWrongEpoch {
            target_epoch: data.target.epoch,
        },
    );

    let earliest = data.slot + P::MIN_ATTESTATION_INCLUSION_DELAY.get();
    let latest = data.slot + P::SlotsPerEpoch::U64;

    ensure!(
        (earliest..=latest).contains(&state.slot()),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot(),
            attestation_slot: data.slot,
        },
    );

    // > The FFG source checkpoint must match the state's justified checkpoint of that epoch
    let expected_source = match attestation_epoch {
        AttestationEpoch::Current => state.current_justified_checkpoint(),
        AttestationEpoch::Previous => state.previous_justified_checkpoint(),
    };

    ensure!(
        data.source == expected_source,
        Error::AttestationSourceMismatch {
            expected: expected_source,
            actual: data.source,
        },
    );

    // The FFG target must point at the first-slot block of the target epoch
    // as seen by this state.
    let expected_target_root = accessors::get_block_root(state, data.target.epoch)?;

    ensure!(
        data.target.root == expected_target_root,
        Error::AttestationTargetRootMismatch {
            expected: expected_target_root,
            actual: data.target.root,
        },
    );

    Ok(attestation_epoch)
}

/// [`process_deposit`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#deposits)
///
/// `on_new_validator` lets post-Altair forks grow their per-validator lists
/// (participation flags, inactivity scores) in lockstep with the registry.
pub fn process_deposits<P: Preset, S: BeaconState<P>>(
    config: &Config,
    state: &mut S,
    deposits: &[Deposit],
    mut on_new_validator: impl FnMut(&mut S) -> Result<()>,
) -> Result<()> {
    let expected = P::MaxDeposits::U64
        .min(
            state
                .eth1_data()
                .deposit_count
                .saturating_sub(state.eth1_deposit_index()),
        );

    ensure!(
        deposits.len() as u64 == expected,
        Error::DepositCountMismatch {
            expected,
            actual: deposits.len() as u64,
        },
    );

    for deposit in deposits {
        // > Verify the Merkle branch
        let valid = predicates::is_valid_merkle_branch(
            deposit.data.hash_tree_root(),
            deposit.proof.iter().copied(),
            state.eth1_deposit_index(),
            state.eth1_data().deposit_root,
        );

        ensure!(valid, Error::DepositProofInvalid);

        // > Deposits must be processed in order
        *state.eth1_deposit_index_mut() += 1;

        apply_deposit_data(config, state, deposit, &mut on_new_validator)?;
    }

    Ok(())
}

fn apply_deposit_data<P: Preset, S: BeaconState<P>>(
    config: &Config,
    state: &mut S,
    deposit: &Deposit,
    on_new_validator: &mut impl FnMut(&mut S) -> Result<()>,
) -> Result<()> {
    let deposit_data = deposit.data;
    let pubkey = deposit_data.pubkey;
    let amount = deposit_data.amount;

    let existing = state
        .validators()
        .iter()
        .zip(0..)
        .find(|(validator, _)| validator.pubkey.to_bytes() == pubkey);

    if let Some((_, index)) = existing {
        // > Increase balance by deposit amount
        return mutators::increase_balance(state, index, amount);
    }

    // > Verify the deposit signature (proof of possession)
    // > which is not checked by the deposit contract
    let deposit_message = DepositMessage {
        pubkey,
        withdrawal_credentials: deposit_data.withdrawal_credentials,
        amount,
    };

    let valid = SingleVerifier
        .verify_singular(
            helper_functions::signing::deposit_signing_root(config, deposit_message),
            deposit_data.signature,
            &pubkey.into(),
            SignatureKind::Deposit,
        )
        .is_ok();

    // Invalid deposits are skipped rather than rejected.
    // The deposit contract cannot validate BLS signatures.
    if !valid {
        return Ok(());
    }

    // > Add validator and balance entries
    let effective_balance = amount
        .saturating_sub(amount % P::EFFECTIVE_BALANCE_INCREMENT)
        .min(P::MAX_EFFECTIVE_BALANCE);

    let validator = Validator {
        pubkey: pubkey.into(),
        withdrawal_credentials: deposit_data.withdrawal_credentials,
        effective_balance,
        slashed: false,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    };

    state.validators_mut().push(validator)?;
    state.balances_mut().push(amount)?;
    on_new_validator(state)?;

    Ok(())
}

/// [`process_voluntary_exit`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#voluntary-exits)
pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let current_epoch = accessors::get_current_epoch(state);

    {
        let validator = accessors::get_validator(state, index)?;

        // > Verify the validator is active
        ensure!(
            predicates::is_active_validator(validator, current_epoch),
            Error::VoluntaryExitFromInactiveValidator { index },
        );

        // > Verify exit has not been initiated
        ensure!(
            validator.exit_epoch == FAR_FUTURE_EPOCH,
            Error::VoluntaryExitAlreadyInitiated { index },
        );

        // > Exits must specify an epoch when they become valid; they are not valid before then
        ensure!(
            current_epoch >= voluntary_exit.epoch,
            Error::VoluntaryExitTooEarly { index },
        );

        // > Verify the validator has been active long enough
        ensure!(
            current_epoch >= validator.activation_epoch + config.shard_committee_period,
            Error::VoluntaryExitTooEarly { index },
        );

        // > Verify signature
        verifier.verify_singular(
            voluntary_exit.signing_root(config, state),
            signed_voluntary_exit.signature,
            &validator.pubkey,
            SignatureKind::VoluntaryExit,
        )?;
    }

    // > Initiate exit
    mutators::initiate_validator_exit(config, state, index)
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use types::{
        nonstandard::Phase,
        phase0::containers::{BeaconBlockBody, Checkpoint, Eth1Data},
        preset::Minimal,
    };

    use crate::fixtures;

    use super::*;

    #[test]
    fn block_headers_are_validated_against_the_state() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);
        let block = fixtures::empty_phase0_block(&state);

        let mut wrong_slot = block.clone();
        wrong_slot.slot += 1;
        assert!(process_block_header(&mut state.clone(), &wrong_slot).is_err());

        let mut wrong_parent = block.clone();
        wrong_parent.parent_root = H256::repeat_byte(1);
        assert!(process_block_header(&mut state.clone(), &wrong_parent).is_err());

        let mut wrong_proposer = block.clone();
        wrong_proposer.proposer_index =
            (wrong_proposer.proposer_index + 1) % fixtures::VALIDATOR_COUNT;
        assert!(process_block_header(&mut state.clone(), &wrong_proposer).is_err());

        process_block_header(&mut state, &block)
            .expect("a well-formed header is accepted");

        assert_eq!(state.latest_block_header.slot, 1);
        // The state root is filled in by the next slot's processing.
        assert!(state.latest_block_header.state_root.is_zero());
    }

    #[test]
    fn randao_reveals_are_mixed_into_the_current_epoch() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);

        let epoch = accessors::get_current_epoch(&state);
        let mix_before = accessors::get_randao_mix(&state, epoch);

        let body = BeaconBlockBody::<Minimal> {
            randao_reveal: bls::SignatureBytes::repeat_byte(0x11),
            eth1_data: state.eth1_data,
            ..BeaconBlockBody::default()
        };

        process_randao(&config, &mut state, &body, &mut NullVerifier)
            .expect("the reveal is not verified under a null verifier");

        let mut expected = mix_before;

        for (byte, reveal_byte) in expected
            .as_bytes_mut()
            .iter_mut()
            .zip(hashing::hash_bytes(body.randao_reveal.as_bytes()).as_bytes())
        {
            *byte ^= reveal_byte;
        }

        assert_eq!(accessors::get_randao_mix(&state, epoch), expected);
    }

    #[test]
    fn a_majority_of_eth1_votes_replaces_the_eth1_data() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);

        let new_eth1_data = Eth1Data {
            deposit_root: H256::repeat_byte(3),
            deposit_count: fixtures::VALIDATOR_COUNT,
            block_hash: H256::repeat_byte(4),
        };

        let body = BeaconBlockBody::<Minimal> {
            eth1_data: new_eth1_data,
            ..BeaconBlockBody::default()
        };

        // 32 slots per voting period on the minimal preset;
        // the data flips once votes exceed half of them.
        for _ in 0..16 {
            process_eth1_data(&mut state, &body).expect("votes can be recorded");
            assert_ne!(state.eth1_data, new_eth1_data);
        }

        process_eth1_data(&mut state, &body).expect("votes can be recorded");
        assert_eq!(state.eth1_data, new_eth1_data);
    }

    #[test]
    fn attestations_must_fall_in_the_inclusion_window() {
        let config = fixtures::config_for(Phase::Phase0);
        let state = fixtures::phase0_state_at(&config, 9);

        let attestation = Attestation::<Minimal> {
            data: types::phase0::containers::AttestationData {
                slot: 8,
                index: 0,
                beacon_block_root: H256::zero(),
                source: state.current_justified_checkpoint,
                target: Checkpoint {
                    epoch: 1,
                    root: accessors::get_block_root(&state, 1)
                        .expect("the target root is in range"),
                },
            },
            ..Attestation::default()
        };

        assert_eq!(
            validate_attestation(&state, &attestation)
                .expect("the attestation is includable"),
            AttestationEpoch::Current,
        );

        // Not yet includable one slot earlier.
        let early_state = fixtures::phase0_state_at(&config, 8);
        assert!(validate_attestation(&early_state, &attestation).is_err());

        // The target must match the epoch of the attestation slot.
        let mut wrong_target_epoch = attestation.clone();
        wrong_target_epoch.data.slot = 7;
        assert!(validate_attestation(&state, &wrong_target_epoch).is_err());

        // The target root must match the state's view of the epoch boundary.
        let mut wrong_target_root = attestation;
        wrong_target_root.data.target.root = H256::repeat_byte(9);
        assert!(validate_attestation(&state, &wrong_target_root).is_err());
    }

    #[test]
    fn voluntary_exits_are_validated_before_taking_effect() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 15);

        let exit = SignedVoluntaryExit {
            message: types::phase0::containers::VoluntaryExit {
                epoch: 0,
                validator_index: 0,
            },
            signature: Default::default(),
        };

        // All validators activated at genesis, but `shard_committee_period`
        // epochs have not passed yet.
        assert!(
            process_voluntary_exit(&config, &mut state, exit, &mut NullVerifier).is_err(),
        );

        let missing = SignedVoluntaryExit {
            message: types::phase0::containers::VoluntaryExit {
                epoch: 0,
                validator_index: fixtures::VALIDATOR_COUNT,
            },
            signature: Default::default(),
        };

        assert!(
            process_voluntary_exit(&config, &mut state, missing, &mut NullVerifier).is_err(),
        );
    }

    #[test]
    fn deposit_counts_must_match_the_eth1_data() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 1);

        // The quick-start state has every deposit already processed,
        // so any deposit in a block is one too many.
        let error = process_deposits(&config, &mut state, &[Deposit::default()], |_| Ok(()))
            .expect_err("an unexpected deposit is invalid");

        assert!(error.to_string().contains("deposit count"));
    }
}
