use anyhow::Result;
use helper_functions::{
    accessors,
    error::SignatureKind,
    misc, mutators, predicates,
    verifier::Verifier,
};
use itertools::izip;
use std::collections::HashMap;
use typenum::Unsigned as _;
use types::{
    altair::{
        consts::{
            PARTICIPATION_FLAG_WEIGHTS, PROPOSER_WEIGHT, SYNC_REWARD_WEIGHT,
            TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
            DOMAIN_SYNC_COMMITTEE, WEIGHT_DENOMINATOR,
        },
        containers::SyncAggregate,
        primitives::ParticipationFlags,
    },
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        containers::{Attestation, AttestationData},
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::{BeaconState as _, PostAltairBeaconState},
};

use crate::unphased;

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut types::altair::beacon_state::BeaconState<P>,
    block: &types::altair::containers::BeaconBlock<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    unphased::block_processing::process_block_header(state, block)?;
    unphased::block_processing::process_randao(config, state, &block.body, &mut verifier)?;
    unphased::block_processing::process_eth1_data(state, &block.body)?;
    process_operations(
        config,
        state,
        &block.body,
        P::MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR,
        &mut verifier,
    )?;
    process_sync_aggregate(config, state, &block.body.sync_aggregate, &mut verifier)?;
    verifier.finish()
}

/// Operation processing shared by all post-Altair forks.
///
/// The minimum slashing penalty quotient is the one parameter of these
/// operations that Bellatrix changes.
pub fn process_operations<P: Preset, S: PostAltairBeaconState<P>>(
    config: &Config,
    state: &mut S,
    body: &impl types::traits::PostAltairBeaconBlockBody<P>,
    min_slashing_penalty_quotient: core::num::NonZeroU64,
    verifier: &mut impl Verifier,
) -> Result<()> {
    use types::traits::BeaconBlockBody as _;

    for proposer_slashing in body.proposer_slashings().iter() {
        let index = unphased::block_processing::validate_proposer_slashing(
            config,
            state,
            proposer_slashing,
            verifier,
        )?;

        slash(config, state, index, min_slashing_penalty_quotient)?;
    }

    for attester_slashing in body.attester_slashings().iter() {
        let indices = unphased::block_processing::validate_attester_slashing(
            config,
            state,
            attester_slashing,
            verifier,
        )?;

        for index in indices {
            slash(config, state, index, min_slashing_penalty_quotient)?;
        }
    }

    for attestation in body.attestations().iter() {
        process_attestation(config, state, attestation, verifier)?;
    }

    unphased::block_processing::process_deposits(config, state, body.deposits(), |state| {
        state.previous_epoch_participation_mut().push(0)?;
        state.current_epoch_participation_mut().push(0)?;
        state.inactivity_scores_mut().push(0)?;
        Ok(())
    })?;

    for voluntary_exit in body.voluntary_exits().iter() {
        unphased::block_processing::process_voluntary_exit(
            config,
            state,
            *voluntary_exit,
            verifier,
        )?;
    }

    Ok(())
}

fn slash<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    index: ValidatorIndex,
    min_slashing_penalty_quotient: core::num::NonZeroU64,
) -> Result<()> {
    mutators::slash_validator(
        config,
        state,
        index,
        None,
        min_slashing_penalty_quotient,
        |whistleblower_reward| whistleblower_reward * PROPOSER_WEIGHT / WEIGHT_DENOMINATOR,
    )
}

/// Attestation processing shared by all post-Altair forks.
///
/// [`process_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#modified-process_attestation)
pub fn process_attestation<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    attestation: &Attestation<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let attestation_epoch = unphased::block_processing::validate_attestation(state, attestation)?;

    // > Participation flag indices
    let inclusion_delay = state.slot() - attestation.data.slot;
    let participation_flags =
        participation_flag_indices(state, attestation.data, inclusion_delay)?;

    // > Verify signature
    let indexed_attestation = accessors::get_indexed_attestation(state, attestation)?;
    predicates::validate_indexed_attestation(config, state, &indexed_attestation, verifier)?;

    // > Update epoch participation flags
    let base_reward_per_increment = base_reward_per_increment(state);
    let mut proposer_reward_numerator = 0;

    for attester in &indexed_attestation.attesting_indices {
        let base_reward = base_reward(state, *attester, base_reward_per_increment)?;
        let index = usize::try_from(*attester)?;

        let epoch_participation = match attestation_epoch {
            AttestationEpoch::Previous => state.previous_epoch_participation_mut(),
            AttestationEpoch::Current => state.current_epoch_participation_mut(),
        };

        let flags = &mut epoch_participation[index];

        for (flag_index, weight) in PARTICIPATION_FLAG_WEIGHTS {
            let flag = 1 << flag_index;

            if participation_flags & flag != 0 && *flags & flag == 0 {
                *flags |= flag;
                proposer_reward_numerator += base_reward * weight;
            }
        }
    }

    // > Reward proposer
    let proposer_reward_denominator =
        (WEIGHT_DENOMINATOR.get() - PROPOSER_WEIGHT) * WEIGHT_DENOMINATOR.get() / PROPOSER_WEIGHT;
    let proposer_reward = proposer_reward_numerator / proposer_reward_denominator;
    let proposer_index = accessors::get_beacon_proposer_index(state)?;

    mutators::increase_balance(state, proposer_index, proposer_reward)
}

/// [`get_attestation_participation_flag_indices`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#get_attestation_participation_flag_indices)
///
/// Returned as a bitmask over the three flag indices. Source and target
/// matching are already enforced by `validate_attestation`; only the
/// timeliness conditions and head matching are decided here.
fn participation_flag_indices<P: Preset>(
    state: &impl PostAltairBeaconState<P>,
    data: AttestationData,
    inclusion_delay: u64,
) -> Result<ParticipationFlags> {
    let mut flags = 0;

    let matching_head = accessors::get_block_root_at_slot(state, data.slot)
        .map(|root| data.beacon_block_root == root)
        .unwrap_or(false);

    if inclusion_delay <= misc::integer_squareroot(P::SlotsPerEpoch::U64) {
        flags |= 1 << TIMELY_SOURCE_FLAG_INDEX;
    }

    if inclusion_delay <= P::SlotsPerEpoch::U64 {
        flags |= 1 << TIMELY_TARGET_FLAG_INDEX;
    }

    if matching_head && inclusion_delay == P::MIN_ATTESTATION_INCLUSION_DELAY.get() {
        flags |= 1 << TIMELY_HEAD_FLAG_INDEX;
    }

    Ok(flags)
}

/// [`get_base_reward_per_increment`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#get_base_reward_per_increment)
#[must_use]
pub fn base_reward_per_increment<P: Preset>(state: &impl PostAltairBeaconState<P>) -> Gwei {
    P::EFFECTIVE_BALANCE_INCREMENT.get() * P::BASE_REWARD_FACTOR
        / misc::integer_squareroot(accessors::total_active_balance(state).get())
}

/// [`get_base_reward`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#get_base_reward)
pub fn base_reward<P: Preset>(
    state: &impl PostAltairBeaconState<P>,
    validator_index: ValidatorIndex,
    base_reward_per_increment: Gwei,
) -> Result<Gwei> {
    let effective_balance = accessors::effective_balance(state, validator_index)?;
    let increments = effective_balance / P::EFFECTIVE_BALANCE_INCREMENT;
    Ok(increments * base_reward_per_increment)
}

/// [`process_sync_aggregate`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#sync-aggregate-processing)
pub fn process_sync_aggregate<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    sync_aggregate: &SyncAggregate<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    // > Verify sync committee aggregate signature signing over the previous slot block root
    let previous_slot = state.slot().saturating_sub(1);
    let epoch = misc::compute_epoch_at_slot::<P>(previous_slot);
    let fork_version = config.version(config.phase_at_epoch(epoch));

    let domain = misc::compute_domain(
        config,
        DOMAIN_SYNC_COMMITTEE,
        Some(fork_version),
        Some(state.genesis_validators_root()),
    );

    let block_root = accessors::get_block_root_at_slot(state, previous_slot)?;
    let signing_root = misc::compute_signing_root(&block_root, domain);

    let participant_pubkeys = state
        .current_sync_committee()
        .pubkeys
        .iter()
        .zip(0..)
        .filter(|(_, position)| sync_aggregate.sync_committee_bits.get(*position))
        .map(|(pubkey, _)| pubkey.clone())
        .collect::<Vec<_>>();

    // An empty aggregate is only valid with the point-at-infinity signature.
    // `eth_fast_aggregate_verify` special-cases it; the verifiers do not.
    if participant_pubkeys.is_empty() {
        anyhow::ensure!(
            sync_aggregate.sync_committee_signature.is_empty(),
            crate::unphased::Error::SyncAggregateParticipantsInvalid,
        );
    } else {
        verifier.verify_aggregate(
            signing_root,
            sync_aggregate.sync_committee_signature,
            participant_pubkeys.iter(),
            SignatureKind::SyncAggregate,
        )?;
    }

    // > Compute participant and proposer rewards
    let total_active_increments =
        accessors::total_active_balance(state).get() / P::EFFECTIVE_BALANCE_INCREMENT;
    let total_base_rewards = base_reward_per_increment(state) * total_active_increments;
    let max_participant_rewards = total_base_rewards * SYNC_REWARD_WEIGHT
        / WEIGHT_DENOMINATOR
        / P::SlotsPerEpoch::U64;
    let participant_reward = max_participant_rewards / P::SyncCommitteeSize::U64;
    let proposer_reward =
        participant_reward * PROPOSER_WEIGHT / (WEIGHT_DENOMINATOR.get() - PROPOSER_WEIGHT);

    // > Apply participant and proposer rewards
    let committee_indices = sync_committee_validator_indices(state)?;
    let proposer_index = accessors::get_beacon_proposer_index(state)?;

    for (participant_index, position) in izip!(committee_indices, 0..) {
        if sync_aggregate.sync_committee_bits.get(position) {
            mutators::increase_balance(state, participant_index, participant_reward)?;
            mutators::increase_balance(state, proposer_index, proposer_reward)?;
        } else {
            mutators::decrease_balance(state, participant_index, participant_reward)?;
        }
    }

    Ok(())
}

// The sync committee stores public keys. Crediting rewards needs validator
// indices, so this resolves them through the registry.
fn sync_committee_validator_indices<P: Preset>(
    state: &impl PostAltairBeaconState<P>,
) -> Result<Vec<ValidatorIndex>> {
    let index_by_pubkey = state
        .validators()
        .iter()
        .zip(0_u64..)
        .map(|(validator, index)| (validator.pubkey.to_bytes(), index))
        .collect::<HashMap<_, _>>();

    state
        .current_sync_committee()
        .pubkeys
        .iter()
        .map(|pubkey| {
            index_by_pubkey
                .get(&pubkey.to_bytes())
                .copied()
                .ok_or_else(|| {
                    crate::unphased::Error::SyncAggregateParticipantsInvalid.into()
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use ssz::BitList;
    use types::{
        nonstandard::Phase,
        phase0::containers::{AttestationData as AttestationDataForTests, Checkpoint},
        preset::Minimal,
    };

    use crate::fixtures;

    use super::*;

    #[test]
    fn attestations_set_participation_flags_and_reward_the_proposer() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 9);

        let committee = accessors::beacon_committee(&state, 8, 0)
            .expect("the committee can be computed");

        let mut aggregation_bits = BitList::with_length(committee.len());

        for position in 0..committee.len() {
            aggregation_bits.set(position, true);
        }

        let attestation = Attestation::<Minimal> {
            aggregation_bits,
            data: AttestationDataForTests {
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

        let proposer_index = accessors::get_beacon_proposer_index(&state)
            .expect("the proposer can be computed");

        let proposer_balance_before = state.balances[proposer_index as usize];

        process_attestation(&config, &mut state, &attestation, &mut NullVerifier)
            .expect("a timely attestation is valid");

        let all_timely_flags = (1 << TIMELY_SOURCE_FLAG_INDEX)
            | (1 << TIMELY_TARGET_FLAG_INDEX)
            | (1 << TIMELY_HEAD_FLAG_INDEX);

        for validator_index in committee {
            assert_eq!(
                state.current_epoch_participation[validator_index as usize],
                all_timely_flags,
            );
        }

        assert!(state.balances[proposer_index as usize] > proposer_balance_before);
    }

    #[test]
    fn sync_aggregates_reward_participants_and_penalize_absentees() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 1);

        let mut sync_committee_bits = ssz::BitVector::default();

        for position in 0..31 {
            sync_committee_bits.set(position, true);
        }

        let sync_aggregate = SyncAggregate::<Minimal> {
            sync_committee_bits,
            sync_committee_signature: Default::default(),
        };

        let total_before = fixtures::balances(&state).iter().sum::<u64>();

        process_sync_aggregate(&config, &mut state, &sync_aggregate, &mut NullVerifier)
            .expect("the signature is not verified under a null verifier");

        // 31 participants and the proposer gain, one absentee loses;
        // participant rewards dominate.
        assert!(fixtures::balances(&state).iter().sum::<u64>() > total_before);
    }

    #[test]
    fn an_empty_sync_aggregate_requires_the_infinity_signature() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 1);

        process_sync_aggregate(
            &config,
            &mut state,
            &SyncAggregate::empty(),
            &mut NullVerifier,
        )
        .expect("an empty aggregate with the infinity signature is valid");

        let mut forged = SyncAggregate::<Minimal>::empty();
        forged.sync_committee_signature = bls::SignatureBytes::repeat_byte(0x22);

        process_sync_aggregate(&config, &mut state, &forged, &mut NullVerifier)
            .expect_err("an empty aggregate with a real signature is invalid");
    }
}
