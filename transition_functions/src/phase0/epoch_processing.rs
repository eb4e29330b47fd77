use core::num::NonZeroU64;
use std::collections::{HashMap, HashSet};

use anyhow::Result;
use helper_functions::{accessors, misc, mutators, predicates};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::BASE_REWARDS_PER_EPOCH,
        containers::PendingAttestation,
        primitives::{Epoch, Gwei, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::unphased::epoch_processing::{self as unphased, JustificationBalances};

/// Participation digests computed from pending attestations.
///
/// This is the scratch area the rest of epoch processing reads from.
/// It is recomputed from scratch every epoch.
pub struct Statistics {
    pub total_active_balance: NonZeroU64,
    pub previous_source_indices: HashSet<ValidatorIndex>,
    pub previous_target_indices: HashSet<ValidatorIndex>,
    pub previous_head_indices: HashSet<ValidatorIndex>,
    pub current_target_balance: Gwei,
    pub previous_source_balance: Gwei,
    pub previous_target_balance: Gwei,
    pub previous_head_balance: Gwei,
    /// Minimum inclusion delay and the including proposer per attester.
    pub inclusion_info: HashMap<ValidatorIndex, (u64, ValidatorIndex)>,
}

impl Statistics {
    #[must_use]
    pub const fn justification_balances(&self) -> JustificationBalances {
        JustificationBalances {
            total_active: self.total_active_balance,
            previous_epoch_target: self.previous_target_balance,
            current_epoch_target: self.current_target_balance,
        }
    }
}

pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<()> {
    let statistics = statistics(state)?;

    unphased::weigh_justification_and_finalization(state, statistics.justification_balances())?;
    process_rewards_and_penalties(state, &statistics)?;
    unphased::process_registry_updates(config, state)?;
    unphased::process_slashings(state, P::PROPORTIONAL_SLASHING_MULTIPLIER)?;
    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state);
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;
    process_participation_record_updates(state);

    Ok(())
}

pub fn statistics<P: Preset>(state: &BeaconState<P>) -> Result<Statistics> {
    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);
    let total_active_balance = accessors::total_active_balance(state);

    let mut previous_source_indices = HashSet::new();
    let mut previous_target_indices = HashSet::new();
    let mut previous_head_indices = HashSet::new();
    let mut inclusion_info = HashMap::<ValidatorIndex, (u64, ValidatorIndex)>::new();

    let previous_target_root = epoch_boundary_root(state, previous_epoch)?;

    for attestation in &state.previous_epoch_attestations {
        let attesting_indices = attesting_indices(state, attestation)?;

        let matching_target = attestation.data.target.root == previous_target_root;
        let matching_head = matching_target
            && accessors::get_block_root_at_slot(state, attestation.data.slot)
                .map(|root| attestation.data.beacon_block_root == root)
                .unwrap_or(false);

        for validator_index in attesting_indices {
            // All valid pending attestations match the source by construction.
            previous_source_indices.insert(validator_index);

            inclusion_info
                .entry(validator_index)
                .and_modify(|(delay, proposer)| {
                    if attestation.inclusion_delay < *delay {
                        *delay = attestation.inclusion_delay;
                        *proposer = attestation.proposer_index;
                    }
                })
                .or_insert((attestation.inclusion_delay, attestation.proposer_index));

            if matching_target {
                previous_target_indices.insert(validator_index);
            }

            if matching_head {
                previous_head_indices.insert(validator_index);
            }
        }
    }

    let mut current_target_indices = HashSet::new();
    let current_target_root = epoch_boundary_root(state, current_epoch)?;

    for attestation in &state.current_epoch_attestations {
        if attestation.data.target.root != current_target_root {
            continue;
        }

        current_target_indices.extend(attesting_indices(state, attestation)?);
    }

    let unslashed_balance = |indices: &HashSet<ValidatorIndex>| {
        accessors::total_balance(
            state,
            indices.iter().copied().filter(|index| {
                accessors::get_validator(state, *index)
                    .map(|validator| !validator.slashed)
                    .unwrap_or(false)
            }),
        )
        .get()
    };

    Ok(Statistics {
        total_active_balance,
        current_target_balance: unslashed_balance(&current_target_indices),
        previous_source_balance: unslashed_balance(&previous_source_indices),
        previous_target_balance: unslashed_balance(&previous_target_indices),
        previous_head_balance: unslashed_balance(&previous_head_indices),
        previous_source_indices,
        previous_target_indices,
        previous_head_indices,
        inclusion_info,
    })
}

/// [`process_rewards_and_penalties`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#rewards-and-penalties-1)
fn process_rewards_and_penalties<P: Preset>(
    state: &mut BeaconState<P>,
    statistics: &Statistics,
) -> Result<()> {
    let current_epoch = accessors::get_current_epoch(state);

    // > No rewards are applied at the end of `GENESIS_EPOCH`
    // > because rewards are for work done in the previous epoch
    if current_epoch == types::phase0::consts::GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch(state);
    let finality_delay = previous_epoch - state.finalized_checkpoint.epoch;
    let in_inactivity_leak = finality_delay > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY;

    let total_balance = statistics.total_active_balance.get();
    let sqrt_total = misc::integer_squareroot(total_balance);
    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();
    let total_increments = total_balance / increment;

    let mut deltas = vec![(0_u64, 0_u64); state.validators.len()];

    let components = [
        (
            &statistics.previous_source_indices,
            statistics.previous_source_balance,
        ),
        (
            &statistics.previous_target_indices,
            statistics.previous_target_balance,
        ),
        (
            &statistics.previous_head_indices,
            statistics.previous_head_balance,
        ),
    ];

    for (validator, (index, delta)) in state
        .validators
        .iter()
        .zip((0_u64..).zip(deltas.iter_mut()))
    {
        let eligible = predicates::is_active_validator(validator, previous_epoch)
            || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch);

        if !eligible {
            continue;
        }

        let base_reward = validator.effective_balance * P::BASE_REWARD_FACTOR
            / sqrt_total
            / BASE_REWARDS_PER_EPOCH;

        let unslashed = !validator.slashed;

        // > Micro-incentives for matching FFG source, FFG target, and head
        for (attesting_indices, attesting_balance) in components {
            if unslashed && attesting_indices.contains(&index) {
                if in_inactivity_leak {
                    // > Since full base reward will be canceled out by
                    // > inactivity penalty deltas, optimal participation
                    // > receives full base reward compensation here.
                    delta.0 += base_reward;
                } else {
                    let attesting_increments = attesting_balance / increment;
                    delta.0 += base_reward * attesting_increments / total_increments;
                }
            } else {
                delta.1 += base_reward;
            }
        }

        // > Proposer and inclusion delay micro-rewards
        if unslashed {
            if let Some((inclusion_delay, _)) = statistics.inclusion_info.get(&index) {
                let proposer_reward = base_reward / P::PROPOSER_REWARD_QUOTIENT;
                let max_attester_reward = base_reward - proposer_reward;
                delta.0 += max_attester_reward / inclusion_delay;
            }
        }

        // > Inactivity penalty
        if in_inactivity_leak {
            delta.1 += BASE_REWARDS_PER_EPOCH.get() * base_reward
                - base_reward / P::PROPOSER_REWARD_QUOTIENT;

            if !(unslashed && statistics.previous_target_indices.contains(&index)) {
                delta.1 +=
                    validator.effective_balance * finality_delay / P::INACTIVITY_PENALTY_QUOTIENT;
            }
        }
    }

    // Proposer rewards for timely inclusion are credited separately because
    // they go to the proposer, not the attester being iterated above.
    let mut proposer_rewards = vec![];

    for (attester, (_, proposer)) in &statistics.inclusion_info {
        let validator = accessors::get_validator(state, *attester)?;

        if validator.slashed {
            continue;
        }

        let base_reward = validator.effective_balance * P::BASE_REWARD_FACTOR
            / sqrt_total
            / BASE_REWARDS_PER_EPOCH;

        proposer_rewards.push((*proposer, base_reward / P::PROPOSER_REWARD_QUOTIENT));
    }

    for (proposer, reward) in proposer_rewards {
        mutators::increase_balance(state, proposer, reward)?;
    }

    for (index, (reward, penalty)) in deltas.into_iter().enumerate() {
        mutators::increase_balance(state, index as ValidatorIndex, reward)?;
        mutators::decrease_balance(state, index as ValidatorIndex, penalty)?;
    }

    Ok(())
}

/// [`process_participation_record_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#participation-records-rotation)
fn process_participation_record_updates<P: Preset>(state: &mut BeaconState<P>) {
    state.previous_epoch_attestations =
        core::mem::take(&mut state.current_epoch_attestations);
}

fn attesting_indices<P: Preset>(
    state: &BeaconState<P>,
    attestation: &PendingAttestation<P>,
) -> Result<Vec<ValidatorIndex>> {
    let committee =
        accessors::beacon_committee(state, attestation.data.slot, attestation.data.index)?;

    Ok(attestation
        .aggregation_bits
        .set_bits()
        .map(|position| committee[position])
        .collect())
}

fn epoch_boundary_root<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<H256> {
    accessors::get_block_root(state, epoch)
}

#[cfg(test)]
mod tests {
    use ssz::BitList;
    use types::{
        nonstandard::{Phase, RelativeEpoch},
        phase0::containers::Checkpoint,
        preset::{Minimal, Preset},
    };

    use crate::fixtures;

    use super::*;

    fn full_participation_attestations(
        state: &BeaconState<Minimal>,
        epoch: Epoch,
    ) -> Vec<PendingAttestation<Minimal>> {
        let target_root =
            accessors::get_block_root(state, epoch).expect("the target root is in range");

        misc::slots_in_epoch::<Minimal>(epoch)
            .flat_map(|slot| {
                let committees = accessors::committee_count_per_slot(
                    state,
                    if epoch == accessors::get_current_epoch(state) {
                        RelativeEpoch::Current
                    } else {
                        RelativeEpoch::Previous
                    },
                );

                (0..committees).map(move |committee_index| (slot, committee_index))
            })
            .map(|(slot, committee_index)| {
                let committee = accessors::beacon_committee(state, slot, committee_index)
                    .expect("the committee can be computed");

                let mut aggregation_bits = BitList::with_length(committee.len());

                for position in 0..committee.len() {
                    aggregation_bits.set(position, true);
                }

                PendingAttestation {
                    aggregation_bits,
                    data: types::phase0::containers::AttestationData {
                        slot,
                        index: committee_index,
                        beacon_block_root: accessors::get_block_root_at_slot(state, slot)
                            .expect("the slot is in range"),
                        source: state.previous_justified_checkpoint,
                        target: Checkpoint {
                            epoch,
                            root: target_root,
                        },
                    },
                    inclusion_delay: 1,
                    proposer_index: 0,
                }
            })
            .collect()
    }

    #[test]
    fn no_rewards_or_penalties_are_applied_at_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 7);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state).expect("the genesis epoch can be processed");

        assert_eq!(fixtures::balances(&state), balances_before);
    }

    #[test]
    fn missed_attestations_are_penalized_after_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 15);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state).expect("the epoch can be processed");

        // Nobody attested to epoch 0, so every validator loses
        // the source, target and head components.
        for (after, before) in fixtures::balances(&state).iter().zip(balances_before) {
            assert!(*after < before);
        }
    }

    #[test]
    fn full_participation_is_rewarded() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 15);

        for attestation in full_participation_attestations(&state, 0) {
            state
                .previous_epoch_attestations
                .push(attestation)
                .expect("the list is not full");
        }

        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state).expect("the epoch can be processed");

        for (after, before) in fixtures::balances(&state).iter().zip(balances_before) {
            assert!(*after > before);
        }
    }

    #[test]
    fn target_participation_justifies_its_epoch() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 23);

        for attestation in full_participation_attestations(&state, 1) {
            state
                .previous_epoch_attestations
                .push(attestation)
                .expect("the list is not full");
        }

        process_epoch(&config, &mut state).expect("the epoch can be processed");

        assert_eq!(state.current_justified_checkpoint.epoch, 1);
        assert!(state.justification_bits.get(1));
        assert_eq!(state.finalized_checkpoint.epoch, 0);
    }

    #[test]
    fn statistics_count_only_matching_targets() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 15);

        let mut attestations = full_participation_attestations(&state, 0);

        // Divert one attestation to a bogus target.
        attestations[0].data.target.root = types::phase0::primitives::H256::repeat_byte(0xcc);

        let diverted_committee = accessors::beacon_committee(
            &state,
            attestations[0].data.slot,
            attestations[0].data.index,
        )
        .expect("the committee can be computed");

        for attestation in attestations {
            state
                .previous_epoch_attestations
                .push(attestation)
                .expect("the list is not full");
        }

        let statistics = statistics(&state).expect("statistics can be computed");

        let expected_target_balance = (fixtures::VALIDATOR_COUNT
            - diverted_committee.len() as u64)
            * <Minimal as Preset>::MAX_EFFECTIVE_BALANCE;

        assert_eq!(statistics.previous_target_balance, expected_target_balance);
        assert_eq!(
            statistics.previous_source_indices.len() as u64,
            fixtures::VALIDATOR_COUNT,
        );
    }
}
