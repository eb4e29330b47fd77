use core::num::NonZeroU64;

use anyhow::Result;
use helper_functions::{accessors, predicates};
use ssz::Hc;
use types::{
    altair::consts::{
        PARTICIPATION_FLAG_WEIGHTS, TIMELY_TARGET_FLAG_INDEX, WEIGHT_DENOMINATOR,
    },
    config::Config,
    phase0::{
        consts::GENESIS_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::PostAltairBeaconState,
};

use crate::{
    altair::block_processing::base_reward_per_increment,
    unphased::epoch_processing::{self as unphased, JustificationBalances},
};

/// The penalty parameters Bellatrix adjusts without changing the algorithms.
#[derive(Clone, Copy)]
pub struct PenaltyParams {
    pub inactivity_penalty_quotient: NonZeroU64,
    pub proportional_slashing_multiplier: u64,
}

impl PenaltyParams {
    #[must_use]
    pub const fn altair<P: Preset>() -> Self {
        Self {
            inactivity_penalty_quotient: P::INACTIVITY_PENALTY_QUOTIENT_ALTAIR,
            proportional_slashing_multiplier: P::PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR,
        }
    }

    #[must_use]
    pub const fn bellatrix<P: Preset>() -> Self {
        Self {
            inactivity_penalty_quotient: P::INACTIVITY_PENALTY_QUOTIENT_BELLATRIX,
            proportional_slashing_multiplier: P::PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX,
        }
    }
}

pub fn process_epoch<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    params: PenaltyParams,
) -> Result<()> {
    let justification_balances = justification_balances(state)?;

    unphased::weigh_justification_and_finalization(state, justification_balances)?;
    process_inactivity_updates(config, state)?;
    process_rewards_and_penalties(config, state, params)?;
    unphased::process_registry_updates(config, state)?;
    unphased::process_slashings(state, params.proportional_slashing_multiplier)?;
    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state);
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;
    process_participation_flag_updates(state)?;
    process_sync_committee_updates(state)?;

    Ok(())
}

/// Sums the effective balances of unslashed timely-target participants
/// of both epochs, the inputs to justification.
fn justification_balances<P: Preset>(
    state: &impl PostAltairBeaconState<P>,
) -> Result<JustificationBalances> {
    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);

    let previous_epoch_target = unslashed_participating_balance(
        state,
        TIMELY_TARGET_FLAG_INDEX,
        previous_epoch,
    );

    let current_epoch_target = unslashed_participating_balance(
        state,
        TIMELY_TARGET_FLAG_INDEX,
        current_epoch,
    );

    Ok(JustificationBalances {
        total_active: accessors::total_active_balance(state),
        previous_epoch_target,
        current_epoch_target,
    })
}

/// [`get_unslashed_participating_indices`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#get_unslashed_participating_indices)
/// summed directly into a balance.
fn unslashed_participating_balance<P: Preset>(
    state: &impl PostAltairBeaconState<P>,
    flag_index: usize,
    epoch: types::phase0::primitives::Epoch,
) -> Gwei {
    let participation = if epoch == accessors::get_current_epoch(state) {
        state.current_epoch_participation()
    } else {
        state.previous_epoch_participation()
    };

    let flag = 1 << flag_index;

    let sum = state
        .validators()
        .iter()
        .zip(participation.iter())
        .filter(|(validator, flags)| {
            !validator.slashed
                && predicates::is_active_validator(validator, epoch)
                && **flags & flag != 0
        })
        .map(|(validator, _)| validator.effective_balance)
        .sum::<Gwei>();

    sum.max(P::EFFECTIVE_BALANCE_INCREMENT.get())
}

/// [`process_inactivity_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#inactivity-scores)
fn process_inactivity_updates<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
) -> Result<()> {
    // > Skip the genesis epoch as score updates are based on the previous epoch participation
    if accessors::get_current_epoch(state) == GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch(state);
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let target_flag = 1 << TIMELY_TARGET_FLAG_INDEX;

    let eligible_and_participating = state
        .validators()
        .iter()
        .zip(state.previous_epoch_participation().iter())
        .map(|(validator, flags)| {
            let eligible = predicates::is_active_validator(validator, previous_epoch)
                || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch);
            let participating = !validator.slashed && *flags & target_flag != 0;
            (eligible, participating)
        })
        .collect::<Vec<_>>();

    for ((eligible, participating), score) in eligible_and_participating
        .into_iter()
        .zip(state.inactivity_scores_mut().iter_mut())
    {
        if !eligible {
            continue;
        }

        // > Increase the inactivity score of inactive validators
        if participating {
            *score -= (*score).min(1);
        } else {
            *score += config.inactivity_score_bias.get();
        }

        // > Decrease the inactivity score of all eligible validators during a leak-free epoch
        if !in_inactivity_leak {
            *score -= (*score).min(config.inactivity_score_recovery_rate);
        }
    }

    Ok(())
}

/// [`process_rewards_and_penalties`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#rewards-and-penalties)
fn process_rewards_and_penalties<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    params: PenaltyParams,
) -> Result<()> {
    if accessors::get_current_epoch(state) == GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch(state);
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();
    let total_active = accessors::total_active_balance(state).get();
    let total_active_increments = total_active / increment;
    let reward_per_increment = base_reward_per_increment(state);

    let participating_increments_per_flag = PARTICIPATION_FLAG_WEIGHTS
        .map(|(flag_index, _)| {
            unslashed_participating_balance(state, flag_index, previous_epoch) / increment
        });

    // Inactivity scores are read alongside mutation of balances,
    // so everything is precomputed into deltas first.
    let mut deltas = vec![(0_u64, 0_u64); state.validators().len()];

    for (((validator, flags), score), delta) in state
        .validators()
        .iter()
        .zip(state.previous_epoch_participation().iter())
        .zip(state.inactivity_scores().iter())
        .zip(deltas.iter_mut())
    {
        let eligible = predicates::is_active_validator(validator, previous_epoch)
            || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch);

        if !eligible {
            continue;
        }

        let base_reward = validator.effective_balance / increment * reward_per_increment;
        let unslashed = !validator.slashed;

        for ((flag_index, weight), participating_increments) in
            PARTICIPATION_FLAG_WEIGHTS.into_iter().zip(participating_increments_per_flag)
        {
            let flag = 1 << flag_index;
            let participating = unslashed && *flags & flag != 0;

            if participating {
                if !in_inactivity_leak {
                    let reward_numerator =
                        base_reward * weight * participating_increments;
                    delta.0 +=
                        reward_numerator / (total_active_increments * WEIGHT_DENOMINATOR.get());
                }
            } else if flag_index != types::altair::consts::TIMELY_HEAD_FLAG_INDEX {
                delta.1 += base_reward * weight / WEIGHT_DENOMINATOR;
            }
        }

        // > Inactivity penalties
        let target_flag = 1 << TIMELY_TARGET_FLAG_INDEX;

        if !(unslashed && *flags & target_flag != 0) {
            let penalty_numerator = validator.effective_balance * *score;
            let penalty_denominator =
                config.inactivity_score_bias.get() * params.inactivity_penalty_quotient.get();
            delta.1 += penalty_numerator / penalty_denominator;
        }
    }

    for (index, (reward, penalty)) in deltas.into_iter().enumerate() {
        let index = index as ValidatorIndex;
        helper_functions::mutators::increase_balance(state, index, reward)?;
        helper_functions::mutators::decrease_balance(state, index, penalty)?;
    }

    Ok(())
}

/// [`process_participation_flag_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#participation-flags-updates)
fn process_participation_flag_updates<P: Preset>(
    state: &mut impl PostAltairBeaconState<P>,
) -> Result<()> {
    let current = core::mem::take(state.current_epoch_participation_mut());
    *state.previous_epoch_participation_mut() = current;

    let validator_count = state.validators().len();

    *state.current_epoch_participation_mut() = Hc::from(
        ssz::ContiguousList::try_from(vec![0; validator_count])?,
    );

    Ok(())
}

/// [`process_sync_committee_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#sync-committee-updates)
fn process_sync_committee_updates<P: Preset>(
    state: &mut impl PostAltairBeaconState<P>,
) -> Result<()> {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    if next_epoch % P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD == 0 {
        let next = accessors::get_next_sync_committee(state)?;
        let current = core::mem::take(state.next_sync_committee_mut());

        *state.current_sync_committee_mut() = current;
        *state.next_sync_committee_mut() = std::sync::Arc::new(Hc::from(next));
    }

    Ok(())
}

/// [`is_in_inactivity_leak`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_in_inactivity_leak)
fn is_in_inactivity_leak<P: Preset>(state: &impl PostAltairBeaconState<P>) -> bool {
    let previous_epoch = accessors::get_previous_epoch(state);
    let finality_delay = previous_epoch - state.finalized_checkpoint().epoch;
    finality_delay > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY
}

#[cfg(test)]
mod tests {
    use types::{
        altair::consts::{TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX},
        nonstandard::Phase,
        preset::Minimal,
    };

    use crate::fixtures;

    use super::*;

    #[test]
    fn no_rewards_or_penalties_are_applied_at_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 7);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the genesis epoch can be processed");

        assert_eq!(fixtures::balances(&state), balances_before);
    }

    #[test]
    fn missing_participation_is_penalized_after_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 15);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the epoch can be processed");

        for (after, before) in fixtures::balances(&state).iter().zip(balances_before) {
            assert!(*after < before);
        }

        // Outside an inactivity leak the recovery rate cancels the bias,
        // so the scores stay at zero.
        assert!(state.inactivity_scores.iter().all(|score| *score == 0));
    }

    #[test]
    fn timely_source_and_target_participation_is_rewarded() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 15);

        let flags = (1 << TIMELY_SOURCE_FLAG_INDEX) | (1 << TIMELY_TARGET_FLAG_INDEX);

        for participation in state.previous_epoch_participation.iter_mut() {
            *participation = flags;
        }

        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the epoch can be processed");

        for (after, before) in fixtures::balances(&state).iter().zip(balances_before) {
            assert!(*after > before);
        }
    }

    #[test]
    fn full_target_participation_justifies_the_previous_epoch() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 23);

        for participation in state.previous_epoch_participation.iter_mut() {
            *participation = 1 << TIMELY_TARGET_FLAG_INDEX;
        }

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the epoch can be processed");

        assert_eq!(state.current_justified_checkpoint.epoch, 1);
        assert!(state.justification_bits.get(1));
    }

    #[test]
    fn participation_flags_rotate_every_epoch() {
        let config = fixtures::config_for(Phase::Altair);
        let mut state = fixtures::altair_state_at(&config, 15);

        for participation in state.current_epoch_participation.iter_mut() {
            *participation = 1 << TIMELY_TARGET_FLAG_INDEX;
        }

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the epoch can be processed");

        assert!(state
            .previous_epoch_participation
            .iter()
            .all(|flags| *flags == 1 << TIMELY_TARGET_FLAG_INDEX));

        assert!(state
            .current_epoch_participation
            .iter()
            .all(|flags| *flags == 0));
    }

    #[test]
    fn sync_committees_rotate_at_the_period_boundary() {
        let config = fixtures::config_for(Phase::Altair);

        // 8 epochs per sync committee period on the minimal preset.
        let mut state = fixtures::altair_state_at(&config, 63);

        let next_before = state.next_sync_committee.clone();

        process_epoch(&config, &mut state, PenaltyParams::altair::<Minimal>())
            .expect("the epoch can be processed");

        // The old next committee is moved, not recomputed.
        assert!(std::sync::Arc::ptr_eq(
            &state.current_sync_committee,
            &next_before,
        ));

        assert_eq!(state.next_sync_committee.pubkeys.len(), 32);
    }
}
