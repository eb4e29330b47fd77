use core::num::NonZeroU64;

use anyhow::Result;
use helper_functions::{accessors, misc, mutators, predicates};
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_EPOCH,
        containers::{Checkpoint, HistoricalBatch},
        primitives::Gwei,
    },
    preset::Preset,
    traits::BeaconState,
};

/// Target-attestation balances feeding justification, computed differently per fork.
#[derive(Clone, Copy, Debug)]
pub struct JustificationBalances {
    pub total_active: NonZeroU64,
    pub previous_epoch_target: Gwei,
    pub current_epoch_target: Gwei,
}

/// [`weigh_justification_and_finalization`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#justification-and-finalization)
pub fn weigh_justification_and_finalization<P: Preset>(
    state: &mut impl BeaconState<P>,
    balances: JustificationBalances,
) -> Result<()> {
    // > Initial FFG checkpoint values have a `0x00` stub for `root`.
    // > Skip FFG updates in the first two epochs to avoid corner cases
    // > that might result in modifying this stub.
    if accessors::get_current_epoch(state) <= GENESIS_EPOCH + 1 {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);

    let old_previous_justified = state.previous_justified_checkpoint();
    let old_current_justified = state.current_justified_checkpoint();

    // > Process justifications
    *state.previous_justified_checkpoint_mut() = old_current_justified;
    state.justification_bits_mut().shift_up();

    let total = balances.total_active.get();

    if balances.previous_epoch_target * 3 >= total * 2 {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: previous_epoch,
            root: accessors::get_block_root(state, previous_epoch)?,
        };

        state.justification_bits_mut().set(1, true);
    }

    if balances.current_epoch_target * 3 >= total * 2 {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: current_epoch,
            root: accessors::get_block_root(state, current_epoch)?,
        };

        state.justification_bits_mut().set(0, true);
    }

    // > Process finalizations
    let bits = state.justification_bits().clone();
    let bits_set = |mut range: core::ops::Range<usize>| range.all(|index| bits.get(index));

    // > The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if bits_set(1..4) && old_previous_justified.epoch + 3 == current_epoch {
        *state.finalized_checkpoint_mut() = old_previous_justified;
    }

    // > The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if bits_set(1..3) && old_previous_justified.epoch + 2 == current_epoch {
        *state.finalized_checkpoint_mut() = old_previous_justified;
    }

    // > The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if bits_set(0..3) && old_current_justified.epoch + 2 == current_epoch {
        *state.finalized_checkpoint_mut() = old_current_justified;
    }

    // > The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if bits_set(0..2) && old_current_justified.epoch + 1 == current_epoch {
        *state.finalized_checkpoint_mut() = old_current_justified;
    }

    Ok(())
}

/// [`process_registry_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#registry-updates)
pub fn process_registry_updates<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
) -> Result<()> {
    let current_epoch = accessors::get_current_epoch(state);

    // > Process activation eligibility and ejections
    let mut ejections = vec![];

    for (validator, index) in state.validators_mut().iter_mut().zip(0..) {
        if predicates::is_eligible_for_activation_queue::<P>(validator) {
            validator.activation_eligibility_epoch = current_epoch + 1;
        }

        if predicates::is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            ejections.push(index);
        }
    }

    for index in ejections {
        mutators::initiate_validator_exit(config, state, index)?;
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let mut activation_queue = state
        .validators()
        .iter()
        .zip(0_u64..)
        .filter(|(validator, _)| predicates::is_eligible_for_activation(state, validator))
        .map(|(validator, index)| (validator.activation_eligibility_epoch, index))
        .collect::<Vec<_>>();

    // > Order by the sequence of activation_eligibility_epoch setting and then index
    activation_queue.sort_unstable();

    // > Dequeued validators for activation up to churn limit
    let churn_limit = mutators::validator_churn_limit(config, state);
    let activation_epoch = misc::compute_activation_exit_epoch::<P>(current_epoch);

    for (_, index) in activation_queue.into_iter().take(churn_limit.try_into()?) {
        state.validators_mut()[usize::try_from(index)?].activation_epoch = activation_epoch;
    }

    Ok(())
}

/// [`process_slashings`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#slashings)
pub fn process_slashings<P: Preset>(
    state: &mut impl BeaconState<P>,
    proportional_slashing_multiplier: u64,
) -> Result<()> {
    let epoch = accessors::get_current_epoch(state);
    let total_balance = accessors::total_active_balance(state);
    let slashings_sum = state.slashings().iter().sum::<Gwei>();
    let adjusted_total = (slashings_sum * proportional_slashing_multiplier)
        .min(total_balance.get());

    let increment = P::EFFECTIVE_BALANCE_INCREMENT;
    let target_withdrawable_epoch = epoch + P::EpochsPerSlashingsVector::U64 / 2;

    let penalties = state
        .validators()
        .iter()
        .zip(0_u64..)
        .filter(|(validator, _)| {
            validator.slashed && validator.withdrawable_epoch == target_withdrawable_epoch
        })
        .map(|(validator, index)| {
            let penalty_numerator =
                validator.effective_balance / increment * adjusted_total;
            let penalty = penalty_numerator / total_balance * increment.get();
            (index, penalty)
        })
        .collect::<Vec<_>>();

    for (index, penalty) in penalties {
        mutators::decrease_balance(state, index, penalty)?;
    }

    Ok(())
}

/// [`process_eth1_data_reset`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#eth1-data-votes-updates)
pub fn process_eth1_data_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    if next_epoch % P::EpochsPerEth1VotingPeriod::U64 == 0 {
        *state.eth1_data_votes_mut() = Default::default();
    }
}

/// [`process_effective_balance_updates`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#effective-balances-updates)
pub fn process_effective_balance_updates<P: Preset>(state: &mut impl BeaconState<P>) {
    let hysteresis_increment = P::EFFECTIVE_BALANCE_INCREMENT.get() / P::HYSTERESIS_QUOTIENT;
    let downward_threshold = hysteresis_increment * P::HYSTERESIS_DOWNWARD_MULTIPLIER;
    let upward_threshold = hysteresis_increment * P::HYSTERESIS_UPWARD_MULTIPLIER;

    // The trait methods cannot hand out `balances` and `validators_mut` at the same time.
    let balances = state.balances().iter().copied().collect::<Vec<_>>();

    for (validator, balance) in state.validators_mut().iter_mut().zip(balances) {
        let effective = validator.effective_balance;

        if balance + downward_threshold < effective
            || effective + upward_threshold < balance
        {
            validator.effective_balance = balance
                .saturating_sub(balance % P::EFFECTIVE_BALANCE_INCREMENT)
                .min(P::MAX_EFFECTIVE_BALANCE);
        }
    }
}

/// [`process_slashings_reset`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#slashings-balances-updates)
pub fn process_slashings_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let next_epoch = accessors::get_current_epoch(state) + 1;
    *state.slashings_mut().mod_index_mut(next_epoch) = 0;
}

/// [`process_randao_mixes_reset`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#randao-mixes-updates)
pub fn process_randao_mixes_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let current_epoch = accessors::get_current_epoch(state);
    let next_epoch = current_epoch + 1;
    let mix = accessors::get_randao_mix(state, current_epoch);
    *state.randao_mixes_mut().mod_index_mut(next_epoch) = mix;
}

/// [`process_historical_roots_update`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#historical-roots-updates)
pub fn process_historical_roots_update<P: Preset>(
    state: &mut impl BeaconState<P>,
) -> Result<()> {
    let next_epoch = accessors::get_current_epoch(state) + 1;
    let epochs_per_historical_root =
        P::SlotsPerHistoricalRoot::U64 / P::SlotsPerEpoch::U64;

    if next_epoch % epochs_per_historical_root == 0 {
        let historical_batch = HistoricalBatch::<P> {
            block_roots: state.block_roots().clone(),
            state_roots: state.state_roots().clone(),
        };

        state
            .historical_roots_mut()
            .push(historical_batch.hash_tree_root())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use types::{
        nonstandard::Phase,
        phase0::consts::FAR_FUTURE_EPOCH,
        preset::{Minimal, Preset},
    };

    use crate::fixtures;

    use super::*;

    #[test]
    fn a_justified_epoch_followed_by_another_finalizes_the_first() {
        let config = fixtures::config_for(Phase::Phase0);

        // Last slot of epoch 4, with epoch 3 already justified.
        let mut state = fixtures::phase0_state_at(&config, 39);
        state.current_justified_checkpoint = Checkpoint {
            epoch: 3,
            root: accessors::get_block_root(&state, 3).expect("the root is in range"),
        };
        state.justification_bits.set(0, true);

        let total_active = accessors::total_active_balance(&state);

        weigh_justification_and_finalization(
            &mut state,
            JustificationBalances {
                total_active,
                previous_epoch_target: 0,
                current_epoch_target: total_active.get(),
            },
        )
        .expect("justification can be weighed");

        assert_eq!(state.previous_justified_checkpoint.epoch, 3);
        assert_eq!(state.current_justified_checkpoint.epoch, 4);
        assert!(state.justification_bits.get(0));
        assert!(state.justification_bits.get(1));
        assert_eq!(state.finalized_checkpoint.epoch, 3);
    }

    #[test]
    fn insufficient_target_weight_justifies_nothing() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 39);

        let total_active = accessors::total_active_balance(&state);

        weigh_justification_and_finalization(
            &mut state,
            JustificationBalances {
                total_active,
                previous_epoch_target: total_active.get() / 2,
                current_epoch_target: total_active.get() / 2,
            },
        )
        .expect("justification can be weighed");

        assert_eq!(state.current_justified_checkpoint, Checkpoint::default());
        assert_eq!(state.finalized_checkpoint, Checkpoint::default());
        assert!(!state.justification_bits.any());
    }

    #[test]
    fn registry_updates_queue_activations_and_eject_poor_validators() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 7);

        // A fresh deposit waiting to become eligible.
        state.validators[0].activation_eligibility_epoch = FAR_FUTURE_EPOCH;
        state.validators[0].activation_epoch = FAR_FUTURE_EPOCH;

        // An active validator that leaked down to the ejection balance.
        state.validators[1].effective_balance = config.ejection_balance;

        // An eligible validator waiting in the activation queue.
        state.validators[2].activation_epoch = FAR_FUTURE_EPOCH;

        process_registry_updates(&config, &mut state)
            .expect("registry updates can be processed");

        let current_epoch = accessors::get_current_epoch(&state);

        assert_eq!(
            state.validators[0].activation_eligibility_epoch,
            current_epoch + 1,
        );
        assert_ne!(state.validators[1].exit_epoch, FAR_FUTURE_EPOCH);
        assert_eq!(
            state.validators[2].activation_epoch,
            misc::compute_activation_exit_epoch::<Minimal>(current_epoch),
        );
    }

    #[test]
    fn slashed_validators_are_penalized_at_the_halfway_point() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 7);

        let max_effective = <Minimal as Preset>::MAX_EFFECTIVE_BALANCE;
        let halfway = <Minimal as Preset>::EpochsPerSlashingsVector::U64 / 2;

        state.validators[3].slashed = true;
        state.validators[3].withdrawable_epoch = halfway;
        *state.slashings.mod_index_mut(0) = max_effective;

        process_slashings(&mut state, 1).expect("slashings can be processed");

        // penalty = effective / increment * min(sum, total) / total * increment
        let total = fixtures::VALIDATOR_COUNT * max_effective;
        let increment = <Minimal as Preset>::EFFECTIVE_BALANCE_INCREMENT.get();
        let expected_penalty = max_effective / increment * max_effective / total * increment;

        assert_eq!(
            state.balances[3],
            max_effective - expected_penalty,
        );
        assert_eq!(state.balances[0], max_effective);
    }

    #[test]
    fn effective_balances_move_only_past_the_hysteresis_thresholds() {
        let config = fixtures::config_for(Phase::Phase0);
        let mut state = fixtures::phase0_state_at(&config, 7);

        let max_effective = <Minimal as Preset>::MAX_EFFECTIVE_BALANCE;
        let increment = <Minimal as Preset>::EFFECTIVE_BALANCE_INCREMENT.get();

        // Well below the downward threshold.
        state.balances[0] = max_effective - increment;
        // Within the hysteresis band.
        state.balances[1] = max_effective - increment / 8;

        process_effective_balance_updates(&mut state);

        assert_eq!(state.validators[0].effective_balance, max_effective - increment);
        assert_eq!(state.validators[1].effective_balance, max_effective);
    }

    #[test]
    fn historical_roots_are_appended_once_per_historical_period() {
        let config = fixtures::config_for(Phase::Phase0);

        // 8 epochs per historical period on the minimal preset.
        let mut state = fixtures::phase0_state_at(&config, 63);

        assert!(state.historical_roots.is_empty());

        process_historical_roots_update(&mut state)
            .expect("the historical batch can be appended");

        assert_eq!(state.historical_roots.len(), 1);
    }
}
