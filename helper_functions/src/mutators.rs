use anyhow::Result;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::{accessors, error::Error, misc};

pub fn increase_balance<P: Preset>(
    state: &mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
    delta: Gwei,
) -> Result<()> {
    let balance = balance_mut(state, validator_index)?;
    *balance += delta;
    Ok(())
}

pub fn decrease_balance<P: Preset>(
    state: &mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
    delta: Gwei,
) -> Result<()> {
    let balance = balance_mut(state, validator_index)?;
    *balance = balance.saturating_sub(delta);
    Ok(())
}

fn balance_mut<P: Preset>(
    state: &mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&mut Gwei> {
    let index = usize::try_from(validator_index)?;

    state
        .balances_mut()
        .get_mut(index)
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

/// [`initiate_validator_exit`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#initiate_validator_exit)
pub fn initiate_validator_exit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<()> {
    if accessors::get_validator(state, validator_index)?.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    // > Compute exit queue epoch
    let mut exit_queue_epoch = state
        .validators()
        .iter()
        .map(|validator| validator.exit_epoch)
        .filter(|exit_epoch| *exit_epoch != FAR_FUTURE_EPOCH)
        .max()
        .unwrap_or_default()
        .max(misc::compute_activation_exit_epoch::<P>(
            accessors::get_current_epoch(state),
        ));

    let exit_queue_churn = state
        .validators()
        .iter()
        .filter(|validator| validator.exit_epoch == exit_queue_epoch)
        .count() as u64;

    if exit_queue_churn >= validator_churn_limit(config, state) {
        exit_queue_epoch += 1;
    }

    // > Set validator exit epoch and withdrawable epoch
    let withdrawable_epoch = exit_queue_epoch + config.min_validator_withdrawability_delay;

    let index = usize::try_from(validator_index)?;
    let validator = &mut state.validators_mut()[index];

    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = withdrawable_epoch;

    Ok(())
}

/// [`get_validator_churn_limit`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_validator_churn_limit)
#[must_use]
pub fn validator_churn_limit<P: Preset>(config: &Config, state: &impl BeaconState<P>) -> u64 {
    let active = accessors::active_validator_indices_ordered(
        state,
        types::nonstandard::RelativeEpoch::Current,
    )
    .len() as u64;

    config
        .min_per_epoch_churn_limit
        .max(active / config.churn_limit_quotient)
}

/// [`slash_validator`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#slash_validator)
///
/// The slashing penalty quotient and the proposer's share of the whistleblower
/// reward differ per fork, so callers pass both in.
pub fn slash_validator<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
    min_slashing_penalty_quotient: core::num::NonZeroU64,
    compute_proposer_reward: impl FnOnce(Gwei) -> Gwei,
) -> Result<()> {
    let epoch = accessors::get_current_epoch(state);

    initiate_validator_exit(config, state, slashed_index)?;

    let index = usize::try_from(slashed_index)?;
    let validator = &mut state.validators_mut()[index];

    validator.slashed = true;
    validator.withdrawable_epoch = validator
        .withdrawable_epoch
        .max(epoch + P::EpochsPerSlashingsVector::U64);

    let slashed_balance = validator.effective_balance;

    *state.slashings_mut().mod_index_mut(epoch) += slashed_balance;

    decrease_balance(
        state,
        slashed_index,
        slashed_balance / min_slashing_penalty_quotient,
    )?;

    // > Apply proposer and whistleblower rewards
    let proposer_index = accessors::get_beacon_proposer_index(state)?;
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = slashed_balance / P::WHISTLEBLOWER_REWARD_QUOTIENT;
    let proposer_reward = compute_proposer_reward(whistleblower_reward);

    increase_balance(state, proposer_index, proposer_reward)?;
    increase_balance(state, whistleblower_index, whistleblower_reward - proposer_reward)?;

    Ok(())
}
