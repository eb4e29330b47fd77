use core::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{ensure, Result};
use bls::CachedPublicKey;
use typenum::Unsigned as _;
use types::{
    altair::{consts::DOMAIN_SYNC_COMMITTEE, containers::SyncCommittee},
    cache::Cache,
    nonstandard::RelativeEpoch,
    phase0::{
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, GENESIS_EPOCH},
        containers::{Attestation, IndexedAttestation, Validator},
        primitives::{DomainType, Epoch, Gwei, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &impl BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot())
}

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &impl BeaconState<P>) -> Epoch {
    get_current_epoch(state)
        .checked_sub(1)
        .unwrap_or(GENESIS_EPOCH)
}

pub fn relative_epoch<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
) -> Result<RelativeEpoch> {
    let current_epoch = get_current_epoch(state);

    if epoch == current_epoch {
        Ok(RelativeEpoch::Current)
    } else if epoch + 1 == current_epoch {
        Ok(RelativeEpoch::Previous)
    } else if epoch == current_epoch + 1 {
        Ok(RelativeEpoch::Next)
    } else {
        anyhow::bail!("epoch {epoch} is not adjacent to the current epoch {current_epoch}")
    }
}

fn epoch_at_relative<P: Preset>(state: &impl BeaconState<P>, relative: RelativeEpoch) -> Epoch {
    let current_epoch = get_current_epoch(state);

    match relative {
        RelativeEpoch::Previous => current_epoch.saturating_sub(1),
        RelativeEpoch::Current => current_epoch,
        RelativeEpoch::Next => current_epoch + 1,
    }
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &impl BeaconState<P>, epoch: Epoch) -> H256 {
    *state.randao_mixes().mod_index(epoch)
}

pub fn get_block_root<P: Preset>(state: &impl BeaconState<P>, epoch: Epoch) -> Result<H256> {
    get_block_root_at_slot(state, misc::compute_start_slot_at_epoch::<P>(epoch))
}

pub fn get_block_root_at_slot<P: Preset>(
    state: &impl BeaconState<P>,
    slot: Slot,
) -> Result<H256> {
    ensure!(
        slot < state.slot() && state.slot() <= slot + P::SlotsPerHistoricalRoot::U64,
        Error::SlotOutOfRange { slot },
    );

    Ok(*state.block_roots().mod_index(slot))
}

#[must_use]
pub fn get_seed<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
    domain_type: DomainType,
) -> H256 {
    let lookahead_mix = get_randao_mix(
        state,
        epoch + P::EpochsPerHistoricalVector::U64 - P::MIN_SEED_LOOKAHEAD - 1,
    );

    hashing::hash_32_64_256(domain_type.to_fixed_bytes(), epoch, lookahead_mix)
}

pub fn get_validator<P: Preset>(
    state: &impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&Validator> {
    let index = usize::try_from(validator_index)?;

    state
        .validators()
        .get(index)
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

pub fn public_key<P: Preset>(
    state: &impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&CachedPublicKey> {
    get_validator(state, validator_index).map(|validator| &validator.pubkey)
}

pub fn effective_balance<P: Preset>(
    state: &impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<Gwei> {
    get_validator(state, validator_index).map(|validator| validator.effective_balance)
}

/// The immutable columns of the validator registry, in index order.
///
/// This is what databases persist separately from the mutable balances:
/// the decompressed public key and the withdrawal credentials never change.
pub fn immutable_validator_data<P: Preset>(
    state: &impl BeaconState<P>,
) -> impl Iterator<Item = Result<(bls::PublicKey, H256)>> + '_ {
    state.validators().iter().map(|validator| {
        let public_key = validator.pubkey.decompress()?;
        Ok((public_key, validator.withdrawal_credentials))
    })
}

/// Active validator indices in validator-registry order, cached per relative epoch.
#[must_use]
pub fn active_validator_indices_ordered<P: Preset>(
    state: &impl BeaconState<P>,
    relative: RelativeEpoch,
) -> Arc<[ValidatorIndex]> {
    let epoch = epoch_at_relative(state, relative);

    state.cache().active_validator_indices_ordered[Cache::index(relative)]
        .get_or_init(|| {
            state
                .validators()
                .iter()
                .zip(0..)
                .filter(|(validator, _)| predicates::is_active_validator(validator, epoch))
                .map(|(_, index)| index)
                .collect()
        })
        .clone()
}

/// Active validator indices shuffled for committee assignment, cached per relative epoch.
#[must_use]
pub fn active_validator_indices_shuffled<P: Preset>(
    state: &impl BeaconState<P>,
    relative: RelativeEpoch,
) -> Arc<[ValidatorIndex]> {
    let epoch = epoch_at_relative(state, relative);

    state.cache().active_validator_indices_shuffled[Cache::index(relative)]
        .get_or_init(|| {
            let seed = get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);
            let mut indices = active_validator_indices_ordered(state, relative).to_vec();
            shuffling::shuffle_slice::<P, _>(&mut indices, seed);
            indices.into()
        })
        .clone()
}

/// The sum of effective balances of all active validators, never zero.
///
/// [`get_total_active_balance`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_total_active_balance)
#[must_use]
pub fn total_active_balance<P: Preset>(state: &impl BeaconState<P>) -> NonZeroU64 {
    *state.cache().total_active_balance[Cache::index(RelativeEpoch::Current)].get_or_init(|| {
        let indices = active_validator_indices_ordered(state, RelativeEpoch::Current);
        total_balance(state, indices.iter().copied())
    })
}

/// [`get_total_balance`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_total_balance)
#[must_use]
pub fn total_balance<P: Preset>(
    state: &impl BeaconState<P>,
    validator_indices: impl IntoIterator<Item = ValidatorIndex>,
) -> NonZeroU64 {
    let sum = validator_indices
        .into_iter()
        .filter_map(|validator_index| effective_balance(state, validator_index).ok())
        .sum();

    NonZeroU64::new(sum).unwrap_or(P::EFFECTIVE_BALANCE_INCREMENT)
}

#[must_use]
pub fn committee_count_per_slot<P: Preset>(
    state: &impl BeaconState<P>,
    relative: RelativeEpoch,
) -> u64 {
    let active = active_validator_indices_ordered(state, relative).len() as u64;
    misc::committees_per_slot::<P>(active)
}

/// [`get_beacon_committee`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_beacon_committee)
pub fn beacon_committee<P: Preset>(
    state: &impl BeaconState<P>,
    slot: Slot,
    committee_index: u64,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);
    let relative = relative_epoch(state, epoch)?;
    let shuffled = active_validator_indices_shuffled(state, relative);
    let committees_per_slot = misc::committees_per_slot::<P>(shuffled.len() as u64);

    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
            committees_per_slot,
        },
    );

    let committees_in_epoch = committees_per_slot * P::SlotsPerEpoch::U64;
    let index_in_epoch =
        misc::slots_since_epoch_start::<P>(slot) * committees_per_slot + committee_index;

    let total = shuffled.len() as u64;
    let start = usize::try_from(total * index_in_epoch / committees_in_epoch)?;
    let end = usize::try_from(total * (index_in_epoch + 1) / committees_in_epoch)?;

    ensure!(
        start < end,
        Error::CommitteeEmpty {
            slot,
            index: committee_index,
        },
    );

    Ok(shuffled[start..end].to_vec())
}

/// [`get_beacon_proposer_index`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_beacon_proposer_index)
pub fn get_beacon_proposer_index<P: Preset>(
    state: &impl BeaconState<P>,
) -> Result<ValidatorIndex> {
    state
        .cache()
        .proposer_index
        .get_or_try_init(|| {
            let epoch = get_current_epoch(state);
            let epoch_seed = get_seed(state, epoch, DOMAIN_BEACON_PROPOSER);
            let seed = hashing::hash_256_64(epoch_seed, state.slot());
            let indices = active_validator_indices_ordered(state, RelativeEpoch::Current);

            misc::compute_proposer_index::<P, _>(
                |validator_index| effective_balance(state, validator_index),
                &indices,
                seed,
            )
        })
        .copied()
}

/// [`get_indexed_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_indexed_attestation)
pub fn get_indexed_attestation<P: Preset>(
    state: &impl BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<IndexedAttestation<P>> {
    let mut attesting_indices = get_attesting_indices(state, attestation)?;
    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices: attesting_indices.try_into()?,
        data: attestation.data,
        signature: attestation.signature,
    })
}

/// [`get_attesting_indices`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#get_attesting_indices)
pub fn get_attesting_indices<P: Preset>(
    state: &impl BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<Vec<ValidatorIndex>> {
    let committee = beacon_committee(state, attestation.data.slot, attestation.data.index)?;

    ensure!(
        attestation.aggregation_bits.len() == committee.len(),
        Error::AggregationBitlistLengthMismatch {
            bitlist_length: attestation.aggregation_bits.len(),
            committee_length: committee.len(),
        },
    );

    Ok(attestation
        .aggregation_bits
        .set_bits()
        .map(|position| committee[position])
        .collect())
}

/// [`get_next_sync_committee`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/beacon-chain.md#get_next_sync_committee)
pub fn get_next_sync_committee<P: Preset>(
    state: &impl BeaconState<P>,
) -> Result<SyncCommittee<P>> {
    let indices = get_next_sync_committee_indices(state)?;

    let pubkeys = indices
        .iter()
        .map(|validator_index| public_key(state, *validator_index).cloned())
        .collect::<Result<Vec<_>>>()?;

    let aggregate_pubkey = bls::PublicKey::aggregate_nonempty(
        pubkeys
            .iter()
            .map(CachedPublicKey::decompress)
            .collect::<Result<Vec<_>, _>>()?,
    )?;

    Ok(SyncCommittee {
        pubkeys: Box::new(pubkeys.try_into()?),
        aggregate_pubkey: aggregate_pubkey.into(),
    })
}

fn get_next_sync_committee_indices<P: Preset>(
    state: &impl BeaconState<P>,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = get_current_epoch(state) + 1;
    let seed = get_seed(state, epoch, DOMAIN_SYNC_COMMITTEE);

    let indices = active_validator_indices_at_epoch(state, epoch);
    let total = NonZeroU64::new(indices.len() as u64).ok_or(Error::NoActiveValidators)?;
    let max_random_byte = u64::from(u8::MAX);

    let mut sync_committee_indices = Vec::with_capacity(P::SyncCommitteeSize::USIZE);
    let mut attempt = 0_u64;

    while sync_committee_indices.len() < P::SyncCommitteeSize::USIZE {
        let shuffled_index = shuffling::shuffle_single::<P>(attempt % total, total, seed);
        let candidate = indices[usize::try_from(shuffled_index)?];

        let random_byte_index = (attempt % 32) as usize;
        let random_byte =
            u64::from(hashing::hash_256_64(seed, attempt / 32).as_bytes()[random_byte_index]);

        if effective_balance(state, candidate)? * max_random_byte
            >= P::MAX_EFFECTIVE_BALANCE * random_byte
        {
            sync_committee_indices.push(candidate);
        }

        attempt += 1;
    }

    Ok(sync_committee_indices)
}

// Sync committees look one epoch ahead, which does not always fall on a cached
// relative epoch, so this computes the set directly.
fn active_validator_indices_at_epoch<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
) -> Vec<ValidatorIndex> {
    state
        .validators()
        .iter()
        .zip(0..)
        .filter(|(validator, _)| predicates::is_active_validator(validator, epoch))
        .map(|(_, index)| index)
        .collect()
}
