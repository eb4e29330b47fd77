use core::num::NonZeroU64;

use anyhow::Result;
use ssz::SszHash;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        containers::{ForkData, SigningData},
        primitives::{
            Domain, DomainType, Epoch, ForkDigest, Gwei, Slot, UnixSeconds, ValidatorIndex,
            Version, H256,
        },
    },
    preset::Preset,
};

use crate::error::Error;

#[must_use]
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(<P::SlotsPerEpoch as typenum::Unsigned>::U64)
}

#[must_use]
pub fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

#[must_use]
pub fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot - compute_start_slot_at_epoch::<P>(compute_epoch_at_slot::<P>(slot))
}

#[must_use]
pub const fn slots_in_epoch<P: Preset>(epoch: Epoch) -> core::ops::Range<Slot> {
    compute_start_slot_at_epoch::<P>(epoch)..compute_start_slot_at_epoch::<P>(epoch + 1)
}

#[must_use]
pub const fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch + 1 + P::MAX_SEED_LOOKAHEAD
}

#[must_use]
pub fn compute_timestamp_at_slot<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    slot: Slot,
) -> UnixSeconds {
    genesis_time + (slot - GENESIS_SLOT) * config.seconds_per_slot.get()
}

/// [`sync_committee_period`](https://github.com/ethereum/consensus-specs/blob/5a4e568d2dc4cae6c470e0acbe4e48b01351500f/specs/altair/validator.md#sync-committee)
#[must_use]
pub fn sync_committee_period<P: Preset>(epoch: Epoch) -> u64 {
    epoch / P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD
}

// > Return the 32-byte fork data root for the ``current_version`` and ``genesis_validators_root``.
// > This is used primarily in signature domains to avoid collisions across forks/chains.
#[must_use]
pub fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

// > Return the 4-byte fork digest for the ``current_version`` and ``genesis_validators_root``.
#[must_use]
pub fn compute_fork_digest(current_version: Version, genesis_validators_root: H256) -> ForkDigest {
    let root = compute_fork_data_root(current_version, genesis_validators_root);
    ForkDigest::from_slice(&root[..ForkDigest::len_bytes()])
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> Domain {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

#[must_use]
pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

/// The withdrawal credentials of a validator with a BLS withdrawal key.
#[must_use]
pub fn bls_withdrawal_credentials(pubkey: bls::PublicKeyBytes) -> H256 {
    let mut credentials = hashing::hash_bytes(pubkey.as_bytes());
    credentials[..types::phase0::consts::BLS_WITHDRAWAL_PREFIX.len()]
        .copy_from_slice(types::phase0::consts::BLS_WITHDRAWAL_PREFIX);
    credentials
}

/// [`integer_squareroot`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#integer_squareroot)
#[must_use]
pub fn integer_squareroot(n: u64) -> u64 {
    let mut x = n;
    let mut y = x.div_ceil(2);

    while y < x {
        x = y;
        y = (x + n / x.max(1)) / 2;
    }

    x
}

#[must_use]
pub fn committees_per_slot<P: Preset>(active_validator_count: u64) -> u64 {
    (active_validator_count / P::SlotsPerEpoch::U64 / P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT.get())
}

/// [`compute_proposer_index`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#compute_proposer_index)
///
/// Effective-balance-weighted rejection sampling over the shuffled active set.
pub fn compute_proposer_index<P: Preset, F: Fn(ValidatorIndex) -> Result<Gwei>>(
    effective_balance: F,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex> {
    let total = NonZeroU64::new(indices.len() as u64).ok_or(Error::NoActiveValidators)?;
    let max_random_byte = u64::from(u8::MAX);

    for attempt in 0.. {
        let shuffled_index = shuffling::shuffle_single::<P>(attempt % total, total, seed);

        let candidate = indices[usize::try_from(shuffled_index)
            .expect("shuffle_single returns a value less than indices.len()")];

        let random_byte_index = (attempt % 32) as usize;
        let random_byte = u64::from(
            hashing::hash_256_64(seed, attempt / 32).as_bytes()[random_byte_index],
        );

        if effective_balance(candidate)? * max_random_byte
            >= P::MAX_EFFECTIVE_BALANCE * random_byte
        {
            return Ok(candidate);
        }
    }

    unreachable!("the sampling loop above never terminates normally")
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use test_case::test_case;
    use types::preset::Minimal;

    use super::*;

    #[test_case(0, 0)]
    #[test_case(1, 1)]
    #[test_case(3, 1)]
    #[test_case(4, 2)]
    #[test_case(255, 15)]
    #[test_case(256, 16)]
    #[test_case(1 << 40, 1 << 20)]
    #[test_case(u64::MAX, u32::MAX as u64)]
    fn integer_squareroot_rounds_down(n: u64, root: u64) {
        assert_eq!(integer_squareroot(n), root);
    }

    #[test]
    fn slots_in_epoch_covers_the_whole_epoch() {
        assert_eq!(slots_in_epoch::<Minimal>(0), 0..8);
        assert_eq!(slots_in_epoch::<Minimal>(2), 16..24);
    }

    #[test]
    fn epoch_boundaries_use_integer_division() {
        assert_eq!(compute_epoch_at_slot::<Minimal>(7), 0);
        assert_eq!(compute_epoch_at_slot::<Minimal>(8), 1);
        assert_eq!(compute_epoch_at_slot::<Minimal>(9), 1);
        assert_eq!(compute_start_slot_at_epoch::<Minimal>(1), 8);
        assert!(is_epoch_start::<Minimal>(16));
        assert!(!is_epoch_start::<Minimal>(17));
    }

    #[test]
    fn domains_embed_the_domain_type_and_fork_data_root() {
        let config = Config::mainnet();

        let domain = compute_domain(
            &config,
            types::phase0::consts::DOMAIN_BEACON_PROPOSER,
            None,
            None,
        );

        assert_eq!(domain[..4], hex!("00000000"));
        assert_eq!(
            domain[4..],
            compute_fork_data_root(config.genesis_fork_version, H256::zero())[..28],
        );
    }
}
