use anyhow::{ensure, Result};
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, H256},
    },
    preset::Preset,
    traits::{BeaconState, PostBellatrixBeaconState},
};

use crate::{
    accessors,
    error::{Error, SignatureKind},
    signing::SignForSingleFork as _,
    verifier::Verifier,
};

/// [`is_active_validator`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_active_validator)
#[must_use]
pub fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

/// [`is_eligible_for_activation_queue`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_eligible_for_activation_queue)
#[must_use]
pub fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

/// [`is_eligible_for_activation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_eligible_for_activation)
#[must_use]
pub fn is_eligible_for_activation<P: Preset>(
    state: &impl BeaconState<P>,
    validator: &Validator,
) -> bool {
    validator.activation_eligibility_epoch <= state.finalized_checkpoint().epoch
        && validator.activation_epoch == FAR_FUTURE_EPOCH
}

/// [`is_slashable_validator`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_slashable_validator)
#[must_use]
pub fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

/// [`is_slashable_attestation_data`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_slashable_attestation_data)
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    let double_vote = data_1 != data_2 && data_1.target.epoch == data_2.target.epoch;
    let surround_vote =
        data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch;

    double_vote || surround_vote
}

/// [`is_valid_indexed_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_valid_indexed_attestation)
pub fn validate_indexed_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    indexed_attestation: &IndexedAttestation<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestingIndicesEmpty);

    ensure!(
        indices.iter().tuple_windows().all(|(a, b)| a < b),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    let signing_root = indexed_attestation.data.signing_root(config, state);

    let public_keys = indices
        .iter()
        .map(|index| accessors::public_key(state, *index))
        .collect::<Result<Vec<_>>>()?;

    verifier.verify_aggregate(
        signing_root,
        indexed_attestation.signature,
        public_keys,
        SignatureKind::Attestation,
    )
}

/// [`is_valid_merkle_branch`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_valid_merkle_branch)
#[must_use]
pub fn is_valid_merkle_branch(
    leaf: H256,
    branch: impl IntoIterator<Item = H256>,
    index: u64,
    root: H256,
) -> bool {
    let mut node = leaf;

    for (height, sibling) in branch.into_iter().enumerate() {
        if index >> height & 1 == 1 {
            node = hashing::hash_256_256(sibling, node);
        } else {
            node = hashing::hash_256_256(node, sibling);
        }
    }

    node == root
}

/// [`is_merge_transition_complete`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/beacon-chain.md#is_merge_transition_complete)
#[must_use]
pub fn is_merge_transition_complete<P: Preset>(state: &impl PostBellatrixBeaconState<P>) -> bool {
    *state.latest_execution_payload_header() != Default::default()
}

/// The payload of a block is "real" once it differs from the default payload.
/// Blocks between the Bellatrix fork and the merge carry the default payload
/// and are vacuously valid from the execution layer's point of view.
#[must_use]
pub fn is_execution_enabled<P: Preset>(
    state: &impl PostBellatrixBeaconState<P>,
    payload_is_default: bool,
) -> bool {
    is_merge_transition_complete(state) || !payload_is_default
}

#[cfg(test)]
mod tests {
    use types::preset::Mainnet;

    use super::*;

    fn validator(activation_epoch: Epoch, exit_epoch: Epoch) -> Validator {
        Validator {
            activation_epoch,
            exit_epoch,
            withdrawable_epoch: exit_epoch + 1,
            effective_balance: <Mainnet as Preset>::MAX_EFFECTIVE_BALANCE,
            ..Validator::default()
        }
    }

    #[test]
    fn activity_is_a_half_open_interval() {
        let validator = validator(2, 5);

        assert!(!is_active_validator(&validator, 1));
        assert!(is_active_validator(&validator, 2));
        assert!(is_active_validator(&validator, 4));
        assert!(!is_active_validator(&validator, 5));
    }

    #[test]
    fn surrounding_votes_are_slashable() {
        let checkpoint = |epoch| types::phase0::containers::Checkpoint {
            epoch,
            root: H256::zero(),
        };

        let surrounded = AttestationData {
            source: checkpoint(2),
            target: checkpoint(3),
            ..AttestationData::default()
        };

        let surrounding = AttestationData {
            source: checkpoint(1),
            target: checkpoint(4),
            ..AttestationData::default()
        };

        assert!(is_slashable_attestation_data(surrounding, surrounded));
        assert!(!is_slashable_attestation_data(surrounded, surrounded));
    }

    #[test]
    fn merkle_branch_of_zero_hashes_verifies() {
        let leaf = H256::zero();
        let branch = [hashing::ZERO_HASHES[0], hashing::ZERO_HASHES[1]];
        let root = hashing::ZERO_HASHES[2];

        assert!(is_valid_merkle_branch(leaf, branch, 0, root));
        assert!(!is_valid_merkle_branch(leaf, branch, 1, hashing::ZERO_HASHES[1]));
    }
}
