//! Deterministic keys and quick-start genesis states for local testnets and tests.

use core::num::NonZeroU64;

use anyhow::Result;
use bls::SecretKey;
use helper_functions::{fork, misc};
use ssz::{ContiguousList, SszHash as _};
use types::{
    combined::BeaconState as CombinedBeaconState,
    config::Config,
    nonstandard::Phase,
    phase0::{
        beacon_state::BeaconState,
        consts::{GENESIS_EPOCH, FAR_FUTURE_EPOCH},
        containers::{BeaconBlockBody, BeaconBlockHeader, Eth1Data, Fork, Validator},
        primitives::{UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#create-genesis-state>
const QUICK_START_ETH1_BLOCK_HASH: H256 = H256([0x42; 32]);

/// Derives the secret key of a test validator from its index.
///
/// This is not the derivation from the interop standard; the keys are only
/// meant to be consistent within one process.
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let ikm = hashing::hash_64(validator_index);

    SecretKey::from_ikm(ikm.as_bytes())
        .expect("32 bytes of key material are enough for key generation")
}

/// Builds a genesis state with `validator_count` active validators,
/// already upgraded to the phase the config activates at genesis.
pub fn quick_start_beacon_state<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    validator_count: NonZeroU64,
) -> Result<CombinedBeaconState<P>> {
    let validators = (0..validator_count.get())
        .map(|validator_index| {
            let public_key = secret_key(validator_index).to_public_key();
            let pubkey = bls::PublicKeyBytes::from(public_key);

            Validator {
                pubkey: public_key.into(),
                withdrawal_credentials: misc::bls_withdrawal_credentials(pubkey),
                effective_balance: P::MAX_EFFECTIVE_BALANCE,
                slashed: false,
                activation_eligibility_epoch: GENESIS_EPOCH,
                activation_epoch: GENESIS_EPOCH,
                exit_epoch: FAR_FUTURE_EPOCH,
                withdrawable_epoch: FAR_FUTURE_EPOCH,
            }
        })
        .collect::<Vec<_>>();

    let balances = vec![P::MAX_EFFECTIVE_BALANCE; validators.len()];

    let mut state = BeaconState::<P> {
        genesis_time,
        fork: Fork {
            previous_version: config.genesis_fork_version,
            current_version: config.genesis_fork_version,
            epoch: GENESIS_EPOCH,
        },
        latest_block_header: BeaconBlockHeader {
            body_root: BeaconBlockBody::<P>::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        eth1_data: Eth1Data {
            deposit_root: H256::zero(),
            deposit_count: validator_count.get(),
            block_hash: QUICK_START_ETH1_BLOCK_HASH,
        },
        eth1_deposit_index: validator_count.get(),
        validators: ContiguousList::try_from(validators)?.into(),
        balances: ContiguousList::try_from(balances)?.into(),
        ..BeaconState::default()
    };

    for mix in state.randao_mixes.iter_mut() {
        *mix = QUICK_START_ETH1_BLOCK_HASH;
    }

    state.genesis_validators_root = state.validators.hash_tree_root();

    let state = match config.phase_at_slot::<P>(types::phase0::consts::GENESIS_SLOT) {
        Phase::Phase0 => state.into(),
        Phase::Altair => upgrade(config, state)?.into(),
        Phase::Bellatrix => {
            let altair_state = upgrade(config, state)?;
            fork::upgrade_to_bellatrix(config, altair_state).into()
        }
    };

    Ok(state)
}

fn upgrade<P: Preset>(
    config: &Config,
    state: BeaconState<P>,
) -> Result<types::altair::beacon_state::BeaconState<P>> {
    fork::upgrade_to_altair(config, state)
}

#[cfg(test)]
mod tests {
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn genesis_state_has_active_validators_and_stable_root() {
        let config = Config::minimal();
        let count = NonZeroU64::new(8).expect("count is nonzero");

        let state = quick_start_beacon_state::<Minimal>(&config, 0, count)
            .expect("genesis state can be built");

        assert_eq!(state.slot(), 0);
        assert_eq!(state.phase(), Phase::Phase0);
        assert_eq!(state.hash_tree_root(), state.hash_tree_root());

        let CombinedBeaconState::Phase0(state) = state else {
            panic!("minimal config starts in Phase 0");
        };

        assert_eq!(state.validators.len(), 8);

        assert!(state
            .validators
            .iter()
            .all(|validator| validator.activation_epoch == GENESIS_EPOCH));
    }
}
