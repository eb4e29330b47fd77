use core::num::NonZeroU64;
use std::borrow::Cow;

use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    nonstandard::Phase,
    phase0::{
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        primitives::{
            Epoch, ExecutionBlockHash, Gwei, Slot, Uint256, UnixSeconds, Version, H32,
        },
    },
    preset::{Preset, PresetName},
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
///
/// The `*_fork_epoch` fields have type `Epoch` for compatibility with standard configurations.
/// `FAR_FUTURE_EPOCH` disables a fork.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    pub genesis_delay: u64,
    pub genesis_fork_version: Version,
    pub min_genesis_active_validator_count: NonZeroU64,
    pub min_genesis_time: UnixSeconds,

    // Forking
    pub altair_fork_epoch: Epoch,
    pub altair_fork_version: Version,
    pub bellatrix_fork_epoch: Epoch,
    pub bellatrix_fork_version: Version,

    // Time parameters
    pub min_validator_withdrawability_delay: u64,
    pub seconds_per_slot: NonZeroU64,
    pub shard_committee_period: u64,

    // Validator cycle
    pub churn_limit_quotient: NonZeroU64,
    pub ejection_balance: Gwei,
    pub inactivity_score_bias: NonZeroU64,
    pub inactivity_score_recovery_rate: u64,
    pub min_per_epoch_churn_limit: u64,

    // Fork choice
    pub proposer_score_boost: u64,

    // Transition
    pub terminal_block_hash: ExecutionBlockHash,
    pub terminal_block_hash_activation_epoch: Epoch,
    pub terminal_total_difficulty: Uint256,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            // This way custom network data will be kept separate from mainnet data if a user
            // forgets to specify a custom `CONFIG_NAME`.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_delay: 604_800,
            genesis_fork_version: H32(hex!("00000000")),
            min_genesis_active_validator_count: nonzero!(1_u64 << 14),
            min_genesis_time: 0,

            // Forking
            altair_fork_epoch: FAR_FUTURE_EPOCH,
            altair_fork_version: H32(hex!("01000000")),
            bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
            bellatrix_fork_version: H32(hex!("02000000")),

            // Time parameters
            min_validator_withdrawability_delay: 256,
            seconds_per_slot: nonzero!(12_u64),
            shard_committee_period: 256,

            // Validator cycle
            churn_limit_quotient: nonzero!(1_u64 << 16),
            ejection_balance: 16_000_000_000,
            inactivity_score_bias: nonzero!(4_u64),
            inactivity_score_recovery_rate: 16,
            min_per_epoch_churn_limit: 4,

            // Fork choice
            proposer_score_boost: 40,

            // Transition
            terminal_block_hash: ExecutionBlockHash::zero(),
            terminal_block_hash_activation_epoch: FAR_FUTURE_EPOCH,
            terminal_total_difficulty: Uint256::from_big_endian(&hex!(
                "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffc00"
            )),
        }
    }
}

impl Config {
    /// [Mainnet configuration](https://github.com/ethereum/consensus-specs/blob/4e2578dfe4097e2a6b6284ff6991089057d48776/configs/mainnet.yaml).
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            preset_base: PresetName::Mainnet,
            min_genesis_time: 1_606_824_000,
            altair_fork_epoch: 74_240,
            bellatrix_fork_epoch: 144_896,
            terminal_total_difficulty: Uint256::from_big_endian(&hex!(
                "000000000000000000000000000000000000000000000c70d808a128d7380000"
            )),
            ..Self::default()
        }
    }

    /// [Minimal configuration](https://github.com/ethereum/consensus-specs/blob/4e2578dfe4097e2a6b6284ff6991089057d48776/configs/minimal.yaml).
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,
            genesis_delay: 300,
            genesis_fork_version: H32(hex!("00000001")),
            min_genesis_active_validator_count: nonzero!(64_u64),
            altair_fork_version: H32(hex!("01000001")),
            bellatrix_fork_version: H32(hex!("02000001")),
            seconds_per_slot: nonzero!(6_u64),
            churn_limit_quotient: nonzero!(32_u64),
            ..Self::default()
        }
    }

    /// Activates all phases from genesis. Only useful in tests and local networks.
    #[must_use]
    pub fn start_and_stay_in(self, phase: Phase) -> Self {
        match phase {
            Phase::Phase0 => Self {
                altair_fork_epoch: FAR_FUTURE_EPOCH,
                bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
                ..self
            },
            Phase::Altair => Self {
                altair_fork_epoch: GENESIS_EPOCH,
                bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
                ..self
            },
            Phase::Bellatrix => Self {
                altair_fork_epoch: GENESIS_EPOCH,
                bellatrix_fork_epoch: GENESIS_EPOCH,
                ..self
            },
        }
    }

    #[must_use]
    pub fn phase_at_epoch(&self, epoch: Epoch) -> Phase {
        if epoch >= self.bellatrix_fork_epoch {
            Phase::Bellatrix
        } else if epoch >= self.altair_fork_epoch {
            Phase::Altair
        } else {
            Phase::Phase0
        }
    }

    #[must_use]
    pub fn phase_at_slot<P: Preset>(&self, slot: Slot) -> Phase {
        self.phase_at_epoch(misc_compute_epoch_at_slot::<P>(slot))
    }

    #[must_use]
    pub fn fork_epoch(&self, phase: Phase) -> Epoch {
        match phase {
            Phase::Phase0 => GENESIS_EPOCH,
            Phase::Altair => self.altair_fork_epoch,
            Phase::Bellatrix => self.bellatrix_fork_epoch,
        }
    }

    /// The first slot of a phase, or `None` if the phase is disabled
    /// or its first slot does not fit in [`Slot`].
    #[must_use]
    pub fn fork_slot<P: Preset>(&self, phase: Phase) -> Option<Slot> {
        let epoch = self.fork_epoch(phase);

        if epoch == FAR_FUTURE_EPOCH {
            return None;
        }

        epoch.checked_mul(<P::SlotsPerEpoch as typenum::Unsigned>::U64)
    }

    #[must_use]
    pub fn version(&self, phase: Phase) -> Version {
        match phase {
            Phase::Phase0 => self.genesis_fork_version,
            Phase::Altair => self.altair_fork_version,
            Phase::Bellatrix => self.bellatrix_fork_version,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bellatrix_fork_epoch < self.altair_fork_epoch {
            return Err(ConfigError::ForkEpochsNotOrdered {
                earlier: Phase::Altair,
                later: Phase::Bellatrix,
            });
        }

        Ok(())
    }
}

// `helper_functions` depends on `types`, so the slot math has to be duplicated here.
fn misc_compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / <P::SlotsPerEpoch as typenum::Unsigned>::U64
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
    #[error("{earlier} fork epoch is greater than {later} fork epoch")]
    ForkEpochsNotOrdered { earlier: Phase, later: Phase },
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::preset::Minimal;

    use super::*;

    #[test_case(0, Phase::Phase0)]
    #[test_case(31, Phase::Phase0)]
    #[test_case(32, Phase::Altair)]
    #[test_case(63, Phase::Altair)]
    #[test_case(64, Phase::Bellatrix)]
    fn phases_change_at_fork_slots(slot: Slot, expected: Phase) {
        let config = Config {
            altair_fork_epoch: 4,
            bellatrix_fork_epoch: 8,
            ..Config::minimal()
        };

        assert_eq!(config.phase_at_slot::<Minimal>(slot), expected);
    }

    #[test]
    fn fork_slot_handles_disabled_phases() {
        let config = Config::minimal().start_and_stay_in(Phase::Altair);

        assert_eq!(config.fork_slot::<Minimal>(Phase::Altair), Some(0));
        assert_eq!(config.fork_slot::<Minimal>(Phase::Bellatrix), None);
    }

    #[test]
    fn config_deserializes_from_screaming_snake_case() {
        let json = serde_json::json!({
            "CONFIG_NAME": "devnet",
            "PRESET_BASE": "minimal",
            "ALTAIR_FORK_EPOCH": 2,
        });

        let config: Config = serde_json::from_value(json).expect("config is valid");

        assert_eq!(config.config_name, "devnet");
        assert_eq!(config.preset_base, PresetName::Minimal);
        assert_eq!(config.altair_fork_epoch, 2);
    }
}
