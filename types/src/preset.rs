use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use typenum::{
    NonZero, Prod, Unsigned, U1048576, U1073741824, U1099511627776, U128, U16, U16777216, U2,
    U2048, U256, U32, U4, U512, U64, U65536, U8, U8192,
};

use crate::phase0::primitives::Gwei;

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets).
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    // Phase 0
    type EpochsPerEth1VotingPeriod: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type EpochsPerHistoricalVector: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type EpochsPerSlashingsVector: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type HistoricalRootsLimit: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxAttestations: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxAttesterSlashings: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxDeposits: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxProposerSlashings: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxValidatorsPerCommittee: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type MaxVoluntaryExits: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type SlotsPerEpoch: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type ValidatorRegistryLimit: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;

    // Altair
    type SyncCommitteeSize: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;

    // Bellatrix
    type BytesPerLogsBloom: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxBytesPerTransaction: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxExtraDataBytes: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type MaxTransactionsPerPayload: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;

    // Derived type-level variables
    type MaxAttestationsPerEpoch: Unsigned + PartialEq + Eq + Hash + Debug + Send + Sync;
    type SlotsPerEth1VotingPeriod: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;
    type SlotsPerHistoricalRoot: Unsigned + PartialEq + Eq + Hash + NonZero + Debug + Send + Sync;

    // Meta
    const NAME: PresetName;

    // Phase 0
    const BASE_REWARD_FACTOR: u64 = 64;
    const EFFECTIVE_BALANCE_INCREMENT: NonZeroU64 = nonzero!(1_000_000_000_u64);
    const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
    const HYSTERESIS_QUOTIENT: NonZeroU64 = nonzero!(4_u64);
    const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;
    const INACTIVITY_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(1_u64 << 26);
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(64_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_ATTESTATION_INCLUSION_DELAY: NonZeroU64 = NonZeroU64::MIN;
    const MIN_DEPOSIT_AMOUNT: Gwei = 1_000_000_000;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64 = 4;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(128_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 1;
    const PROPOSER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(8_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(128_u64);
    const WHISTLEBLOWER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(512_u64);

    // Altair
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: NonZeroU64 = nonzero!(256_u64);
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: NonZeroU64 = nonzero!(3_u64 << 24);
    const MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR: NonZeroU64 = nonzero!(64_u64);
    const MIN_SYNC_COMMITTEE_PARTICIPANTS: usize = 1;
    const PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR: u64 = 2;

    // Bellatrix
    const INACTIVITY_PENALTY_QUOTIENT_BELLATRIX: NonZeroU64 = nonzero!(1_u64 << 24);
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: NonZeroU64 = nonzero!(32_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64 = 3;
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    // Phase 0
    type EpochsPerEth1VotingPeriod = U64;
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type HistoricalRootsLimit = U16777216;
    type MaxAttestations = U128;
    type MaxAttesterSlashings = U2;
    type MaxDeposits = U16;
    type MaxProposerSlashings = U16;
    type MaxValidatorsPerCommittee = U2048;
    type MaxVoluntaryExits = U16;
    type SlotsPerEpoch = U32;
    type ValidatorRegistryLimit = U1099511627776;

    // Altair
    type SyncCommitteeSize = U512;

    // Bellatrix
    type BytesPerLogsBloom = U256;
    type MaxBytesPerTransaction = U1073741824;
    type MaxExtraDataBytes = U32;
    type MaxTransactionsPerPayload = U1048576;

    // Derived type-level variables
    type MaxAttestationsPerEpoch = Prod<Self::MaxAttestations, Self::SlotsPerEpoch>;
    type SlotsPerEth1VotingPeriod = Prod<Self::EpochsPerEth1VotingPeriod, Self::SlotsPerEpoch>;
    type SlotsPerHistoricalRoot = U8192;

    // Meta
    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    // Phase 0
    type EpochsPerEth1VotingPeriod = U4;
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type HistoricalRootsLimit = U16777216;
    type MaxAttestations = U128;
    type MaxAttesterSlashings = U2;
    type MaxDeposits = U16;
    type MaxProposerSlashings = U16;
    type MaxValidatorsPerCommittee = U2048;
    type MaxVoluntaryExits = U16;
    type SlotsPerEpoch = U8;
    type ValidatorRegistryLimit = U1099511627776;

    // Altair
    type SyncCommitteeSize = U32;

    // Bellatrix
    type BytesPerLogsBloom = U256;
    type MaxBytesPerTransaction = U1073741824;
    type MaxExtraDataBytes = U32;
    type MaxTransactionsPerPayload = U1048576;

    // Derived type-level variables
    type MaxAttestationsPerEpoch = Prod<Self::MaxAttestations, Self::SlotsPerEpoch>;
    type SlotsPerEth1VotingPeriod = Prod<Self::EpochsPerEth1VotingPeriod, Self::SlotsPerEpoch>;
    type SlotsPerHistoricalRoot = U64;

    // Meta
    const NAME: PresetName = PresetName::Minimal;

    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: NonZeroU64 = nonzero!(8_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(4_u64);
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(4_u64);
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    Mainnet,
    Minimal,
}

#[cfg(test)]
mod tests {
    use typenum::Unsigned as _;

    use super::*;

    #[test]
    fn derived_lengths_match_their_factors() {
        assert_eq!(
            <Mainnet as Preset>::SlotsPerHistoricalRoot::U64,
            <Mainnet as Preset>::SlotsPerEpoch::U64 * 256,
        );
        assert_eq!(<Mainnet as Preset>::SlotsPerEth1VotingPeriod::U64, 2048);
        assert_eq!(<Minimal as Preset>::SlotsPerEth1VotingPeriod::U64, 32);
    }
}
