use ssz::{ContiguousList, ContiguousVector, Hc};

use crate::{
    altair::primitives::ParticipationFlags,
    phase0::{
        containers::{Eth1Data, PendingAttestation, Validator},
        primitives::{Gwei, H256},
    },
    preset::Preset,
};

// The large fields of a state are wrapped in `Hc` so that rehashing a state
// after a block only recomputes the subtrees the block actually touched.

pub type Attestations<P> =
    ContiguousList<PendingAttestation<P>, <P as Preset>::MaxAttestationsPerEpoch>;
pub type Balances<P> = Hc<ContiguousList<Gwei, <P as Preset>::ValidatorRegistryLimit>>;
pub type EpochParticipation<P> =
    Hc<ContiguousList<ParticipationFlags, <P as Preset>::ValidatorRegistryLimit>>;
pub type Eth1DataVotes<P> = ContiguousList<Eth1Data, <P as Preset>::SlotsPerEth1VotingPeriod>;
pub type HistoricalRoots<P> = Hc<ContiguousList<H256, <P as Preset>::HistoricalRootsLimit>>;
pub type InactivityScores<P> = Hc<ContiguousList<u64, <P as Preset>::ValidatorRegistryLimit>>;
pub type RandaoMixes<P> = Hc<ContiguousVector<H256, <P as Preset>::EpochsPerHistoricalVector>>;
pub type RecentRoots<P> = Hc<ContiguousVector<H256, <P as Preset>::SlotsPerHistoricalRoot>>;
pub type Slashings<P> = Hc<ContiguousVector<Gwei, <P as Preset>::EpochsPerSlashingsVector>>;
pub type Validators<P> = Hc<ContiguousList<Validator, <P as Preset>::ValidatorRegistryLimit>>;
