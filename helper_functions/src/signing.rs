use duplicate::duplicate_item;
use ssz::SszHash;
use types::{
    altair, bellatrix,
    config::Config,
    phase0::{
        self,
        consts::{
            DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_DEPOSIT, DOMAIN_RANDAO,
            DOMAIN_VOLUNTARY_EXIT,
        },
        containers::{AttestationData, BeaconBlockHeader, DepositMessage, VoluntaryExit},
        primitives::{DomainType, Epoch, H256},
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::misc;

/// Computes signing roots for objects that are signed under a single fork's domain.
///
/// The fork version is derived from the object's own epoch, not the state's slot,
/// so signatures remain verifiable across fork boundaries.
pub trait SignForSingleFork<P: Preset>: SszHash {
    const DOMAIN_TYPE: DomainType;

    fn epoch(&self) -> Epoch;

    fn signing_root(&self, config: &Config, state: &impl BeaconState<P>) -> H256 {
        let epoch = self.epoch();
        let fork_version = config.version(config.phase_at_epoch(epoch));

        let domain = misc::compute_domain(
            config,
            Self::DOMAIN_TYPE,
            Some(fork_version),
            Some(state.genesis_validators_root()),
        );

        misc::compute_signing_root(self, domain)
    }
}

#[duplicate_item(
    block;
    [phase0::containers::BeaconBlock<P>];
    [altair::containers::BeaconBlock<P>];
    [bellatrix::containers::BeaconBlock<P>];
)]
impl<P: Preset> SignForSingleFork<P> for block {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

impl<P: Preset> SignForSingleFork<P> for BeaconBlockHeader {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

impl<P: Preset> SignForSingleFork<P> for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;

    fn epoch(&self) -> Epoch {
        self.target.epoch
    }
}

impl<P: Preset> SignForSingleFork<P> for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;

    fn epoch(&self) -> Epoch {
        self.epoch
    }
}

/// The epoch number a RANDAO reveal signs over.
#[derive(Clone, Copy, Debug)]
pub struct RandaoEpoch(Epoch);

impl From<Epoch> for RandaoEpoch {
    fn from(epoch: Epoch) -> Self {
        Self(epoch)
    }
}

impl SszHash for RandaoEpoch {
    type PackingFactor = <Epoch as SszHash>::PackingFactor;

    fn hash_tree_root(&self) -> H256 {
        self.0.hash_tree_root()
    }
}

impl<P: Preset> SignForSingleFork<P> for RandaoEpoch {
    const DOMAIN_TYPE: DomainType = DOMAIN_RANDAO;

    fn epoch(&self) -> Epoch {
        self.0
    }
}

/// Deposits are signed under the genesis fork version with a zero
/// genesis validators root so they verify on any chain.
#[must_use]
pub fn deposit_signing_root(config: &Config, deposit_message: DepositMessage) -> H256 {
    let domain = misc::compute_domain(config, DOMAIN_DEPOSIT, None, None);
    misc::compute_signing_root(&deposit_message, domain)
}
