use std::sync::Arc;

use bls::{AggregatePublicKeyBytes, AggregateSignatureBytes, CachedPublicKey, SignatureBytes};
use ssz::{impl_ssz_for_container, BitVector, ContiguousList, ContiguousVector, Hc};

use crate::{
    altair::{
        beacon_state::BeaconState,
        containers::{
            BeaconBlock, BeaconBlockBody, SignedBeaconBlock, SyncAggregate, SyncCommittee,
        },
    },
    collections::{
        Balances, EpochParticipation, Eth1DataVotes, HistoricalRoots, InactivityScores,
        RandaoMixes, RecentRoots, Slashings, Validators,
    },
    phase0::{
        consts::JustificationBitsLength,
        containers::{
            Attestation, AttesterSlashing, BeaconBlockHeader, Checkpoint, Deposit, Eth1Data, Fork,
            ProposerSlashing, SignedVoluntaryExit,
        },
        primitives::{DepositIndex, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

impl_ssz_for_container! {
    <P: Preset> BeaconBlock {
        slot: Slot,
        proposer_index: ValidatorIndex,
        parent_root: H256,
        state_root: H256,
        body: BeaconBlockBody<P>,
    }
}

impl_ssz_for_container! {
    <P: Preset> BeaconBlockBody {
        randao_reveal: SignatureBytes,
        eth1_data: Eth1Data,
        graffiti: H256,
        proposer_slashings: ContiguousList<ProposerSlashing, P::MaxProposerSlashings>,
        attester_slashings: ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>,
        attestations: ContiguousList<Attestation<P>, P::MaxAttestations>,
        deposits: ContiguousList<Deposit, P::MaxDeposits>,
        voluntary_exits: ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>,
        sync_aggregate: SyncAggregate<P>,
    }
}

impl_ssz_for_container! {
    <P: Preset> SignedBeaconBlock {
        message: BeaconBlock<P>,
        signature: SignatureBytes,
    }
}

impl_ssz_for_container! {
    <P: Preset> SyncAggregate {
        sync_committee_bits: BitVector<P::SyncCommitteeSize>,
        sync_committee_signature: AggregateSignatureBytes,
    }
}

impl_ssz_for_container! {
    <P: Preset> SyncCommittee {
        pubkeys: Box<ContiguousVector<CachedPublicKey, P::SyncCommitteeSize>>,
        aggregate_pubkey: AggregatePublicKeyBytes,
    }
}

impl_ssz_for_container! {
    <P: Preset> BeaconState {
        genesis_time: u64,
        genesis_validators_root: H256,
        slot: Slot,
        fork: Fork,
        latest_block_header: BeaconBlockHeader,
        block_roots: RecentRoots<P>,
        state_roots: RecentRoots<P>,
        historical_roots: HistoricalRoots<P>,
        eth1_data: Eth1Data,
        eth1_data_votes: Eth1DataVotes<P>,
        eth1_deposit_index: DepositIndex,
        validators: Validators<P>,
        balances: Balances<P>,
        randao_mixes: RandaoMixes<P>,
        slashings: Slashings<P>,
        previous_epoch_participation: EpochParticipation<P>,
        current_epoch_participation: EpochParticipation<P>,
        justification_bits: BitVector<JustificationBitsLength>,
        previous_justified_checkpoint: Checkpoint,
        current_justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        inactivity_scores: InactivityScores<P>,
        current_sync_committee: Arc<Hc<SyncCommittee<P>>>,
        next_sync_committee: Arc<Hc<SyncCommittee<P>>>,
    }
    skip { cache }
}

impl<P: Preset> SyncAggregate<P> {
    /// The empty aggregate: no participants and the point-at-infinity signature.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sync_committee_bits: BitVector::default(),
            sync_committee_signature: AggregateSignatureBytes::empty(),
        }
    }
}
