//! Narrow accessor traits over the per-fork state and block types.
//!
//! Transition and helper functions that do not care about fork-specific fields
//! are generic over these instead of being duplicated per fork.

use std::sync::Arc;

use bls::SignatureBytes;
use duplicate::duplicate_item;
use ssz::{BitVector, ContiguousList, Hc, SszHash};

use crate::{
    altair::containers::{SyncAggregate, SyncCommittee},
    bellatrix::containers::{ExecutionPayload, ExecutionPayloadHeader},
    cache::Cache,
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
        primitives::{DepositIndex, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{altair, bellatrix, phase0};

pub trait BeaconState<P: Preset>: SszHash + Clone + Send + Sync {
    fn genesis_time(&self) -> UnixSeconds;
    fn genesis_validators_root(&self) -> H256;
    fn slot(&self) -> Slot;
    fn slot_mut(&mut self) -> &mut Slot;
    fn fork(&self) -> Fork;
    fn fork_mut(&mut self) -> &mut Fork;
    fn latest_block_header(&self) -> BeaconBlockHeader;
    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader;
    fn block_roots(&self) -> &RecentRoots<P>;
    fn block_roots_mut(&mut self) -> &mut RecentRoots<P>;
    fn state_roots(&self) -> &RecentRoots<P>;
    fn state_roots_mut(&mut self) -> &mut RecentRoots<P>;
    fn historical_roots(&self) -> &HistoricalRoots<P>;
    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots<P>;
    fn eth1_data(&self) -> Eth1Data;
    fn eth1_data_mut(&mut self) -> &mut Eth1Data;
    fn eth1_data_votes(&self) -> &Eth1DataVotes<P>;
    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes<P>;
    fn eth1_deposit_index(&self) -> DepositIndex;
    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex;
    fn validators(&self) -> &Validators<P>;
    fn validators_mut(&mut self) -> &mut Validators<P>;
    fn balances(&self) -> &Balances<P>;
    fn balances_mut(&mut self) -> &mut Balances<P>;
    fn randao_mixes(&self) -> &RandaoMixes<P>;
    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P>;
    fn slashings(&self) -> &Slashings<P>;
    fn slashings_mut(&mut self) -> &mut Slashings<P>;
    fn justification_bits(&self) -> &BitVector<JustificationBitsLength>;
    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength>;
    fn previous_justified_checkpoint(&self) -> Checkpoint;
    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn current_justified_checkpoint(&self) -> Checkpoint;
    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn finalized_checkpoint(&self) -> Checkpoint;
    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn cache(&self) -> &Cache;
    fn cache_mut(&mut self) -> &mut Cache;
}

#[duplicate_item(
    implementor;
    [phase0::beacon_state::BeaconState];
    [altair::beacon_state::BeaconState];
    [bellatrix::beacon_state::BeaconState];
)]
impl<P: Preset> BeaconState<P> for implementor<P> {
    fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    fn genesis_validators_root(&self) -> H256 {
        self.genesis_validators_root
    }

    fn slot(&self) -> Slot {
        self.slot
    }

    fn slot_mut(&mut self) -> &mut Slot {
        &mut self.slot
    }

    fn fork(&self) -> Fork {
        self.fork
    }

    fn fork_mut(&mut self) -> &mut Fork {
        &mut self.fork
    }

    fn latest_block_header(&self) -> BeaconBlockHeader {
        self.latest_block_header
    }

    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
        &mut self.latest_block_header
    }

    fn block_roots(&self) -> &RecentRoots<P> {
        &self.block_roots
    }

    fn block_roots_mut(&mut self) -> &mut RecentRoots<P> {
        &mut self.block_roots
    }

    fn state_roots(&self) -> &RecentRoots<P> {
        &self.state_roots
    }

    fn state_roots_mut(&mut self) -> &mut RecentRoots<P> {
        &mut self.state_roots
    }

    fn historical_roots(&self) -> &HistoricalRoots<P> {
        &self.historical_roots
    }

    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots<P> {
        &mut self.historical_roots
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        &mut self.eth1_data
    }

    fn eth1_data_votes(&self) -> &Eth1DataVotes<P> {
        &self.eth1_data_votes
    }

    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes<P> {
        &mut self.eth1_data_votes
    }

    fn eth1_deposit_index(&self) -> DepositIndex {
        self.eth1_deposit_index
    }

    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex {
        &mut self.eth1_deposit_index
    }

    fn validators(&self) -> &Validators<P> {
        &self.validators
    }

    fn validators_mut(&mut self) -> &mut Validators<P> {
        &mut self.validators
    }

    fn balances(&self) -> &Balances<P> {
        &self.balances
    }

    fn balances_mut(&mut self) -> &mut Balances<P> {
        &mut self.balances
    }

    fn randao_mixes(&self) -> &RandaoMixes<P> {
        &self.randao_mixes
    }

    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P> {
        &mut self.randao_mixes
    }

    fn slashings(&self) -> &Slashings<P> {
        &self.slashings
    }

    fn slashings_mut(&mut self) -> &mut Slashings<P> {
        &mut self.slashings
    }

    fn justification_bits(&self) -> &BitVector<JustificationBitsLength> {
        &self.justification_bits
    }

    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength> {
        &mut self.justification_bits
    }

    fn previous_justified_checkpoint(&self) -> Checkpoint {
        self.previous_justified_checkpoint
    }

    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.previous_justified_checkpoint
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        self.current_justified_checkpoint
    }

    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.current_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.finalized_checkpoint
    }

    fn cache(&self) -> &Cache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }
}

pub trait PostAltairBeaconState<P: Preset>: BeaconState<P> {
    fn previous_epoch_participation(&self) -> &EpochParticipation<P>;
    fn previous_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P>;
    fn current_epoch_participation(&self) -> &EpochParticipation<P>;
    fn current_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P>;
    fn inactivity_scores(&self) -> &InactivityScores<P>;
    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores<P>;
    fn current_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>>;
    fn current_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>>;
    fn next_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>>;
    fn next_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>>;
}

#[duplicate_item(
    implementor;
    [altair::beacon_state::BeaconState];
    [bellatrix::beacon_state::BeaconState];
)]
impl<P: Preset> PostAltairBeaconState<P> for implementor<P> {
    fn previous_epoch_participation(&self) -> &EpochParticipation<P> {
        &self.previous_epoch_participation
    }

    fn previous_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        &mut self.previous_epoch_participation
    }

    fn current_epoch_participation(&self) -> &EpochParticipation<P> {
        &self.current_epoch_participation
    }

    fn current_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        &mut self.current_epoch_participation
    }

    fn inactivity_scores(&self) -> &InactivityScores<P> {
        &self.inactivity_scores
    }

    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores<P> {
        &mut self.inactivity_scores
    }

    fn current_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        &self.current_sync_committee
    }

    fn current_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        &mut self.current_sync_committee
    }

    fn next_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        &self.next_sync_committee
    }

    fn next_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        &mut self.next_sync_committee
    }
}

pub trait PostBellatrixBeaconState<P: Preset>: PostAltairBeaconState<P> {
    fn latest_execution_payload_header(&self) -> &ExecutionPayloadHeader<P>;
    fn latest_execution_payload_header_mut(&mut self) -> &mut ExecutionPayloadHeader<P>;
}

impl<P: Preset> PostBellatrixBeaconState<P> for bellatrix::beacon_state::BeaconState<P> {
    fn latest_execution_payload_header(&self) -> &ExecutionPayloadHeader<P> {
        &self.latest_execution_payload_header
    }

    fn latest_execution_payload_header_mut(&mut self) -> &mut ExecutionPayloadHeader<P> {
        &mut self.latest_execution_payload_header
    }
}

pub trait BeaconBlock<P: Preset>: SszHash {
    type Body: BeaconBlockBody<P>;

    fn slot(&self) -> Slot;
    fn proposer_index(&self) -> ValidatorIndex;
    fn parent_root(&self) -> H256;
    fn state_root(&self) -> H256;
    fn body(&self) -> &Self::Body;
    fn to_header(&self) -> BeaconBlockHeader;
}

#[duplicate_item(
    block_module;
    [phase0];
    [altair];
    [bellatrix];
)]
impl<P: Preset> BeaconBlock<P> for block_module::containers::BeaconBlock<P> {
    type Body = block_module::containers::BeaconBlockBody<P>;

    fn slot(&self) -> Slot {
        self.slot
    }

    fn proposer_index(&self) -> ValidatorIndex {
        self.proposer_index
    }

    fn parent_root(&self) -> H256 {
        self.parent_root
    }

    fn state_root(&self) -> H256 {
        self.state_root
    }

    fn body(&self) -> &Self::Body {
        &self.body
    }

    fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: ssz::SszHash::hash_tree_root(&self.body),
        }
    }
}

pub trait BeaconBlockBody<P: Preset> {
    fn randao_reveal(&self) -> SignatureBytes;
    fn eth1_data(&self) -> Eth1Data;
    fn graffiti(&self) -> H256;
    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings>;
    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>;
    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations>;
    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits>;
    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>;
}

#[duplicate_item(
    body_module;
    [phase0];
    [altair];
    [bellatrix];
)]
impl<P: Preset> BeaconBlockBody<P> for body_module::containers::BeaconBlockBody<P> {
    fn randao_reveal(&self) -> SignatureBytes {
        self.randao_reveal
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn graffiti(&self) -> H256 {
        self.graffiti
    }

    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings> {
        &self.proposer_slashings
    }

    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings> {
        &self.attester_slashings
    }

    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations> {
        &self.attestations
    }

    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits> {
        &self.deposits
    }

    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits> {
        &self.voluntary_exits
    }
}

pub trait PostAltairBeaconBlockBody<P: Preset>: BeaconBlockBody<P> {
    fn sync_aggregate(&self) -> &SyncAggregate<P>;
}

#[duplicate_item(
    body_module;
    [altair];
    [bellatrix];
)]
impl<P: Preset> PostAltairBeaconBlockBody<P> for body_module::containers::BeaconBlockBody<P> {
    fn sync_aggregate(&self) -> &SyncAggregate<P> {
        &self.sync_aggregate
    }
}

pub trait PostBellatrixBeaconBlockBody<P: Preset>: PostAltairBeaconBlockBody<P> {
    fn execution_payload(&self) -> &ExecutionPayload<P>;
}

impl<P: Preset> PostBellatrixBeaconBlockBody<P> for bellatrix::containers::BeaconBlockBody<P> {
    fn execution_payload(&self) -> &ExecutionPayload<P> {
        &self.execution_payload
    }
}
