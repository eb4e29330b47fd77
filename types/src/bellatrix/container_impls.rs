use std::sync::Arc;

use bls::SignatureBytes;
use ssz::{
    impl_ssz_for_container, BitVector, ByteList, ByteVector, ContiguousList, Hc, SszHash as _,
};

use crate::{
    altair::containers::{SyncAggregate, SyncCommittee},
    bellatrix::{
        beacon_state::BeaconState,
        containers::{
            BeaconBlock, BeaconBlockBody, ExecutionPayload, ExecutionPayloadHeader,
            SignedBeaconBlock,
        },
        primitives::{Gas, Transaction},
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
        primitives::{
            DepositIndex, ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Slot,
            Uint256, UnixSeconds, ValidatorIndex, H256,
        },
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
        execution_payload: ExecutionPayload<P>,
    }
}

impl_ssz_for_container! {
    <P: Preset> ExecutionPayload {
        parent_hash: ExecutionBlockHash,
        fee_recipient: ExecutionAddress,
        state_root: H256,
        receipts_root: H256,
        logs_bloom: ByteVector<P::BytesPerLogsBloom>,
        prev_randao: H256,
        block_number: ExecutionBlockNumber,
        gas_limit: Gas,
        gas_used: Gas,
        timestamp: UnixSeconds,
        extra_data: ByteList<P::MaxExtraDataBytes>,
        base_fee_per_gas: Uint256,
        block_hash: ExecutionBlockHash,
        transactions: ContiguousList<Transaction<P>, P::MaxTransactionsPerPayload>,
    }
}

impl_ssz_for_container! {
    <P: Preset> ExecutionPayloadHeader {
        parent_hash: ExecutionBlockHash,
        fee_recipient: ExecutionAddress,
        state_root: H256,
        receipts_root: H256,
        logs_bloom: ByteVector<P::BytesPerLogsBloom>,
        prev_randao: H256,
        block_number: ExecutionBlockNumber,
        gas_limit: Gas,
        gas_used: Gas,
        timestamp: UnixSeconds,
        extra_data: ByteList<P::MaxExtraDataBytes>,
        base_fee_per_gas: Uint256,
        block_hash: ExecutionBlockHash,
        transactions_root: H256,
    }
}

impl_ssz_for_container! {
    <P: Preset> SignedBeaconBlock {
        message: BeaconBlock<P>,
        signature: SignatureBytes,
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
        latest_execution_payload_header: ExecutionPayloadHeader<P>,
    }
    skip { cache }
}

impl<P: Preset> ExecutionPayload<P> {
    /// True for the placeholder payload blocks carry between the Bellatrix fork
    /// and the merge transition.
    #[must_use]
    pub fn is_default_payload(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn to_header(&self) -> ExecutionPayloadHeader<P> {
        ExecutionPayloadHeader {
            parent_hash: self.parent_hash,
            fee_recipient: self.fee_recipient,
            state_root: self.state_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom.clone(),
            prev_randao: self.prev_randao,
            block_number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            base_fee_per_gas: self.base_fee_per_gas,
            block_hash: self.block_hash,
            transactions_root: self.transactions.hash_tree_root(),
        }
    }
}
