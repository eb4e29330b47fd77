use bls::{AggregateSignatureBytes, CachedPublicKey, PublicKeyBytes, SignatureBytes};
use ssz::{impl_ssz_for_container, BitList, BitVector, ContiguousList, ContiguousVector};

use crate::{
    collections::{
        Attestations, Balances, Eth1DataVotes, HistoricalRoots, RandaoMixes, RecentRoots,
        Slashings, Validators,
    },
    phase0::{
        beacon_state::BeaconState,
        consts::{DepositProofLength, JustificationBitsLength},
        containers::{
            Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
            BeaconBlockHeader, Checkpoint, Deposit, DepositData, DepositMessage, Eth1Data, Fork,
            ForkData, HistoricalBatch, IndexedAttestation, PendingAttestation, ProposerSlashing,
            SignedBeaconBlock, SignedBeaconBlockHeader, SignedVoluntaryExit, SigningData,
            Validator, VoluntaryExit,
        },
        primitives::{
            CommitteeIndex, DepositIndex, Epoch, ExecutionBlockHash, Gwei, Slot, ValidatorIndex,
            Version, H256,
        },
    },
    preset::Preset,
};

impl_ssz_for_container! {
    <P: Preset> Attestation {
        aggregation_bits: BitList<P::MaxValidatorsPerCommittee>,
        data: AttestationData,
        signature: AggregateSignatureBytes,
    }
}

impl_ssz_for_container! {
    AttestationData {
        slot: Slot,
        index: CommitteeIndex,
        beacon_block_root: H256,
        source: Checkpoint,
        target: Checkpoint,
    }
}

impl_ssz_for_container! {
    <P: Preset> AttesterSlashing {
        attestation_1: IndexedAttestation<P>,
        attestation_2: IndexedAttestation<P>,
    }
}

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
    }
}

impl_ssz_for_container! {
    BeaconBlockHeader {
        slot: Slot,
        proposer_index: ValidatorIndex,
        parent_root: H256,
        state_root: H256,
        body_root: H256,
    }
}

impl_ssz_for_container! {
    Checkpoint {
        epoch: Epoch,
        root: H256,
    }
}

impl_ssz_for_container! {
    Deposit {
        proof: ContiguousVector<H256, DepositProofLength>,
        data: DepositData,
    }
}

impl_ssz_for_container! {
    DepositData {
        pubkey: PublicKeyBytes,
        withdrawal_credentials: H256,
        amount: Gwei,
        signature: SignatureBytes,
    }
}

impl_ssz_for_container! {
    DepositMessage {
        pubkey: PublicKeyBytes,
        withdrawal_credentials: H256,
        amount: Gwei,
    }
}

impl_ssz_for_container! {
    Eth1Data {
        deposit_root: H256,
        deposit_count: DepositIndex,
        block_hash: ExecutionBlockHash,
    }
}

impl_ssz_for_container! {
    Fork {
        previous_version: Version,
        current_version: Version,
        epoch: Epoch,
    }
}

impl_ssz_for_container! {
    ForkData {
        current_version: Version,
        genesis_validators_root: H256,
    }
}

impl_ssz_for_container! {
    <P: Preset> HistoricalBatch {
        block_roots: RecentRoots<P>,
        state_roots: RecentRoots<P>,
    }
}

impl_ssz_for_container! {
    <P: Preset> IndexedAttestation {
        attesting_indices: ContiguousList<ValidatorIndex, P::MaxValidatorsPerCommittee>,
        data: AttestationData,
        signature: AggregateSignatureBytes,
    }
}

impl_ssz_for_container! {
    <P: Preset> PendingAttestation {
        aggregation_bits: BitList<P::MaxValidatorsPerCommittee>,
        data: AttestationData,
        inclusion_delay: u64,
        proposer_index: ValidatorIndex,
    }
}

impl_ssz_for_container! {
    ProposerSlashing {
        signed_header_1: SignedBeaconBlockHeader,
        signed_header_2: SignedBeaconBlockHeader,
    }
}

impl_ssz_for_container! {
    <P: Preset> SignedBeaconBlock {
        message: BeaconBlock<P>,
        signature: SignatureBytes,
    }
}

impl_ssz_for_container! {
    SignedBeaconBlockHeader {
        message: BeaconBlockHeader,
        signature: SignatureBytes,
    }
}

impl_ssz_for_container! {
    SignedVoluntaryExit {
        message: VoluntaryExit,
        signature: SignatureBytes,
    }
}

impl_ssz_for_container! {
    SigningData {
        object_root: H256,
        domain: H256,
    }
}

impl_ssz_for_container! {
    Validator {
        pubkey: CachedPublicKey,
        withdrawal_credentials: H256,
        effective_balance: Gwei,
        slashed: bool,
        activation_eligibility_epoch: Epoch,
        activation_epoch: Epoch,
        exit_epoch: Epoch,
        withdrawable_epoch: Epoch,
    }
}

impl_ssz_for_container! {
    VoluntaryExit {
        epoch: Epoch,
        validator_index: ValidatorIndex,
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
        previous_epoch_attestations: Attestations<P>,
        current_epoch_attestations: Attestations<P>,
        justification_bits: BitVector<JustificationBitsLength>,
        previous_justified_checkpoint: Checkpoint,
        current_justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    }
    skip { cache }
}
