use thiserror::Error;
use types::phase0::{
    containers::Checkpoint,
    primitives::{Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("attestation source {actual:?} does not match justified checkpoint {expected:?}")]
    AttestationSourceMismatch {
        expected: Checkpoint,
        actual: Checkpoint,
    },
    #[error("attestation target root {actual} does not match epoch boundary root {expected}")]
    AttestationTargetRootMismatch { expected: H256, actual: H256 },
    #[error("attestation targets epoch {target_epoch} instead of its own slot's epoch")]
    AttestationTargetsWrongEpoch { target_epoch: Epoch },
    #[error(
        "attestation at slot {attestation_slot} is outside the inclusion range \
         for state slot {state_slot}"
    )]
    AttestationOutsideInclusionRange {
        state_slot: Slot,
        attestation_slot: Slot,
    },
    #[error("attester slashing slashed no validators")]
    AttesterSlashingSlashedNothing,
    #[error("attester slashing attestations are not slashable")]
    AttesterSlashingNotSlashable,
    #[error("block is not newer than the latest block header ({block_slot} <= {header_slot})")]
    BlockNotNewerThanLatestBlockHeader { block_slot: Slot, header_slot: Slot },
    #[error("block parent root {actual} does not match latest block header root {expected}")]
    BlockParentRootMismatch { expected: H256, actual: H256 },
    #[error("block slot {block_slot} does not match state slot {state_slot}")]
    BlockSlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("deposit count {actual} does not match expected count {expected}")]
    DepositCountMismatch { expected: u64, actual: u64 },
    #[error("deposit proof is invalid")]
    DepositProofInvalid,
    #[error("eth1 data votes are full")]
    Eth1DataVotesFull,
    #[error("payload parent hash {actual} does not match latest payload block hash {expected}")]
    PayloadParentHashMismatch { expected: H256, actual: H256 },
    #[error("payload prev_randao {actual} does not match the current randao mix {expected}")]
    PayloadPrevRandaoMismatch { expected: H256, actual: H256 },
    #[error("payload timestamp {actual} does not match slot timestamp {expected}")]
    PayloadTimestampMismatch {
        expected: UnixSeconds,
        actual: UnixSeconds,
    },
    #[error("proposer {index} is slashed")]
    ProposerSlashed { index: ValidatorIndex },
    #[error("proposer slashing headers are identical")]
    ProposerSlashingHeadersIdentical,
    #[error("proposer slashing headers are for different proposers")]
    ProposerSlashingProposerMismatch,
    #[error("proposer slashing headers are for different slots")]
    ProposerSlashingSlotMismatch,
    #[error("validator {index} is not slashable")]
    ValidatorNotSlashable { index: ValidatorIndex },
    #[error("block proposer index {actual} does not match computed proposer {expected}")]
    ProposerIndexMismatch {
        expected: ValidatorIndex,
        actual: ValidatorIndex,
    },
    #[error("state slot {current} is not earlier than target slot {target}")]
    SlotNotLater { current: Slot, target: Slot },
    #[error("block state root verification failed (expected {expected}, computed {actual})")]
    StateRootMismatch { expected: H256, actual: H256 },
    #[error("sync committee signature is over the wrong participants")]
    SyncAggregateParticipantsInvalid,
    #[error("voluntary exit for {index} is premature")]
    VoluntaryExitTooEarly { index: ValidatorIndex },
    #[error("validator {index} exiting voluntarily is not active")]
    VoluntaryExitFromInactiveValidator { index: ValidatorIndex },
    #[error("validator {index} has already initiated an exit")]
    VoluntaryExitAlreadyInitiated { index: ValidatorIndex },
}
