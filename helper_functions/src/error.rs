use thiserror::Error;
use types::phase0::primitives::{CommitteeIndex, Slot, ValidatorIndex};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("aggregation bitlist has {bitlist_length} bits but committee has {committee_length} members")]
    AggregationBitlistLengthMismatch {
        bitlist_length: usize,
        committee_length: usize,
    },
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("attesting indices are empty")]
    AttestingIndicesEmpty,
    #[error("committee {index} at slot {slot} is empty")]
    CommitteeEmpty { slot: Slot, index: CommitteeIndex },
    #[error("committee index {index} is out of bounds ({committees_per_slot} committees per slot)")]
    CommitteeIndexOutOfBounds {
        index: CommitteeIndex,
        committees_per_slot: u64,
    },
    #[error("no validators are active")]
    NoActiveValidators,
    #[error("public key bytes do not represent a valid point")]
    PublicKeyInvalid,
    #[error("{kind} signature is invalid")]
    SignatureInvalid { kind: SignatureKind },
    #[error("slot {slot} is outside the range covered by recent block roots")]
    SlotOutOfRange { slot: Slot },
    #[error("validator index {validator_index} is out of bounds")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SignatureKind {
    Attestation,
    Block,
    BlockHeaderInProposerSlashing,
    Deposit,
    Randao,
    SyncAggregate,
    VoluntaryExit,
}
