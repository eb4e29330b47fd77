use duplicate::duplicate_item;
use ssz::{
    Hc, ReadError, Size, SszHash, SszRead, SszReadDefault, SszSize, SszWrite, WriteError, H256,
};
use typenum::U1;

use crate::{
    altair::{
        beacon_state::BeaconState as AltairBeaconState,
        containers::{SignedBeaconBlock as AltairSignedBeaconBlock, SyncAggregate},
    },
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::{ExecutionPayload, SignedBeaconBlock as BellatrixSignedBeaconBlock},
    },
    config::Config,
    nonstandard::Phase,
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        containers::{
            BeaconBlockHeader, Checkpoint, SignedBeaconBlock as Phase0SignedBeaconBlock,
        },
        primitives::{ExecutionBlockHash, Slot, UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
    traits::BeaconBlock as _,
};

use bls::SignatureBytes;

const VARIANT_COUNT: usize = 3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BeaconState<P: Preset> {
    Phase0(Hc<Phase0BeaconState<P>>),
    Altair(Hc<AltairBeaconState<P>>),
    Bellatrix(Hc<BellatrixBeaconState<P>>),
}

#[duplicate_item(
    implementor          variant;
    [Phase0BeaconState]    [Phase0];
    [AltairBeaconState]    [Altair];
    [BellatrixBeaconState] [Bellatrix];
)]
impl<P: Preset> From<implementor<P>> for BeaconState<P> {
    fn from(state: implementor<P>) -> Self {
        Self::variant(Hc::from(state))
    }
}

impl<P: Preset> SszSize for BeaconState<P> {
    const SIZE: Size = Size::for_untagged_union::<VARIANT_COUNT>([
        Phase0BeaconState::<P>::SIZE,
        AltairBeaconState::<P>::SIZE,
        BellatrixBeaconState::<P>::SIZE,
    ]);
}

impl<P: Preset> SszRead<Config> for BeaconState<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        // There are 2 fixed parts before `state.slot`:
        // - The contents of `state.genesis_time`.
        // - The contents of `state.genesis_validators_root`.
        let slot_start = UnixSeconds::SIZE.get() + H256::SIZE.get();
        let slot_end = slot_start + Slot::SIZE.get();
        let slot_bytes = ssz::subslice(bytes, slot_start..slot_end)?;
        let slot = Slot::from_ssz_default(slot_bytes)?;

        let state = match config.phase_at_slot::<P>(slot) {
            Phase::Phase0 => Self::Phase0(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Altair => Self::Altair(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Bellatrix => Self::Bellatrix(SszReadDefault::from_ssz_default(bytes)?),
        };

        assert_eq!(slot, state.slot());

        Ok(state)
    }
}

impl<P: Preset> SszWrite for BeaconState<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(state) => state.write_variable(bytes),
            Self::Altair(state) => state.write_variable(bytes),
            Self::Bellatrix(state) => state.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for BeaconState<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(state) => state.hash_tree_root(),
            Self::Altair(state) => state.hash_tree_root(),
            Self::Bellatrix(state) => state.hash_tree_root(),
        }
    }
}

impl<P: Preset> BeaconState<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(state) => state.slot,
            Self::Altair(state) => state.slot,
            Self::Bellatrix(state) => state.slot,
        }
    }

    #[must_use]
    pub fn genesis_time(&self) -> UnixSeconds {
        match self {
            Self::Phase0(state) => state.genesis_time,
            Self::Altair(state) => state.genesis_time,
            Self::Bellatrix(state) => state.genesis_time,
        }
    }

    #[must_use]
    pub fn genesis_validators_root(&self) -> H256 {
        match self {
            Self::Phase0(state) => state.genesis_validators_root,
            Self::Altair(state) => state.genesis_validators_root,
            Self::Bellatrix(state) => state.genesis_validators_root,
        }
    }

    #[must_use]
    pub fn latest_block_header(&self) -> BeaconBlockHeader {
        match self {
            Self::Phase0(state) => state.latest_block_header,
            Self::Altair(state) => state.latest_block_header,
            Self::Bellatrix(state) => state.latest_block_header,
        }
    }

    #[must_use]
    pub fn current_justified_checkpoint(&self) -> Checkpoint {
        match self {
            Self::Phase0(state) => state.current_justified_checkpoint,
            Self::Altair(state) => state.current_justified_checkpoint,
            Self::Bellatrix(state) => state.current_justified_checkpoint,
        }
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        match self {
            Self::Phase0(state) => state.finalized_checkpoint,
            Self::Altair(state) => state.finalized_checkpoint,
            Self::Bellatrix(state) => state.finalized_checkpoint,
        }
    }

    #[must_use]
    pub fn post_bellatrix(&self) -> Option<&BellatrixBeaconState<P>> {
        match self {
            Self::Bellatrix(state) => Some(state),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SignedBeaconBlock<P: Preset> {
    Phase0(Phase0SignedBeaconBlock<P>),
    Altair(AltairSignedBeaconBlock<P>),
    Bellatrix(BellatrixSignedBeaconBlock<P>),
}

#[duplicate_item(
    implementor                  variant;
    [Phase0SignedBeaconBlock]    [Phase0];
    [AltairSignedBeaconBlock]    [Altair];
    [BellatrixSignedBeaconBlock] [Bellatrix];
)]
impl<P: Preset> From<implementor<P>> for SignedBeaconBlock<P> {
    fn from(block: implementor<P>) -> Self {
        Self::variant(block)
    }
}

impl<P: Preset> SszSize for SignedBeaconBlock<P> {
    const SIZE: Size = Size::for_untagged_union::<VARIANT_COUNT>([
        Phase0SignedBeaconBlock::<P>::SIZE,
        AltairSignedBeaconBlock::<P>::SIZE,
        BellatrixSignedBeaconBlock::<P>::SIZE,
    ]);
}

impl<P: Preset> SszRead<Config> for SignedBeaconBlock<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        // The fixed parts of a signed block are the offset of `block.message`
        // and the contents of `block.signature`.
        let message_offset = ssz::read_offset(bytes)?;
        let slot_end = message_offset + Slot::SIZE.get();
        let slot_bytes = ssz::subslice(bytes, message_offset..slot_end)?;
        let slot = Slot::from_ssz_default(slot_bytes)?;

        let block = match config.phase_at_slot::<P>(slot) {
            Phase::Phase0 => Self::Phase0(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Altair => Self::Altair(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Bellatrix => Self::Bellatrix(SszReadDefault::from_ssz_default(bytes)?),
        };

        assert_eq!(slot, block.message_slot());

        Ok(block)
    }
}

impl<P: Preset> SszWrite for SignedBeaconBlock<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(block) => block.write_variable(bytes),
            Self::Altair(block) => block.write_variable(bytes),
            Self::Bellatrix(block) => block.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for SignedBeaconBlock<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.hash_tree_root(),
            Self::Altair(block) => block.hash_tree_root(),
            Self::Bellatrix(block) => block.hash_tree_root(),
        }
    }
}

impl<P: Preset> SignedBeaconBlock<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn message_slot(&self) -> Slot {
        match self {
            Self::Phase0(block) => block.message.slot,
            Self::Altair(block) => block.message.slot,
            Self::Bellatrix(block) => block.message.slot,
        }
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.message.parent_root,
            Self::Altair(block) => block.message.parent_root,
            Self::Bellatrix(block) => block.message.parent_root,
        }
    }

    #[must_use]
    pub fn state_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.message.state_root,
            Self::Altair(block) => block.message.state_root,
            Self::Bellatrix(block) => block.message.state_root,
        }
    }

    #[must_use]
    pub fn proposer_index(&self) -> ValidatorIndex {
        match self {
            Self::Phase0(block) => block.message.proposer_index,
            Self::Altair(block) => block.message.proposer_index,
            Self::Bellatrix(block) => block.message.proposer_index,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureBytes {
        match self {
            Self::Phase0(block) => block.signature,
            Self::Altair(block) => block.signature,
            Self::Bellatrix(block) => block.signature,
        }
    }

    /// The hash tree root of the block message. This is what block roots refer to everywhere.
    #[must_use]
    pub fn block_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.message.hash_tree_root(),
            Self::Altair(block) => block.message.hash_tree_root(),
            Self::Bellatrix(block) => block.message.hash_tree_root(),
        }
    }

    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        match self {
            Self::Phase0(block) => block.message.to_header(),
            Self::Altair(block) => block.message.to_header(),
            Self::Bellatrix(block) => block.message.to_header(),
        }
    }

    #[must_use]
    pub fn execution_payload(&self) -> Option<&ExecutionPayload<P>> {
        match self {
            Self::Phase0(_) | Self::Altair(_) => None,
            Self::Bellatrix(block) => Some(&block.message.body.execution_payload),
        }
    }

    #[must_use]
    pub fn execution_block_hash(&self) -> Option<ExecutionBlockHash> {
        self.execution_payload()
            .map(|payload| payload.block_hash)
    }

    #[must_use]
    pub fn sync_aggregate(&self) -> Option<&SyncAggregate<P>> {
        match self {
            Self::Phase0(_) => None,
            Self::Altair(block) => Some(&block.message.body.sync_aggregate),
            Self::Bellatrix(block) => Some(&block.message.body.sync_aggregate),
        }
    }

    #[must_use]
    pub fn attestation_count(&self) -> usize {
        match self {
            Self::Phase0(block) => block.message.body.attestations.len(),
            Self::Altair(block) => block.message.body.attestations.len(),
            Self::Bellatrix(block) => block.message.body.attestations.len(),
        }
    }
}
