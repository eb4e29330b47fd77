use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};
use typenum::U1;

pub use ethereum_types::H256;

pub type CommitteeIndex = u64;
pub type DepositIndex = u64;
pub type Domain = H256;
pub type DomainType = H32;
pub type Epoch = u64;
pub type ExecutionAddress = ethereum_types::H160;
pub type ExecutionBlockHash = H256;
pub type ExecutionBlockNumber = u64;
pub type ForkDigest = H32;
pub type Gwei = u64;
pub type Slot = u64;
pub type Uint256 = ethereum_types::U256;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;
pub type Version = H32;

construct_fixed_hash! {
    pub struct H32(4);
}

impl_fixed_hash_serde!(H32, 4);

impl SszSize for H32 {
    const SIZE: Size = Size::Fixed {
        size: Self::len_bytes(),
    };
}

impl<C> SszRead<C> for H32 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H32 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H32 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        root[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        root
    }
}
