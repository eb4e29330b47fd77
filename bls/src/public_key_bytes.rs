use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256};
use typenum::U1;

pub const COMPRESSED_SIZE: usize = 48;

construct_fixed_hash! {
    pub struct PublicKeyBytes(COMPRESSED_SIZE);
}

impl_fixed_hash_serde!(PublicKeyBytes, COMPRESSED_SIZE);

impl AsRef<[u8; COMPRESSED_SIZE]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8; COMPRESSED_SIZE] {
        &self.0
    }
}

impl SszSize for PublicKeyBytes {
    const SIZE: Size = Size::Fixed {
        size: COMPRESSED_SIZE,
    };
}

impl<C> SszRead<C> for PublicKeyBytes {
    #[inline]
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for PublicKeyBytes {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for PublicKeyBytes {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        ssz::merkle_tree::merkleize_bytes(self.as_bytes(), 1)
    }
}
