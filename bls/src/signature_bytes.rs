use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256};
use typenum::U1;

pub const SIGNATURE_SIZE: usize = 96;

construct_fixed_hash! {
    pub struct SignatureBytes(SIGNATURE_SIZE);
}

impl_fixed_hash_serde!(SignatureBytes, SIGNATURE_SIZE);

impl AsRef<[u8; SIGNATURE_SIZE]> for SignatureBytes {
    fn as_ref(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl SszSize for SignatureBytes {
    const SIZE: Size = Size::Fixed {
        size: SIGNATURE_SIZE,
    };
}

impl<C> SszRead<C> for SignatureBytes {
    #[inline]
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for SignatureBytes {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for SignatureBytes {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        ssz::merkle_tree::merkleize_bytes(self.as_bytes(), 2)
    }
}

impl SignatureBytes {
    /// The compressed point at infinity. Used where no real signature exists yet,
    /// most notably in the RANDAO reveal of quick-start genesis states.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.as_bytes_mut()[0] = 0xc0;
        bytes
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::empty()
    }
}
