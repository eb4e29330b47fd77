use ethereum_types::{H160, H256, U256};
use typenum::{U1, U32, U4};

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

impl SszSize for bool {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl<C> SszRead<C> for bool {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReadError::FixedSizeMismatch {
                expected: 1,
                actual: bytes.len(),
            }),
        }
    }
}

impl SszWrite for bool {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = (*self).into();
    }
}

impl SszHash for bool {
    type PackingFactor = U32;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        root.as_bytes_mut()[0] = (*self).into();
        root
    }
}

impl SszSize for u8 {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl<C> SszRead<C> for u8 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(bytes[0])
    }
}

impl SszWrite for u8 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = *self;
    }
}

impl SszHash for u8 {
    type PackingFactor = U32;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        root.as_bytes_mut()[0] = *self;
        root
    }
}

impl SszSize for u64 {
    const SIZE: Size = Size::Fixed {
        size: size_of::<Self>(),
    };
}

impl<C> SszRead<C> for u64 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let array = bytes
            .try_into()
            .map_err(|_| ReadError::FixedSizeMismatch {
                expected: size_of::<Self>(),
                actual: bytes.len(),
            })?;

        Ok(Self::from_le_bytes(array))
    }
}

impl SszWrite for u64 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.to_le_bytes());
    }
}

impl SszHash for u64 {
    type PackingFactor = U4;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        root[..size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
        root
    }
}

impl SszSize for U256 {
    const SIZE: Size = Size::Fixed { size: 32 };
}

impl<C> SszRead<C> for U256 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_little_endian(bytes))
    }
}

impl SszWrite for U256 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.to_little_endian(bytes);
    }
}

impl SszHash for U256 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        self.to_little_endian(root.as_bytes_mut());
        root
    }
}

impl SszSize for H256 {
    const SIZE: Size = Size::Fixed {
        size: Self::len_bytes(),
    };
}

impl<C> SszRead<C> for H256 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H256 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H256 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszSize for H160 {
    const SIZE: Size = Size::Fixed {
        size: Self::len_bytes(),
    };
}

impl<C> SszRead<C> for H160 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H160 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H160 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let mut root = H256::zero();
        root[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        root
    }
}

#[cfg(test)]
mod tests {
    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn u64_round_trip_is_little_endian() {
        let value = 0x0102_0304_0506_0708_u64;
        let bytes = value.to_ssz().expect("u64 is fixed size");

        assert_eq!(bytes, [8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(u64::from_ssz_default(bytes).expect("bytes round-trip"), value);
    }

    #[test]
    fn bool_rejects_bytes_other_than_zero_and_one() {
        assert_eq!(bool::from_ssz_default([0]), Ok(false));
        assert_eq!(bool::from_ssz_default([1]), Ok(true));
        assert!(bool::from_ssz_default([2]).is_err());
    }
}
