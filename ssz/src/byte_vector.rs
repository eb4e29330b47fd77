use core::{fmt::Debug, marker::PhantomData};

use ethereum_types::H256;
use typenum::{Unsigned, U1};

use crate::{
    error::ReadError,
    merkle_tree,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// An SSZ `Vector[uint8, N]`, used for fields like logs blooms.
pub struct ByteVector<N> {
    bytes: Box<[u8]>,
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for ByteVector<N> {
    fn default() -> Self {
        Self {
            bytes: vec![0; N::USIZE].into(),
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for ByteVector<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N> PartialEq for ByteVector<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<N> Eq for ByteVector<N> {}

impl<N> Debug for ByteVector<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(formatter, "0x")?;

        for byte in &self.bytes {
            write!(formatter, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl<N> AsRef<[u8]> for ByteVector<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N> AsMut<[u8]> for ByteVector<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl<N: Unsigned> TryFrom<&[u8]> for ByteVector<N> {
    type Error = ReadError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != N::USIZE {
            return Err(ReadError::VectorSizeMismatch {
                expected: N::USIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes: bytes.into(),
            phantom: PhantomData,
        })
    }
}

impl<N: Unsigned> SszSize for ByteVector<N> {
    const SIZE: Size = Size::Fixed { size: N::USIZE };
}

impl<C, N: Unsigned> SszRead<C> for ByteVector<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        bytes.try_into()
    }
}

impl<N: Unsigned> SszWrite for ByteVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.bytes);
    }
}

impl<N: Unsigned> SszHash for ByteVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let depth = merkle_tree::depth_for_elements::<u8>(N::U64);
        merkle_tree::merkleize_bytes(&self.bytes, depth)
    }
}
