use core::{fmt::Debug, marker::PhantomData};

use ethereum_types::H256;
use typenum::{Unsigned, U1};

use crate::{
    error::{ReadError, WriteError},
    merkle_tree,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// An SSZ `List[uint8, N]`, used for opaque byte blobs like transactions and extra data.
pub struct ByteList<N> {
    bytes: Box<[u8]>,
    phantom: PhantomData<N>,
}

impl<N> Default for ByteList<N> {
    fn default() -> Self {
        Self {
            bytes: [].into(),
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for ByteList<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N> PartialEq for ByteList<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<N> Eq for ByteList<N> {}

impl<N> Debug for ByteList<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(formatter, "0x")?;

        for byte in &self.bytes {
            write!(formatter, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl<N> AsRef<[u8]> for ByteList<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned> TryFrom<&[u8]> for ByteList<N> {
    type Error = ReadError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() > N::USIZE {
            return Err(ReadError::ListTooLong {
                maximum: N::USIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes: bytes.into(),
            phantom: PhantomData,
        })
    }
}

impl<N> SszSize for ByteList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, N: Unsigned> SszRead<C> for ByteList<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        bytes.try_into()
    }
}

impl<N> SszWrite for ByteList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        bytes.extend_from_slice(&self.bytes);
        Ok(())
    }
}

impl<N: Unsigned> SszHash for ByteList<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let depth = merkle_tree::depth_for_elements::<u8>(N::U64);
        let root = merkle_tree::merkleize_bytes(&self.bytes, depth);
        merkle_tree::mix_in_length(root, self.bytes.len())
    }
}

impl<N> ByteList<N> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
