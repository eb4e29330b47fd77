use core::{fmt::Debug, marker::PhantomData};

use ethereum_types::H256;
use typenum::{Unsigned, U1};

use crate::{
    error::{ReadError, WriteError},
    merkle_tree,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// An SSZ `Bitlist[N]`.
///
/// The delimiting bit only exists on the wire; `bytes` stores the payload bits alone.
pub struct BitList<N> {
    bytes: Box<[u8]>,
    length: usize,
    phantom: PhantomData<N>,
}

impl<N> Default for BitList<N> {
    fn default() -> Self {
        Self {
            bytes: [].into(),
            length: 0,
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for BitList<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            length: self.length,
            phantom: PhantomData,
        }
    }
}

impl<N> PartialEq for BitList<N> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.bytes == other.bytes
    }
}

impl<N> Eq for BitList<N> {}

impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter
            .debug_list()
            .entries((0..self.length).map(|index| u8::from(self.get(index))))
            .finish()
    }
}

impl<N> SszSize for BitList<N> {
    // The minimum is a lone delimiting bit.
    const SIZE: Size = Size::Variable { minimum_size: 1 };
}

impl<C, N: Unsigned> SszRead<C> for BitList<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let last = match bytes.last() {
            Some(0) | None => return Err(ReadError::BitListMissingDelimiter),
            Some(byte) => *byte,
        };

        let delimiter_position = 7 - last.leading_zeros() as usize;
        let length = (bytes.len() - 1) * 8 + delimiter_position;

        if length > N::USIZE {
            return Err(ReadError::ListTooLong {
                maximum: N::USIZE,
                actual: length,
            });
        }

        let mut payload = bytes.to_vec();
        payload[bytes.len() - 1] = last & !(1 << delimiter_position);

        // Keep storage at the minimal length so equality is structural.
        payload.truncate(length.div_ceil(8));

        Ok(Self {
            bytes: payload.into(),
            length,
            phantom: PhantomData,
        })
    }
}

impl<N> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();
        bytes.extend_from_slice(&self.bytes);

        if self.length % 8 == 0 {
            bytes.push(1);
        } else {
            bytes[start + self.length / 8] |= 1 << (self.length % 8);
        }

        Ok(())
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let depth = merkle_tree::depth_for_chunks(N::U64.div_ceil(256));
        let root = merkle_tree::merkleize_bytes(&self.bytes, depth);
        merkle_tree::mix_in_length(root, self.length)
    }
}

impl<N: Unsigned> BitList<N> {
    /// Constructs a list of `length` zero bits.
    #[must_use]
    pub fn with_length(length: usize) -> Self {
        assert!(length <= N::USIZE);

        Self {
            bytes: vec![0; length.div_ceil(8)].into(),
            length,
            phantom: PhantomData,
        }
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.length);
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.length);

        if value {
            self.bytes[index / 8] |= 1 << (index % 8);
        } else {
            self.bytes[index / 8] &= !(1 << (index % 8));
        }
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.length).filter(|index| self.get(*index))
    }

    /// True if every bit set in `other` is also set in `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.length == other.length
            && self
                .bytes
                .iter()
                .zip(other.bytes.iter())
                .all(|(own, others)| own & others == *others)
    }
}

#[cfg(test)]
mod tests {
    use typenum::U16;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn round_trip_preserves_length_and_bits() {
        let mut bits = BitList::<U16>::with_length(11);

        bits.set(0, true);
        bits.set(9, true);

        let bytes = bits.to_ssz().expect("bit list is serializable");
        let decoded = BitList::<U16>::from_ssz_default(bytes).expect("bytes round-trip");

        assert_eq!(decoded, bits);
        assert_eq!(decoded.len(), 11);
        assert_eq!(decoded.set_bits().collect::<Vec<_>>(), [0, 9]);
    }

    #[test]
    fn byte_aligned_lists_use_an_extra_delimiter_byte() {
        let bits = BitList::<U16>::with_length(8);
        let bytes = bits.to_ssz().expect("bit list is serializable");

        assert_eq!(bytes, [0, 1]);
    }

    #[test]
    fn missing_delimiter_is_rejected() {
        assert!(BitList::<U16>::from_ssz_default([0, 0]).is_err());
        assert!(BitList::<U16>::from_ssz_default([]).is_err());
    }

    #[test]
    fn length_above_the_limit_is_rejected() {
        // 17 zero bits followed by the delimiter.
        assert!(BitList::<U16>::from_ssz_default([0, 0, 0b10]).is_err());
    }
}
