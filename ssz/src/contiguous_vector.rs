use core::{fmt::Debug, marker::PhantomData};

use ethereum_types::H256;
use typenum::{Unsigned, U1};

use crate::{
    error::{ReadError, WriteError},
    merkle_tree,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
};

/// An SSZ `Vector` with exactly `N` elements.
pub struct ContiguousVector<T, N> {
    elements: Box<[T]>,
    phantom: PhantomData<N>,
}

impl<T: Clone + Default, N: Unsigned> Default for ContiguousVector<T, N> {
    fn default() -> Self {
        Self::repeat(T::default())
    }
}

impl<T: Clone, N> Clone for ContiguousVector<T, N> {
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T: PartialEq, N> PartialEq for ContiguousVector<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq, N> Eq for ContiguousVector<T, N> {}

impl<T: Debug, N> Debug for ContiguousVector<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.elements.fmt(formatter)
    }
}

impl<T, N> core::ops::Deref for ContiguousVector<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.elements
    }
}

impl<T, N> core::ops::DerefMut for ContiguousVector<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.elements
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousVector<T, N> {
    type Error = ReadError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        if vec.len() != N::USIZE {
            return Err(ReadError::VectorSizeMismatch {
                expected: N::USIZE,
                actual: vec.len(),
            });
        }

        Ok(Self {
            elements: vec.into(),
            phantom: PhantomData,
        })
    }
}

impl<T: SszSize, N: Unsigned> SszSize for ContiguousVector<T, N> {
    const SIZE: Size = match T::SIZE {
        Size::Fixed { size } => Size::Fixed {
            size: size * N::USIZE,
        },
        Size::Variable { .. } => Size::Variable { minimum_size: 0 },
    };
}

impl<C, T: SszRead<C>, N: Unsigned> SszRead<C> for ContiguousVector<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        shared::read_elements(context, bytes)?.try_into()
    }
}

impl<T: SszWrite, N: Unsigned> SszWrite for ContiguousVector<T, N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        let size = T::SIZE.get();

        for (element, chunk) in self.iter().zip(bytes.chunks_exact_mut(size)) {
            element.write_fixed(chunk);
        }
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousVector<T, N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle_tree::merkleize_elements(self, N::U64)
    }
}

impl<T, N: Unsigned> ContiguousVector<T, N> {
    #[must_use]
    pub fn repeat(element: T) -> Self
    where
        T: Clone,
    {
        Self {
            elements: vec![element; N::USIZE].into(),
            phantom: PhantomData,
        }
    }

    /// Indexes the vector modulo its length, the access pattern of the root rings in the state.
    #[must_use]
    pub fn mod_index(&self, index: u64) -> &T {
        &self.elements[(index % N::U64) as usize]
    }

    #[must_use]
    pub fn mod_index_mut(&mut self, index: u64) -> &mut T {
        &mut self.elements[(index % N::U64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use typenum::U3;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn length_must_match_exactly() {
        assert!(ContiguousVector::<u64, U3>::try_from(vec![1, 2, 3]).is_ok());
        assert!(ContiguousVector::<u64, U3>::try_from(vec![1, 2]).is_err());
    }

    #[test]
    fn fixed_size_round_trip() {
        let vector =
            ContiguousVector::<u64, U3>::try_from(vec![7, 8, 9]).expect("length matches");
        let bytes = vector.to_ssz().expect("vector is serializable");

        assert_eq!(bytes.len(), 24);
        assert_eq!(
            ContiguousVector::<u64, U3>::from_ssz_default(bytes).expect("bytes round-trip"),
            vector,
        );
    }

    #[test]
    fn mod_index_wraps_around() {
        let vector =
            ContiguousVector::<u64, U3>::try_from(vec![10, 11, 12]).expect("length matches");

        assert_eq!(*vector.mod_index(1), 11);
        assert_eq!(*vector.mod_index(4), 11);
    }
}
