use core::{fmt::Debug, hash::Hash, hash::Hasher, marker::PhantomData};

use ethereum_types::H256;
use typenum::{Unsigned, U1};

use crate::{
    error::{ReadError, WriteError},
    merkle_tree,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
};

/// An SSZ `List` with the maximum length `N`.
pub struct ContiguousList<T, N> {
    elements: Box<[T]>,
    phantom: PhantomData<N>,
}

impl<T, N> Default for ContiguousList<T, N> {
    fn default() -> Self {
        Self::new_unchecked([].into())
    }
}

impl<T: Clone, N> Clone for ContiguousList<T, N> {
    fn clone(&self) -> Self {
        Self::new_unchecked(self.elements.clone())
    }
}

impl<T: PartialEq, N> PartialEq for ContiguousList<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq, N> Eq for ContiguousList<T, N> {}

impl<T: Hash, N> Hash for ContiguousList<T, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.elements.hash(state);
    }
}

impl<T: Debug, N> Debug for ContiguousList<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.elements.fmt(formatter)
    }
}

impl<T, N> core::ops::Deref for ContiguousList<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.elements
    }
}

impl<T, N> core::ops::DerefMut for ContiguousList<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.elements
    }
}

impl<T, N> AsRef<[T]> for ContiguousList<T, N> {
    fn as_ref(&self) -> &[T] {
        &self.elements
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        Self::validate_length(vec.len())?;
        Ok(Self::new_unchecked(vec.into()))
    }
}

impl<T, N> IntoIterator for ContiguousList<T, N> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_vec().into_iter()
    }
}

impl<'list, T, N> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = <&'list [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: SszSize, N> SszSize for ContiguousList<T, N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, T: SszRead<C>, N: Unsigned> SszRead<C> for ContiguousList<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        shared::read_elements(context, bytes)?.try_into()
    }
}

impl<T: SszWrite, N> SszWrite for ContiguousList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousList<T, N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle_tree::merkleize_elements(self, N::U64);
        merkle_tree::mix_in_length(root, self.len())
    }
}

impl<T, N: Unsigned> ContiguousList<T, N> {
    pub fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, ReadError> {
        Vec::from_iter(elements).try_into()
    }

    /// Appends an element, failing if the list is at its maximum length.
    ///
    /// The elements are stored in a `Box<[T]>`, so this reallocates every time.
    /// The lists this is called on are either small or grow rarely.
    pub fn push(&mut self, element: T) -> Result<(), ReadError> {
        Self::validate_length(self.len() + 1)?;

        let mut elements = core::mem::take(&mut self.elements).into_vec();
        elements.push(element);
        self.elements = elements.into();

        Ok(())
    }

    #[must_use]
    pub fn maximum() -> usize {
        N::USIZE
    }

    const fn validate_length(actual: usize) -> Result<(), ReadError> {
        let maximum = N::USIZE;

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(())
    }
}

impl<T, N> ContiguousList<T, N> {
    #[must_use]
    pub fn map<U>(self, function: impl FnMut(T) -> U) -> ContiguousList<U, N> {
        ContiguousList::new_unchecked(self.into_iter().map(function).collect())
    }

    fn new_unchecked(elements: Box<[T]>) -> Self {
        Self {
            elements,
            phantom: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use typenum::U4;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn length_is_validated_on_construction() {
        assert!(ContiguousList::<u64, U4>::try_from(vec![1, 2, 3, 4]).is_ok());
        assert!(ContiguousList::<u64, U4>::try_from(vec![1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn fixed_size_elements_round_trip() {
        let list = ContiguousList::<u64, U4>::try_from(vec![1, 2, 3]).expect("length is valid");
        let bytes = list.to_ssz().expect("list is serializable");

        assert_eq!(bytes.len(), 24);
        assert_eq!(
            ContiguousList::<u64, U4>::from_ssz_default(bytes).expect("bytes round-trip"),
            list,
        );
    }

    #[test]
    fn variable_size_elements_round_trip() {
        type Inner = ContiguousList<u64, U4>;

        let inner = Inner::try_from(vec![5, 6]).expect("length is valid");
        let list =
            ContiguousList::<Inner, U4>::try_from(vec![inner.clone(), Inner::default(), inner])
                .expect("length is valid");

        let bytes = list.to_ssz().expect("list is serializable");

        assert_eq!(
            ContiguousList::<Inner, U4>::from_ssz_default(bytes).expect("bytes round-trip"),
            list,
        );
    }
}
