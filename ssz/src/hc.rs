use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
};

use ethereum_types::H256;
use once_cell::race::OnceBox;

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// A "Hash Cell". Or a "Hash Cache", if you prefer.
///
/// Memoizes the hash tree root of the wrapped value. Any mutable access
/// invalidates the cached root; sibling caches are unaffected.
#[derive(Default)]
pub struct Hc<T> {
    value: T,
    // `OnceBox` fits in one word, unlike `OnceCell<H256>`.
    // The drawback is that concurrent readers may redundantly compute the same root.
    cached_root: OnceBox<H256>,
}

impl<T: Clone> Clone for Hc<T> {
    fn clone(&self) -> Self {
        let value = self.value.clone();

        match self.cached_root.get().copied() {
            Some(root) => Self::with_root_internal(value, root),
            None => Self::from(value),
        }
    }
}

impl<T: PartialEq> PartialEq for Hc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Hc<T> {}

impl<T: Debug> Debug for Hc<T> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter
            .debug_struct("Hc")
            .field("value", &self.value)
            .field("cached_root", &self.cached_root.get())
            .finish()
    }
}

impl<T> Deref for Hc<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Hc<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.as_mut()
    }
}

impl<T> AsRef<T> for Hc<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> AsMut<T> for Hc<T> {
    fn as_mut(&mut self) -> &mut T {
        // Invalidate `cached_root` whenever `value` could potentially be modified.
        // This may be insufficient if `value` is internally mutable.
        self.cached_root = OnceBox::new();
        &mut self.value
    }
}

impl<T> From<T> for Hc<T> {
    fn from(value: T) -> Self {
        Self {
            value,
            cached_root: OnceBox::new(),
        }
    }
}

impl<T: SszSize> SszSize for Hc<T> {
    const SIZE: Size = T::SIZE;
}

impl<C, T: SszRead<C>> SszRead<C> for Hc<T> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_ssz_unchecked(context, bytes).map(Self::from)
    }
}

impl<T: SszWrite> SszWrite for Hc<T> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.value.write_fixed(bytes);
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        self.value.write_variable(bytes)
    }
}

impl<T: SszHash> SszHash for Hc<T> {
    type PackingFactor = T::PackingFactor;

    fn hash_tree_root(&self) -> H256 {
        *self
            .cached_root
            .get_or_init(|| Box::new(self.value.hash_tree_root()))
    }
}

impl<T> Hc<T> {
    pub fn set_cached_root(&self, root: H256) {
        if let Err(old_root) = self.cached_root.set(Box::new(root)) {
            panic!("cached_root already set (old_root: {old_root:?}, root: {root:?})");
        }
    }

    fn with_root_internal(value: T, root: H256) -> Self {
        let hc = Self::from(value);
        hc.set_cached_root(root);
        hc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_root_survives_cloning() {
        let hc = Hc::from(1_u64);
        let root = hc.hash_tree_root();
        let clone = hc.clone();

        assert_eq!(clone.hash_tree_root(), root);
    }

    #[test]
    fn mutable_access_invalidates_the_cache() {
        let mut hc = Hc::from(1_u64);
        let root_before = hc.hash_tree_root();

        *hc.as_mut() = 2;

        assert_ne!(hc.hash_tree_root(), root_before);
        assert_eq!(hc.hash_tree_root(), 2_u64.hash_tree_root());
    }
}
