use core::fmt::{Debug, Formatter, Result as FmtResult};

use once_cell::race::OnceBox;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256};
use typenum::U1;

use crate::{error::Error, public_key::PublicKey, public_key_bytes::PublicKeyBytes};

/// A compressed public key that memoizes its decompressed form.
///
/// Decompression is by far the most expensive part of signature verification,
/// so validators keep their keys decompressed for the lifetime of the process.
#[derive(Default)]
pub struct CachedPublicKey {
    bytes: PublicKeyBytes,
    decompressed: OnceBox<PublicKey>,
}

impl From<PublicKeyBytes> for CachedPublicKey {
    #[inline]
    fn from(bytes: PublicKeyBytes) -> Self {
        Self {
            bytes,
            decompressed: OnceBox::new(),
        }
    }
}

impl From<PublicKey> for CachedPublicKey {
    #[inline]
    fn from(public_key: PublicKey) -> Self {
        Self::new(public_key.into(), public_key)
    }
}

impl Clone for CachedPublicKey {
    fn clone(&self) -> Self {
        match self.decompressed.get().copied() {
            Some(public_key) => Self::new(self.bytes, public_key),
            None => self.bytes.into(),
        }
    }
}

impl PartialEq for CachedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for CachedPublicKey {}

impl Debug for CachedPublicKey {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        self.bytes.fmt(formatter)
    }
}

impl SszSize for CachedPublicKey {
    const SIZE: Size = PublicKeyBytes::SIZE;
}

impl<C> SszRead<C> for CachedPublicKey {
    #[inline]
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        PublicKeyBytes::from_ssz_unchecked(context, bytes).map(Self::from)
    }
}

impl SszWrite for CachedPublicKey {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.bytes.write_fixed(bytes);
    }
}

impl SszHash for CachedPublicKey {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        self.bytes.hash_tree_root()
    }
}

impl CachedPublicKey {
    #[must_use]
    pub fn new(bytes: PublicKeyBytes, public_key: PublicKey) -> Self {
        let decompressed = OnceBox::new();

        decompressed
            .set(Box::new(public_key))
            .expect("decompressed is empty because OnceBox::new returns an empty cell");

        Self {
            bytes,
            decompressed,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &PublicKeyBytes {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub const fn to_bytes(&self) -> PublicKeyBytes {
        self.bytes
    }

    pub fn decompress(&self) -> Result<PublicKey, Error> {
        match self.decompressed.get() {
            Some(public_key) => Ok(*public_key),
            None => {
                let public_key = self.bytes.try_into()?;
                let _ = self.decompressed.get_or_init(|| Box::new(public_key));
                Ok(public_key)
            }
        }
    }
}
