use core::num::NonZeroU64;

use blst::{
    blst_scalar,
    min_pk::{AggregateSignature as RawAggregateSignature, Signature as RawSignature},
    BLST_ERROR,
};
use derive_more::From;
use itertools::Itertools as _;
use rand::Rng as _;

use crate::{
    error::Error, public_key::PublicKey, signature_bytes::SignatureBytes,
    DOMAIN_SEPARATION_TAG,
};

const MULTI_VERIFY_RANDOM_BYTES: usize = size_of::<NonZeroU64>();
const MULTI_VERIFY_RANDOM_BITS: usize = MULTI_VERIFY_RANDOM_BYTES * 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug, From)]
pub struct Signature(RawSignature);

impl TryFrom<SignatureBytes> for Signature {
    type Error = Error;

    #[inline]
    fn try_from(bytes: SignatureBytes) -> Result<Self, Self::Error> {
        RawSignature::uncompress(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl From<Signature> for SignatureBytes {
    #[inline]
    fn from(signature: Signature) -> Self {
        Self(signature.as_raw().compress())
    }
}

impl Signature {
    #[must_use]
    pub fn verify(&self, message: impl AsRef<[u8]>, public_key: PublicKey) -> bool {
        let result = self.as_raw().verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            &[],
            public_key.as_raw(),
            false,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    /// [`eth_fast_aggregate_verify`](https://github.com/ethereum/consensus-specs/blob/86fb82b221474cc89387fa6436806507b3849d88/specs/altair/bls.md#eth_fast_aggregate_verify)
    #[must_use]
    pub fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let public_keys = public_keys.into_iter().map(PublicKey::as_raw).collect_vec();

        let result = self.as_raw().fast_aggregate_verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    /// Batch verification of independent (message, signature, public key) triples.
    ///
    /// The random coefficients prevent forged triples from cancelling each other out.
    #[must_use]
    pub fn multi_verify<'all>(
        messages: impl IntoIterator<Item = &'all [u8]>,
        signatures: impl IntoIterator<Item = &'all Self>,
        public_keys: impl IntoIterator<Item = &'all PublicKey>,
    ) -> bool {
        let messages = messages.into_iter().collect_vec();
        let signatures = signatures.into_iter().map(Self::as_raw).collect_vec();
        let public_keys = public_keys.into_iter().map(PublicKey::as_raw).collect_vec();

        // `ThreadRng` is cryptographically secure.
        let mut rng = rand::thread_rng();

        let randoms = core::iter::repeat_with(|| {
            let mut scalar = blst_scalar::default();
            let nonzero_bytes = rng.gen::<NonZeroU64>().get().to_le_bytes();
            scalar.b[..MULTI_VERIFY_RANDOM_BYTES].copy_from_slice(&nonzero_bytes);
            scalar
        })
        .take(signatures.len())
        .collect_vec();

        let result = RawSignature::verify_multiple_aggregate_signatures(
            messages.as_slice(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
            false,
            signatures.as_slice(),
            true,
            randoms.as_slice(),
            MULTI_VERIFY_RANDOM_BITS,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    pub(crate) const fn as_raw(&self) -> &RawSignature {
        &self.0
    }
}

#[derive(Clone, Copy, From)]
pub struct AggregateSignature(RawAggregateSignature);

impl From<Signature> for AggregateSignature {
    #[inline]
    fn from(signature: Signature) -> Self {
        Self(RawAggregateSignature::from_signature(signature.as_raw()))
    }
}

impl AggregateSignature {
    pub fn aggregate_nonempty(
        signatures: impl IntoIterator<Item = Signature>,
    ) -> Result<Self, Error> {
        signatures
            .into_iter()
            .map(Self::from)
            .reduce(Self::aggregate)
            .ok_or(Error::InvalidSignature)
    }

    #[must_use]
    pub fn aggregate(mut self, other: Self) -> Self {
        self.0.add_aggregate(&other.0);
        self
    }

    #[must_use]
    pub fn to_signature(self) -> Signature {
        self.0.to_signature().into()
    }
}

#[cfg(test)]
mod tests {
    use crate::secret_key::SecretKey;

    use super::*;

    #[test]
    fn fast_aggregate_verify_accepts_an_aggregate_over_one_message() {
        let message = b"message";

        let secret_keys = [
            SecretKey::from_ikm(&[1; 32]).expect("ikm is long enough"),
            SecretKey::from_ikm(&[2; 32]).expect("ikm is long enough"),
        ];

        let public_keys = secret_keys
            .iter()
            .map(SecretKey::to_public_key)
            .collect_vec();

        let aggregate = AggregateSignature::aggregate_nonempty(
            secret_keys.iter().map(|secret_key| secret_key.sign(message)),
        )
        .expect("there are signatures to aggregate")
        .to_signature();

        assert!(aggregate.fast_aggregate_verify(message, &public_keys));
        assert!(!aggregate.fast_aggregate_verify(b"other", &public_keys));
    }

    #[test]
    fn multi_verify_accepts_independent_triples() {
        let secret_keys = [
            SecretKey::from_ikm(&[3; 32]).expect("ikm is long enough"),
            SecretKey::from_ikm(&[4; 32]).expect("ikm is long enough"),
        ];

        let messages: [&[u8]; 2] = [b"first", b"second"];

        let public_keys = secret_keys
            .iter()
            .map(SecretKey::to_public_key)
            .collect_vec();

        let signatures = secret_keys
            .iter()
            .zip(messages)
            .map(|(secret_key, message)| secret_key.sign(message))
            .collect_vec();

        assert!(Signature::multi_verify(
            messages,
            signatures.iter(),
            public_keys.iter(),
        ));
    }
}
