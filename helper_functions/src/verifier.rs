use anyhow::{ensure, Result};
use bls::{CachedPublicKey, PublicKey, Signature, SignatureBytes};
use types::phase0::primitives::H256;

use crate::error::{Error, SignatureKind};

/// Collects or verifies BLS signatures during block processing.
///
/// `NullVerifier` expresses "signatures already verified" (trusted blocks),
/// `SingleVerifier` verifies eagerly, and `MultiVerifier` batches everything
/// into one multi-signature check at the end.
pub trait Verifier {
    const IS_NULL: bool = false;

    fn reserve(&mut self, additional: usize) {
        let _ = additional;
    }

    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()>;

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

impl<V: Verifier> Verifier for &mut V {
    const IS_NULL: bool = V::IS_NULL;

    fn reserve(&mut self, additional: usize) {
        (*self).reserve(additional);
    }

    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_singular(signing_root, signature, public_key, kind)
    }

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_aggregate(signing_root, signature, public_keys, kind)
    }

    fn finish(&mut self) -> Result<()> {
        (*self).finish()
    }
}

#[derive(Clone, Copy, Default)]
pub struct NullVerifier;

impl Verifier for NullVerifier {
    const IS_NULL: bool = true;

    fn verify_singular(
        &mut self,
        _signing_root: H256,
        _signature: SignatureBytes,
        _public_key: &CachedPublicKey,
        _kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        _signing_root: H256,
        _signature: SignatureBytes,
        _public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        _kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress_signature(signature, kind)?;
        let public_key = decompress_public_key(public_key)?;

        ensure!(
            signature.verify(signing_root, public_key),
            Error::SignatureInvalid { kind },
        );

        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress_signature(signature, kind)?;

        let public_keys = public_keys
            .into_iter()
            .map(decompress_public_key)
            .collect::<Result<Vec<_>>>()?;

        ensure!(
            signature.fast_aggregate_verify(signing_root, public_keys.iter()),
            Error::SignatureInvalid { kind },
        );

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Batches signatures and verifies them all at once in `finish`.
#[derive(Default)]
pub struct MultiVerifier {
    triples: Vec<(H256, Signature, PublicKey, SignatureKind)>,
}

impl Verifier for MultiVerifier {
    fn reserve(&mut self, additional: usize) {
        self.triples.reserve(additional);
    }

    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress_signature(signature, kind)?;
        let public_key = decompress_public_key(public_key)?;

        self.triples.push((signing_root, signature, public_key, kind));

        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress_signature(signature, kind)?;

        let public_key = public_keys
            .into_iter()
            .map(decompress_public_key)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .reduce(PublicKey::aggregate)
            .ok_or(Error::AttestingIndicesEmpty)?;

        self.triples.push((signing_root, signature, public_key, kind));

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.triples.is_empty() {
            return Ok(());
        }

        let triples = core::mem::take(&mut self.triples);

        let messages = triples
            .iter()
            .map(|(signing_root, _, _, _)| signing_root.as_bytes())
            .collect::<Vec<_>>();

        let signatures = triples.iter().map(|(_, signature, _, _)| signature);
        let public_keys = triples.iter().map(|(_, _, public_key, _)| public_key);

        ensure!(
            Signature::multi_verify(messages.iter().copied(), signatures, public_keys),
            Error::SignatureInvalid {
                kind: SignatureKind::Block,
            },
        );

        Ok(())
    }
}

fn decompress_signature(signature: SignatureBytes, kind: SignatureKind) -> Result<Signature> {
    signature
        .try_into()
        .map_err(|_| Error::SignatureInvalid { kind }.into())
}

fn decompress_public_key(public_key: &CachedPublicKey) -> Result<PublicKey> {
    public_key
        .decompress()
        .map_err(|_| Error::PublicKeyInvalid.into())
}

#[cfg(test)]
mod tests {
    use bls::SecretKey;

    use super::*;

    #[test]
    fn multi_verifier_accepts_valid_and_rejects_forged_triples() {
        let secret_key = SecretKey::from_ikm(&[9; 32]).expect("ikm is long enough");
        let public_key = CachedPublicKey::from(secret_key.to_public_key());
        let signing_root = hashing::hash_64(1);
        let signature = SignatureBytes::from(secret_key.sign(signing_root));

        let mut verifier = MultiVerifier::default();

        verifier
            .verify_singular(signing_root, signature, &public_key, SignatureKind::Block)
            .expect("decompression succeeds");

        verifier.finish().expect("signature is valid");

        let mut verifier = MultiVerifier::default();

        verifier
            .verify_singular(
                hashing::hash_64(2),
                signature,
                &public_key,
                SignatureKind::Block,
            )
            .expect("decompression succeeds");

        verifier
            .finish()
            .expect_err("signature over a different message is invalid");
    }
}
