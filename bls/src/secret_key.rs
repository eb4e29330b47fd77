use core::fmt::{Debug, Formatter, Result as FmtResult};

use blst::min_pk::SecretKey as RawSecretKey;

use crate::{
    error::Error, public_key::PublicKey, signature::Signature, DOMAIN_SEPARATION_TAG,
};

pub struct SecretKey(RawSecretKey);

// Prevent the key material from ending up in logs.
impl Debug for SecretKey {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("SecretKey(…)")
    }
}

impl SecretKey {
    pub fn from_ikm(ikm: &[u8]) -> Result<Self, Error> {
        RawSecretKey::key_gen(ikm, &[])
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        RawSecretKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        self.0.sk_to_pk().into()
    }

    #[must_use]
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.0
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_with_the_matching_public_key() {
        let secret_key = SecretKey::from_ikm(&[1; 32]).expect("ikm is long enough");
        let public_key = secret_key.to_public_key();
        let signature = secret_key.sign(b"message");

        assert!(signature.verify(b"message", public_key));
        assert!(!signature.verify(b"other message", public_key));
    }
}
