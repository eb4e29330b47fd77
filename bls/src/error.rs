use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("public key bytes do not represent a valid point")]
    InvalidPublicKey,
    #[error("secret key material is invalid")]
    InvalidSecretKey,
    #[error("signature bytes do not represent a valid point")]
    InvalidSignature,
    #[error("no public keys to aggregate")]
    NoPublicKeysToAggregate,
}
