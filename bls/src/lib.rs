pub use crate::{
    cached_public_key::CachedPublicKey,
    error::Error,
    public_key::PublicKey,
    public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey,
    signature::{AggregateSignature, Signature},
    signature_bytes::SignatureBytes,
};

/// Aggregates are represented by the same compressed form as single values.
pub type AggregatePublicKeyBytes = PublicKeyBytes;
pub type AggregateSignatureBytes = SignatureBytes;

pub const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

mod cached_public_key;
mod error;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;
