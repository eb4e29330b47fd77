use core::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;

use jwt_simple::prelude::{Claims, Duration, HS256Key, MACLike as _};
use thiserror::Error;

const JWT_SECRET_SIZE_MIN_BYTES: usize = 32;

#[derive(Clone, Default)]
pub struct AuthOptions {
    pub secret_path: Option<PathBuf>,
}

/// Produces the bearer tokens the Engine API requires when a JWT secret is
/// configured. Without a secret every request goes out unauthenticated.
#[derive(Default)]
pub struct Auth {
    secret: Option<HS256Key>,
}

// Prevent the secret key from ending up in logs.
impl Debug for Auth {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter
            .debug_struct("Auth")
            .field("secret", &self.secret.as_ref().map(|_| "…"))
            .finish()
    }
}

impl Auth {
    pub fn new(options: AuthOptions) -> Result<Self, AuthError> {
        let secret = match options.secret_path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| AuthError::SecretUnreadable { path, source })?;

                Some(Self::secret_from_hex(contents.trim())?)
            }
            None => None,
        };

        Ok(Self { secret })
    }

    pub fn token(&self) -> Result<Option<String>, AuthError> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };

        let claims = Claims::create(Duration::from_secs(60));

        let token = secret
            .authenticate(claims)
            .map_err(|_| AuthError::SigningFailed)?;

        Ok(Some(token))
    }

    fn secret_from_hex(digits: &str) -> Result<HS256Key, AuthError> {
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let bytes = hex::decode(digits).map_err(|_| AuthError::SecretNotHex)?;

        if bytes.len() < JWT_SECRET_SIZE_MIN_BYTES {
            return Err(AuthError::SecretTooShort);
        }

        Ok(HS256Key::from_bytes(bytes.as_slice()))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read JWT secret from {path:?}")]
    SecretUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JWT secret is not valid hex")]
    SecretNotHex,
    #[error("JWT secret must be at least {JWT_SECRET_SIZE_MIN_BYTES} bytes")]
    SecretTooShort,
    #[error("failed to sign JWT claims")]
    SigningFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_and_unprefixed_secrets_decode_identically() {
        let digits = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
        let prefixed = format!("0x{digits}");

        assert!(Auth::secret_from_hex(digits).is_ok());
        assert!(Auth::secret_from_hex(&prefixed).is_ok());
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(matches!(
            Auth::secret_from_hex("ffff"),
            Err(AuthError::SecretTooShort),
        ));
    }

    #[test]
    fn tokens_are_only_produced_with_a_secret() {
        let auth = Auth::default();
        assert_eq!(auth.token().expect("no secret cannot fail"), None);
    }
}
