use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString},
};
use std::{
    fmt::{Debug, Formatter},
    str::FromStr,
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Stored password digest is not a valid PHC string: {0}")]
pub struct PasswordDigestDecodeError(password_hash::Error);

/// Argon2 digest of a user password in PHC string format, so the algorithm parameters travel
/// with the hash.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn hash(password: &str) -> Result<Self, PasswordHashError> {
        let salt: [u8; Salt::RECOMMENDED_LENGTH] = rand::random();
        let salt = SaltString::encode_b64(&salt).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Parameters are read from the digest itself, so digests made with older settings still
    /// verify.
    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let hash = PasswordHash::new(&self.0).map_err(PasswordHashError)?;

        match Argon2::default().verify_password(password.as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError(err)),
        }
    }

    #[must_use]
    pub fn as_encoded(&self) -> &str {
        &self.0
    }
}

impl FromStr for PasswordDigest {
    type Err = PasswordDigestDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PasswordHash::new(s).map_err(PasswordDigestDecodeError)?;

        Ok(Self(s.to_owned()))
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}
