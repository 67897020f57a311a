//! Password hashing and verification.
//!
//! The digest input is `password || application secret || account salt`.
//! New digests are always Argon2id PHC strings whose embedded salt is the
//! account salt. Digests written by earlier deployments (bcrypt, and hex
//! SHA-256 of the same input) can still be verified, but are never produced.

use super::codec::Credentials;
use argon2::{
    password_hash::{self, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use base64ct::{Base64Unpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// 128 bits of salt.
const SALT_LEN: usize = 16;
const LEGACY_DIGEST_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to generate salt")]
    Rng,
    #[error("invalid account salt")]
    Salt,
    #[error("invalid hasher parameters")]
    Params,
    #[error("failed to hash password")]
    Hash,
    #[error("stored password digest is malformed")]
    MalformedDigest,
}

/// Format of a stored digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestScheme {
    Argon2id,
    /// `$2a$`, `$2b$` or `$2y$` modular crypt strings.
    LegacyBcrypt,
    LegacySha256,
}

impl DigestScheme {
    #[must_use]
    pub fn detect(digest: &str) -> Option<Self> {
        if digest.starts_with("$argon2") {
            Some(Self::Argon2id)
        } else if ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| digest.starts_with(prefix)) {
            Some(Self::LegacyBcrypt)
        } else if digest.len() == LEGACY_DIGEST_LEN && digest.chars().all(|ch| ch.is_ascii_hexdigit()) {
            Some(Self::LegacySha256)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct CredentialHasher {
    secret: SecretString,
    params: Params,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("secret", &"***")
            .field("params", &self.params)
            .finish()
    }
}

impl CredentialHasher {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            params: Params::default(),
        }
    }

    /// Override the Argon2 cost parameters (memory in KiB, iterations, lanes).
    ///
    /// # Errors
    /// Returns [`HashError::Params`] if Argon2 rejects the combination.
    pub fn with_cost(mut self, memory_kib: u32, iterations: u32, lanes: u32) -> Result<Self, HashError> {
        self.params = Params::new(memory_kib, iterations, lanes, None).map_err(|_| HashError::Params)?;
        Ok(self)
    }

    /// Fresh random salt, unpadded base64.
    ///
    /// # Errors
    /// Returns [`HashError::Rng`] if the OS RNG fails.
    pub fn generate_salt() -> Result<String, HashError> {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.try_fill_bytes(&mut bytes).map_err(|_| HashError::Rng)?;
        Ok(Base64Unpadded::encode_string(&bytes))
    }

    /// New salt and digest for `password`.
    ///
    /// # Errors
    /// Returns an error if salt generation or hashing fails.
    pub fn credentials(&self, password: &SecretString) -> Result<Credentials, HashError> {
        let salt = Self::generate_salt()?;
        let digest = self.hash(password.expose_secret(), &salt)?;
        Ok(Credentials::new(digest, salt))
    }

    /// Argon2id PHC digest of `plaintext || secret || salt`.
    ///
    /// # Errors
    /// Returns [`HashError::Salt`] if `salt` is not usable as an Argon2 salt.
    pub fn hash(&self, plaintext: &str, salt: &str) -> Result<String, HashError> {
        let argon_salt = SaltString::from_b64(salt).map_err(|_| HashError::Salt)?;
        let digest = self
            .argon2()
            .hash_password(&self.input(plaintext, salt), &argon_salt)
            .map_err(|_| HashError::Hash)?
            .to_string();
        Ok(digest)
    }

    /// Check `plaintext` against a stored salt and digest.
    ///
    /// Digests are compared in constant time: Argon2 through
    /// `password_hash::Output`, bcrypt by the `bcrypt` crate and SHA-256
    /// through `subtle`. bcrypt only reads the first 72 bytes of input.
    ///
    /// # Errors
    /// Returns [`HashError::MalformedDigest`] if the digest is in no
    /// supported format.
    pub fn verify(&self, plaintext: &str, salt: &str, digest: &str) -> Result<bool, HashError> {
        let input = self.input(plaintext, salt);
        match DigestScheme::detect(digest) {
            Some(DigestScheme::Argon2id) => {
                let parsed = PasswordHash::new(digest).map_err(|_| HashError::MalformedDigest)?;
                match self.argon2().verify_password(&input, &parsed) {
                    Ok(()) => Ok(true),
                    Err(password_hash::Error::Password) => Ok(false),
                    Err(_) => Err(HashError::MalformedDigest),
                }
            }
            Some(DigestScheme::LegacyBcrypt) => {
                bcrypt::verify(&input, digest).map_err(|_| HashError::MalformedDigest)
            }
            Some(DigestScheme::LegacySha256) => {
                let expected = hex::decode(digest).map_err(|_| HashError::MalformedDigest)?;
                let actual = Sha256::digest(&input);
                Ok(actual.as_slice().ct_eq(expected.as_slice()).into())
            }
            None => Err(HashError::MalformedDigest),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn input(&self, plaintext: &str, salt: &str) -> Vec<u8> {
        let secret = self.secret.expose_secret();
        let mut input = Vec::with_capacity(plaintext.len() + secret.len() + salt.len());
        input.extend_from_slice(plaintext.as_bytes());
        input.extend_from_slice(secret.as_bytes());
        input.extend_from_slice(salt.as_bytes());
        input
    }
}
