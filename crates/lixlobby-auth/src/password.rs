//! Password hashing and verification (Argon2id).
//!
//! Stored hashes are PHC strings, so each one records the algorithm,
//! version, cost parameters and salt it was made with. Verification reads
//! those back out, re-derives from the submitted plaintext and compares
//! the two outputs with [`subtle::ConstantTimeEq`].
//!
//! Hashing is deliberately slow. Callers on an async runtime should run
//! these methods on a blocking thread (see
//! [`AuthService`](crate::AuthService)).

use argon2::password_hash::{PasswordHash, PasswordHasher, Salt, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{StoredHash, VerifyError};

const SALT_BYTES: usize = 16;

/// Argon2id cost parameters used for new hashes and for the dummy hash.
///
/// Defaults follow the OWASP baseline for Argon2id (19 MiB, 2 passes,
/// 1 lane).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Hashes new passwords and checks submitted ones against stored hashes.
///
/// Holds a dummy hash made with the configured parameters at construction
/// time. [`verify_dummy`](Self::verify_dummy) burns the same amount of
/// work as a real check, so "no such user" costs as much as "wrong
/// password".
pub struct PasswordVerifier {
    hasher: Argon2<'static>,
    dummy: StoredHash,
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVerifier")
            .field("params", self.hasher.params())
            .finish_non_exhaustive()
    }
}

impl PasswordVerifier {
    /// Builds a verifier and precomputes its dummy hash.
    ///
    /// # Errors
    /// [`VerifyError::Params`] if Argon2 rejects the cost parameters.
    pub fn new(config: &HashingConfig) -> Result<Self, VerifyError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| VerifyError::Params(e.to_string()))?;

        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // The dummy's plaintext is random and thrown away; nobody can
        // ever match it.
        let throwaway: [u8; 32] = rand::rng().random();
        let dummy = hash_with(&hasher, &hex::encode(throwaway))?;

        tracing::debug!(
            memory_kib = config.memory_kib,
            iterations = config.iterations,
            parallelism = config.parallelism,
            "password verifier ready"
        );

        Ok(Self { hasher, dummy })
    }

    /// Produces a new salted hash for `plaintext`.
    ///
    /// Used to provision credential stores; the auth core itself never
    /// writes user records.
    pub fn hash_password(&self, plaintext: &str) -> Result<StoredHash, VerifyError> {
        hash_with(&self.hasher, plaintext)
    }

    /// Checks `plaintext` against `stored`.
    ///
    /// # Returns
    /// - `Ok(true)` — exact match
    /// - `Ok(false)` — mismatch
    /// - `Err(VerifyError::Malformed)` — `stored` is corrupt. A dummy
    ///   derivation still runs first, so this path is not measurably
    ///   faster than a mismatch.
    pub fn verify(&self, plaintext: &str, stored: &StoredHash) -> Result<bool, VerifyError> {
        let target = match Target::parse(stored) {
            Ok(target) => target,
            Err(e) => {
                self.verify_dummy(plaintext);
                return Err(e);
            }
        };
        target.matches(plaintext)
    }

    /// Runs a full verification against the dummy hash and discards the
    /// outcome.
    pub fn verify_dummy(&self, plaintext: &str) {
        match Target::parse(&self.dummy) {
            Ok(target) => {
                let _ = target.matches(plaintext);
            }
            Err(e) => {
                tracing::error!(error = %e, "dummy password hash failed to parse");
            }
        }
    }
}

fn hash_with(hasher: &Argon2<'static>, plaintext: &str) -> Result<StoredHash, VerifyError> {
    let salt_bytes: [u8; SALT_BYTES] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| VerifyError::Hashing(e.to_string()))?;
    let hash = hasher
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| VerifyError::Hashing(e.to_string()))?;
    Ok(StoredHash::new(hash.to_string()))
}

/// A parsed stored hash: the hasher it asks for, its salt, and the
/// expected output.
struct Target {
    hasher: Argon2<'static>,
    salt: Vec<u8>,
    expected: Vec<u8>,
}

impl Target {
    fn parse(stored: &StoredHash) -> Result<Self, VerifyError> {
        let malformed = |e: &dyn std::fmt::Display| VerifyError::Malformed(e.to_string());

        let phc = PasswordHash::new(stored.as_str()).map_err(|e| malformed(&e))?;
        let algorithm = Algorithm::new(phc.algorithm.as_str()).map_err(|e| malformed(&e))?;
        let version = match phc.version {
            Some(v) => Version::try_from(v).map_err(|e| malformed(&e))?,
            None => Version::default(),
        };
        let params = Params::try_from(&phc).map_err(|e| malformed(&e))?;

        let salt = phc
            .salt
            .ok_or_else(|| VerifyError::Malformed("missing salt".into()))?;
        let mut salt_buf = [0u8; Salt::MAX_LENGTH];
        let salt = salt.decode_b64(&mut salt_buf).map_err(|e| malformed(&e))?.to_vec();

        let expected = phc
            .hash
            .ok_or_else(|| VerifyError::Malformed("missing hash output".into()))?
            .as_bytes()
            .to_vec();

        Ok(Self {
            hasher: Argon2::new(algorithm, version, params),
            salt,
            expected,
        })
    }

    fn matches(&self, plaintext: &str) -> Result<bool, VerifyError> {
        let mut derived = Zeroizing::new(vec![0u8; self.expected.len()]);
        self.hasher
            .hash_password_into(plaintext.as_bytes(), &self.salt, &mut derived)
            .map_err(|e| VerifyError::Hashing(e.to_string()))?;
        Ok(derived.as_slice().ct_eq(self.expected.as_slice()).into())
    }
}
