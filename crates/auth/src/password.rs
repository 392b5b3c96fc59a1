//! Password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        Error as HashError, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
};
use rand::RngCore;

use crate::{AuthError, AuthResult};

/// Hashes and verifies user passwords.
///
/// Hashes are PHC strings, so verification reads the cost parameters from
/// the stored hash rather than from this hasher.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("algorithm", &"argon2id")
            .finish_non_exhaustive()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    /// Creates a hasher with the default Argon2id parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Creates a hasher with explicit costs: memory in KiB, iterations and
    /// parallelism.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Configuration(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Returns true if `password` matches `hash`.
    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }
}
