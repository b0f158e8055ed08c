//! # tb-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password hashing for accounts and random display names for guests.

use async_trait::async_trait;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::warn;
use tb_core::traits::AuthProvider;

/// Name shown to guests when no name list is configured.
pub const FALLBACK_GUEST_NAME: &str = "defaultName";

#[derive(Default)]
pub struct SimpleAuthProvider {
    argon2: Argon2<'static>,
}

impl SimpleAuthProvider {
    /// Uses Argon2id with the crate's default cost parameters.
    pub fn new() -> Self {
        Self::default()
    }
}

fn random_index(len: usize) -> Option<usize> {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => usize::try_from(u64::from_le_bytes(buf) % len as u64).ok(),
        Err(e) => {
            warn!("guest name randomness unavailable: {e}");
            None
        }
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    /// Hashes with a fresh random salt; the PHC string carries salt and params.
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Picks uniformly from `names`, falling back to a fixed name.
    fn guest_name(&self, names: &[String]) -> String {
        if names.is_empty() {
            return FALLBACK_GUEST_NAME.to_string();
        }
        random_index(names.len())
            .and_then(|i| names.get(i))
            .cloned()
            .unwrap_or_else(|| FALLBACK_GUEST_NAME.to_string())
    }
}
