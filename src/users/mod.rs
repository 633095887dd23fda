pub mod commands;
pub mod model;

use crate::error::AuctionError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use tokio::task;

const TEMPORARY_PASSWORD_LEN: usize = 16;

/// Argon2 PHC string for `password`, computed on the blocking pool
pub async fn hash_password(password: &str) -> Result<String, AuctionError> {
    let password = password.to_string();
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuctionError::Internal(format!("password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AuctionError::Internal(format!("password hashing task failed: {}", e)))?
}

/// Checks `password` against a stored PHC string. Unparseable hashes never match.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuctionError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    task::spawn_blocking(move || match PasswordHash::new(&password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| AuctionError::Internal(format!("password verification task failed: {}", e)))
}

/// Random alphanumeric password handed to a rep after a reset
pub fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_verify_only_the_hashed_password() {
        let hash = hash_password("correct horse").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("battery staple", &hash).await.unwrap());
        assert!(!verify_password("correct horse", "not-a-hash").await.unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_leaves_the_runtime_free() {
        // on a single-threaded runtime the ticker only advances if hashing runs elsewhere
        let ticker = tokio::spawn(async {
            let mut ticks = 0;
            for _ in 0..5 {
                tokio::task::yield_now().await;
                ticks += 1;
            }
            ticks
        });
        let hash = hash_password("correct horse").await.unwrap();
        assert!(ticker.is_finished());
        assert_eq!(ticker.await.unwrap(), 5);
        assert!(verify_password("correct horse", &hash).await.unwrap());
    }

    #[test]
    fn temporary_passwords_are_random() {
        let a = temporary_password();
        let b = temporary_password();
        assert_eq!(a.len(), TEMPORARY_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
