//! # Identity providers
//!
//! [`IdentityProvider`] is the contract the auth machine delegates
//! credential handling to: password sign-in/sign-up, session termination,
//! and a probe for an already-established session. A hosted backend slots
//! in by implementing it; [`PasswordVault`] is the built-in local variant.
//!
//! ## [`PasswordVault`]
//!
//! Checks credentials against Argon2id hashes stored on the user records in
//! the gateway. Hashing uses a random [`OsRng`] salt and the default
//! (memory-hard) Argon2 parameters; the PHC string lands in
//! `User::password_hash`. The vault keeps only an in-memory marker of who
//! signed in — the pointer that survives restarts lives in the auth
//! session, not here.
//!
//! Every credential failure reads the same from the outside ("Invalid
//! email or password"), whether the account is missing, has no password,
//! or the password is wrong.

use std::sync::{Arc, Mutex};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use store::{Gateway, User};

/// Failure reported by an identity provider, with a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Contract for whichever identity backend the app is wired to.
pub trait IdentityProvider {
    /// Check credentials; returns the signed-in user id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, ProviderError>;
    /// Create an account; returns the new user id.
    async fn sign_up(&self, email: &str, password: &str, name: &str)
        -> Result<String, ProviderError>;
    async fn sign_out(&self) -> Result<(), ProviderError>;
    /// The currently signed-in user id, if the provider holds a session.
    async fn session(&self) -> Result<Option<String>, ProviderError>;
}

/// Local credential backend over gateway-stored Argon2 hashes.
#[derive(Clone, Debug)]
pub struct PasswordVault<G: Gateway> {
    gateway: G,
    current: Arc<Mutex<Option<String>>>,
}

impl<G: Gateway> PasswordVault<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            current: Arc::new(Mutex::new(None)),
        }
    }
}

impl<G: Gateway> IdentityProvider for PasswordVault<G> {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, ProviderError> {
        let user = self
            .gateway
            .get_user_by_email(email)
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let Some(user) = user else {
            return Err(ProviderError::new("Invalid email or password"));
        };
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(ProviderError::new("Invalid email or password"));
        };
        if !verify_password(password, hash)? {
            return Err(ProviderError::new("Invalid email or password"));
        }

        *self.current.lock().unwrap() = Some(user.id.clone());
        Ok(user.id)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<String, ProviderError> {
        let existing = self
            .gateway
            .get_user_by_email(email)
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;
        if existing.is_some() {
            return Err(ProviderError::new(
                "An account with this email already exists",
            ));
        }

        let mut user = User::new(email, name);
        user.password_hash = Some(hash_password(password)?);
        self.gateway
            .save_user(&user)
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        *self.current.lock().unwrap() = Some(user.id.clone());
        Ok(user.id)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        *self.current.lock().unwrap() = None;
        Ok(())
    }

    async fn session(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.current.lock().unwrap().clone())
    }
}

/// Hash a password with Argon2id. Returns a PHC-format string.
fn hash_password(password: &str) -> Result<String, ProviderError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ProviderError::new(format!("Failed to hash password: {e}")))
}

/// Verify a password against a PHC-format hash string.
fn verify_password(password: &str, hash: &str) -> Result<bool, ProviderError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| ProviderError::new(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{LocalGateway, MemoryStore};

    fn vault() -> PasswordVault<LocalGateway<MemoryStore>> {
        PasswordVault::new(LocalGateway::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let vault = vault();
        let id = vault
            .sign_up("sam@example.com", "hunter2hunter2", "Sam Ortiz")
            .await
            .unwrap();

        assert_eq!(vault.session().await.unwrap(), Some(id.clone()));

        vault.sign_out().await.unwrap();
        assert_eq!(vault.session().await.unwrap(), None);

        let again = vault
            .sign_in("sam@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(again, id);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let vault = vault();
        vault
            .sign_up("sam@example.com", "hunter2hunter2", "Sam Ortiz")
            .await
            .unwrap();
        vault.sign_out().await.unwrap();

        let err = vault
            .sign_in("sam@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid email or password");
        assert_eq!(vault.session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_account_reads_like_wrong_password() {
        let err = vault()
            .sign_in("nobody@example.com", "whatever")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid email or password");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let vault = vault();
        vault
            .sign_up("sam@example.com", "hunter2hunter2", "Sam Ortiz")
            .await
            .unwrap();

        let err = vault
            .sign_up("sam@example.com", "different-pass", "Sam Again")
            .await
            .unwrap_err();
        assert_eq!(err.message, "An account with this email already exists");
    }

    #[test]
    fn test_hashes_are_salted_and_verifiable() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret", &a).unwrap());
        assert!(!verify_password("other", &a).unwrap());
    }
}
