//! Pending-auth payload and the persisted identity pointer.
//!
//! These are the only values that must survive a restart; everything else
//! is reconstructed from the gateway on
//! [`Auth::bootstrap`](super::Auth::bootstrap). Semantics are plain
//! key-value: last write wins, reads return the last-written value, clear
//! removes the key. The pending fields are written when a login/signup
//! starts and cleared exactly once on successful verification; an
//! abandoned attempt leaves them in place until the next attempt
//! overwrites them. Stored verification codes never expire.

use store::{KvStore, StoreError};

/// Key for the email awaiting verification.
pub const PENDING_EMAIL_KEY: &str = "pending_auth_email";
/// Key for the display name captured at signup, awaiting verification.
pub const PENDING_NAME_KEY: &str = "pending_auth_name";
/// Key for the issued one-time code.
pub const VERIFICATION_CODE_KEY: &str = "verification_code";
/// Key for the path to land on after authentication.
pub const REDIRECT_KEY: &str = "redirect_after_auth";
/// Key for the persisted identity pointer.
pub const CURRENT_USER_KEY: &str = "current_user_id";

/// Session scalars over any [`KvStore`].
#[derive(Clone, Debug)]
pub struct AuthSession<K: KvStore> {
    kv: K,
}

impl<K: KvStore> AuthSession<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub async fn pending_email(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(PENDING_EMAIL_KEY).await
    }

    pub async fn set_pending_email(&self, email: &str) -> Result<(), StoreError> {
        self.kv.set(PENDING_EMAIL_KEY, email).await
    }

    pub async fn pending_name(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(PENDING_NAME_KEY).await
    }

    pub async fn set_pending_name(&self, name: &str) -> Result<(), StoreError> {
        self.kv.set(PENDING_NAME_KEY, name).await
    }

    pub async fn verification_code(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(VERIFICATION_CODE_KEY).await
    }

    pub async fn set_verification_code(&self, code: &str) -> Result<(), StoreError> {
        self.kv.set(VERIFICATION_CODE_KEY, code).await
    }

    /// Remove the pending email, name and verification code.
    pub async fn clear_pending(&self) -> Result<(), StoreError> {
        self.kv.remove(PENDING_EMAIL_KEY).await?;
        self.kv.remove(PENDING_NAME_KEY).await?;
        self.kv.remove(VERIFICATION_CODE_KEY).await
    }

    pub async fn set_redirect(&self, path: &str) -> Result<(), StoreError> {
        self.kv.set(REDIRECT_KEY, path).await
    }

    /// Read and clear the stored post-auth redirect target.
    pub async fn take_redirect(&self) -> Result<Option<String>, StoreError> {
        let path = self.kv.get(REDIRECT_KEY).await?;
        if path.is_some() {
            self.kv.remove(REDIRECT_KEY).await?;
        }
        Ok(path)
    }

    pub async fn current_user_id(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(CURRENT_USER_KEY).await
    }

    pub async fn set_current_user_id(&self, user_id: &str) -> Result<(), StoreError> {
        self.kv.set(CURRENT_USER_KEY, user_id).await
    }

    pub async fn clear_current_user_id(&self) -> Result<(), StoreError> {
        self.kv.remove(CURRENT_USER_KEY).await
    }
}
