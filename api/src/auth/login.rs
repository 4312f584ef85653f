use store::{Gateway, KvStore, StoreError};

use super::otp;
use super::state::{valid_email, Auth};
use crate::guard::Route;
use crate::notify::{Notification, Notifier};
use crate::provider::IdentityProvider;

impl<G, K, N, P> Auth<G, K, N, P>
where
    G: Gateway,
    K: KvStore,
    N: Notifier,
    P: IdentityProvider,
{
    /// Start the one-time-code login flow. Leaves `user`/`families`
    /// untouched; on success the caller should show the verification step.
    pub async fn login(&mut self, email: &str) -> Option<Route> {
        let email = email.trim().to_lowercase();
        if !valid_email(&email) {
            self.notifier.notify(Notification::error(
                "Login failed",
                "Enter a valid email address",
            ));
            return None;
        }

        if let Err(e) = self.begin_otp(&email, None).await {
            tracing::error!("login error: {e}");
            self.notifier.notify(Notification::error(
                "Login failed",
                "Failed to send verification email",
            ));
            return None;
        }
        Some(Route::Verify)
    }

    /// Record the pending payload and "send" the code.
    pub(super) async fn begin_otp(
        &mut self,
        email: &str,
        name: Option<&str>,
    ) -> Result<(), StoreError> {
        self.session.set_pending_email(email).await?;
        if let Some(name) = name {
            self.session.set_pending_name(name).await?;
        }
        let code = otp::issue();
        self.session.set_verification_code(&code).await?;
        self.notifier.notify(otp::announcement(email, &code));
        Ok(())
    }

    /// Password sign-in. Never errors to the caller: failures are reported
    /// through the notifier and yield `false`.
    pub async fn login_with_password(&mut self, email: &str, password: &str) -> bool {
        let email = email.trim().to_lowercase();

        let user_id = match self.provider.sign_in(&email, password).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("login error: {}", e.message);
                self.notifier
                    .notify(Notification::error("Login failed", &e.message));
                return false;
            }
        };

        match self.resume_profile(&user_id).await {
            Ok(true) => true,
            Ok(false) => {
                // Credentials were fine but no profile row exists yet; the
                // caller still gets a success, matching the provider.
                tracing::warn!("no profile for signed-in user {user_id}");
                true
            }
            Err(e) => {
                tracing::error!("login error: {e}");
                self.notifier.notify(Notification::error(
                    "Login failed",
                    "Could not load your profile",
                ));
                false
            }
        }
    }

    /// Load a signed-in user's profile and families, persist the identity
    /// pointer and publish. Returns false when no profile row exists.
    pub(super) async fn resume_profile(&mut self, user_id: &str) -> Result<bool, StoreError> {
        let Some(user) = self.gateway.get_user_by_id(user_id).await? else {
            return Ok(false);
        };
        let (families, current) = self.load_families(&user).await?;
        self.session.set_current_user_id(&user.id).await?;
        self.set_signed_in(user, families, current);
        Ok(true)
    }
}
