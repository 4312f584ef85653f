use store::{Gateway, KvStore, User};

use super::otp;
use super::state::Auth;
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
    /// Check a submitted one-time code against the pending payload.
    ///
    /// A rejected code changes nothing and can be retried indefinitely. An
    /// accepted code resolves or creates the user for the pending email
    /// (with a default family if they have none), clears the pending
    /// payload, and returns the stored post-auth redirect target
    /// (default `/`).
    pub async fn verify_otp(&mut self, code: &str) -> Option<Route> {
        let stored = match self.session.verification_code().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("failed to read verification code: {e}");
                None
            }
        };
        if !otp::accept(code, stored.as_deref()) {
            self.notifier.notify(Notification::error(
                "Invalid Code",
                "The verification code you entered is incorrect. Please try again.",
            ));
            return None;
        }

        let email = self.session.pending_email().await.ok().flatten().unwrap_or_default();
        let name = self
            .session
            .pending_name()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "User".to_string());

        let profile = match self.gateway.get_user_by_email(&email).await {
            Ok(Some(profile)) => profile,
            Ok(None) => User::new(&email, &name),
            Err(e) => {
                tracing::error!("verification error: {e}");
                self.notifier.notify(Notification::error(
                    "Verification failed",
                    "Failed to verify your code",
                ));
                return None;
            }
        };

        if let Err(e) = self.establish(profile).await {
            tracing::error!("verification error: {e}");
            self.notifier.notify(Notification::error(
                "Verification failed",
                "Failed to verify your code",
            ));
            return None;
        }

        if let Err(e) = self.session.clear_pending().await {
            tracing::error!("failed to clear pending payload: {e}");
        }
        let target = match self.session.take_redirect().await {
            Ok(Some(path)) => path,
            _ => "/".to_string(),
        };

        self.notifier.notify(Notification::success(
            "Authentication Successful",
            "You've been successfully logged in.",
        ));
        Some(Route::To(target))
    }

    /// End the session. Local state is cleared only once the provider
    /// confirms sign-out; a provider failure leaves everything in place.
    pub async fn logout(&mut self) -> Option<Route> {
        if let Err(e) = self.provider.sign_out().await {
            tracing::error!("logout error: {}", e.message);
            self.notifier
                .notify(Notification::error("Logout failed", &e.message));
            return None;
        }

        if let Err(e) = self.session.clear_current_user_id().await {
            tracing::error!("failed to clear saved identity: {e}");
        }
        self.state.user = None;
        self.state.families = Vec::new();
        self.state.current_family = None;
        self.publish();
        Some(Route::Login)
    }
}
