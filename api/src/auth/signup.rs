use store::{Family, Gateway, KvStore, StoreError, User};

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
    /// Start the one-time-code signup flow, capturing the display name for
    /// the verification step. Leaves `user`/`families` untouched.
    pub async fn signup(&mut self, name: &str, email: &str) -> Option<Route> {
        let email = email.trim().to_lowercase();
        let name = name.trim();
        if !valid_email(&email) {
            self.notifier.notify(Notification::error(
                "Signup failed",
                "Enter a valid email address",
            ));
            return None;
        }
        if name.is_empty() {
            self.notifier
                .notify(Notification::error("Signup failed", "Name is required"));
            return None;
        }

        if let Err(e) = self.begin_otp(&email, Some(name)).await {
            tracing::error!("signup error: {e}");
            self.notifier.notify(Notification::error(
                "Signup failed",
                "Failed to send verification email",
            ));
            return None;
        }
        Some(Route::Verify)
    }

    /// Password signup. Creates the account through the provider, then the
    /// profile and its default family. Never errors to the caller.
    pub async fn signup_with_password(&mut self, name: &str, email: &str, password: &str) -> bool {
        let email = email.trim().to_lowercase();
        let name = name.trim();
        if !valid_email(&email) {
            self.notifier.notify(Notification::error(
                "Signup failed",
                "Enter a valid email address",
            ));
            return false;
        }
        if name.is_empty() {
            self.notifier
                .notify(Notification::error("Signup failed", "Name is required"));
            return false;
        }
        if password.len() < 8 {
            self.notifier.notify(Notification::error(
                "Signup failed",
                "Password must be at least 8 characters",
            ));
            return false;
        }

        let user_id = match self.provider.sign_up(&email, password, name).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("signup error: {}", e.message);
                self.notifier
                    .notify(Notification::error("Signup failed", &e.message));
                return false;
            }
        };

        // Resolve the profile the provider minted, or build one.
        let profile = match self.gateway.get_user_by_id(&user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                let mut profile = User::new(&email, name);
                profile.id = user_id.clone();
                profile
            }
            Err(e) => {
                tracing::error!("signup error: {e}");
                self.notifier.notify(Notification::error(
                    "Signup failed",
                    "Could not load your profile",
                ));
                return false;
            }
        };

        match self.establish(profile).await {
            Ok(()) => {
                self.notifier.notify(Notification::success(
                    "Account created",
                    "Your account and family have been created successfully.",
                ));
                true
            }
            Err(e) => {
                tracing::error!("signup error: {e}");
                self.notifier.notify(Notification::error(
                    "Signup failed",
                    "Failed to create account",
                ));
                false
            }
        }
    }

    /// Make `profile` the signed-in user: create the default family if
    /// they have none (family record first, then the user record pointing
    /// at it), persist the identity pointer, publish.
    pub(super) async fn establish(&mut self, mut profile: User) -> Result<(), StoreError> {
        if profile.families.is_empty() {
            let family = Family::default_for(&profile);
            profile.join(&family.id);
            self.gateway.save_family_and_user(&family, &profile).await?;
        }
        self.session.set_current_user_id(&profile.id).await?;
        let (families, current) = self.load_families(&profile).await?;
        self.set_signed_in(profile, families, current);
        Ok(())
    }
}
