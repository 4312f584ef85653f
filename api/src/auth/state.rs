//! # The auth state machine
//!
//! [`Auth`] owns the signed-in user, their families and the selected
//! current family, and mediates every mutation of that state. It is built
//! from injected parts — no ambient singletons:
//!
//! - `G:` [`Gateway`] — row storage for users, families and feature data.
//! - `K:` [`KvStore`] — backing for the [`AuthSession`] payload, so
//!   pending-auth scalars and the identity pointer survive restarts.
//! - `N:` [`Notifier`] — where caught failures and confirmations surface.
//! - `P:` [`IdentityProvider`] — credential checks and session
//!   termination.
//!
//! Consumers either read the current [`AuthState`] snapshot or hold a
//! [`tokio::sync::watch`] receiver from [`Auth::subscribe`]; every
//! completed mutation publishes the new snapshot.
//!
//! The machine is single-owner: operations take `&mut self` and run to
//! completion (or to their next await) before anything else can observe
//! the state. Interleaving is only possible across awaited storage and
//! provider calls, and in-memory state is only assigned after those calls
//! succeed, so a failed operation leaves the snapshot untouched. There is
//! no in-flight duplicate-call protection and no cancellation.
//!
//! The operation implementations live in sibling modules, split the way
//! the flows group: `login`, `signup`, `verification`, `family`.

use tokio::sync::watch;

use store::{Family, Gateway, KvStore, StoreError, User};

use super::session::AuthSession;
use crate::notify::Notifier;
use crate::provider::IdentityProvider;

/// Snapshot of the authentication state.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub families: Vec<Family>,
    pub current_family: Option<Family>,
    /// True until the first [`Auth::bootstrap`] completes.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            families: Vec::new(),
            current_family: None,
            loading: true,
        }
    }
}

/// The auth state machine. See the module docs.
pub struct Auth<G, K, N, P>
where
    G: Gateway,
    K: KvStore,
    N: Notifier,
    P: IdentityProvider,
{
    pub(super) gateway: G,
    pub(super) session: AuthSession<K>,
    pub(super) notifier: N,
    pub(super) provider: P,
    pub(super) state: AuthState,
    publisher: watch::Sender<AuthState>,
}

impl<G, K, N, P> Auth<G, K, N, P>
where
    G: Gateway,
    K: KvStore,
    N: Notifier,
    P: IdentityProvider,
{
    pub fn new(gateway: G, session: AuthSession<K>, notifier: N, provider: P) -> Self {
        let state = AuthState::default();
        let (publisher, _) = watch::channel(state.clone());
        Self {
            gateway,
            session,
            notifier,
            provider,
            state,
            publisher,
        }
    }

    /// The current snapshot.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// A receiver that observes every published state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.publisher.subscribe()
    }

    pub(super) fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    /// Load the user's families and resolve the current one from
    /// `current_family_id`. A dangling or absent id resolves to `None`.
    pub(super) async fn load_families(
        &self,
        user: &User,
    ) -> Result<(Vec<Family>, Option<Family>), StoreError> {
        let all = self.gateway.get_families().await?;
        let families: Vec<Family> = all
            .into_iter()
            .filter(|f| user.families.contains(&f.id))
            .collect();
        let current = families
            .iter()
            .find(|f| Some(&f.id) == user.current_family_id.as_ref())
            .cloned();
        Ok((families, current))
    }

    pub(super) fn set_signed_in(
        &mut self,
        user: User,
        families: Vec<Family>,
        current: Option<Family>,
    ) {
        self.state.user = Some(user);
        self.state.families = families;
        self.state.current_family = current;
        self.publish();
    }

    /// Restore identity on process start: a saved user id, or a session
    /// held by the identity provider. Any lookup failure degrades to
    /// anonymous; `loading` always ends up false.
    pub async fn bootstrap(&mut self) {
        self.state.loading = true;
        self.publish();

        let saved = match self.session.current_user_id().await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("failed to read saved identity: {e}");
                None
            }
        };
        let identity = match saved {
            Some(id) => Some(id),
            None => match self.provider.session().await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!("provider session check failed: {}", e.message);
                    None
                }
            },
        };

        if let Some(id) = identity {
            match self.gateway.get_user_by_id(&id).await {
                Ok(Some(user)) => match self.load_families(&user).await {
                    Ok((families, current)) => {
                        self.state.user = Some(user);
                        self.state.families = families;
                        self.state.current_family = current;
                    }
                    Err(e) => tracing::error!("failed to load families: {e}"),
                },
                Ok(None) => {}
                Err(e) => tracing::error!("failed to load user {id}: {e}"),
            }
        }

        self.state.loading = false;
        self.publish();
    }
}

pub(super) fn valid_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@')
}
