use store::{Family, FamilyMember, Gateway, KvStore};

use super::state::Auth;
use crate::error::AuthError;
use crate::notify::{Notification, Notifier};
use crate::provider::IdentityProvider;

impl<G, K, N, P> Auth<G, K, N, P>
where
    G: Gateway,
    K: KvStore,
    N: Notifier,
    P: IdentityProvider,
{
    /// Create a family owned by the current user and select it.
    ///
    /// A signed-out caller gets `Ok(None)`. Unlike the other operations,
    /// persistence failures propagate so call sites can tell failure from
    /// the no-op; a failed save can leave the family record orphaned in
    /// storage, repaired by simply retrying.
    pub async fn create_family(&mut self, name: &str) -> Result<Option<Family>, AuthError> {
        let Some(user) = self.state.user.clone() else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() {
            self.notifier.notify(Notification::error(
                "Family name required",
                "Give your family a name to create it.",
            ));
            return Ok(None);
        }

        let family = Family::new(name, FamilyMember::of(&user));
        let mut updated = user;
        updated.join(&family.id);
        self.gateway.save_family_and_user(&family, &updated).await?;

        self.state.user = Some(updated);
        self.state.families.push(family.clone());
        self.state.current_family = Some(family.clone());
        self.publish();

        self.notifier.notify(Notification::success(
            "Family Created",
            &format!("{name} has been created successfully."),
        ));
        Ok(Some(family))
    }

    /// Select another of the user's families. Unknown ids and signed-out
    /// callers are silent no-ops.
    pub async fn switch_family(&mut self, family_id: &str) {
        let Some(user) = self.state.user.clone() else {
            return;
        };
        let Some(family) = self
            .state
            .families
            .iter()
            .find(|f| f.id == family_id)
            .cloned()
        else {
            return;
        };

        let mut updated = user;
        updated.current_family_id = Some(family.id.clone());
        match self.gateway.save_user(&updated).await {
            Ok(()) => {
                self.state.user = Some(updated);
                self.state.current_family = Some(family.clone());
                self.publish();
                self.notifier.notify(Notification::success(
                    "Family Switched",
                    &format!("You're now viewing {}.", family.name),
                ));
            }
            Err(e) => {
                tracing::error!("switch family error: {e}");
                self.notifier.notify(Notification::error(
                    "Switch failed",
                    "Could not switch families",
                ));
            }
        }
    }

    /// Join an existing family by id and select it. The membership entry
    /// lands on the family record first, then on the user record.
    pub async fn join_family(&mut self, family_id: &str) -> Option<Family> {
        let Some(user) = self.state.user.clone() else {
            return None;
        };

        let family = match self
            .gateway
            .add_member(family_id, &FamilyMember::of(&user))
            .await
        {
            Ok(Some(family)) => family,
            Ok(None) => {
                self.notifier
                    .notify(Notification::error("Join failed", "No such family"));
                return None;
            }
            Err(e) => {
                tracing::error!("join family error: {e}");
                self.notifier.notify(Notification::error(
                    "Join failed",
                    "Could not join the family",
                ));
                return None;
            }
        };

        let mut updated = user;
        updated.join(&family.id);
        if let Err(e) = self.gateway.save_user(&updated).await {
            tracing::error!("join family error: {e}");
            self.notifier.notify(Notification::error(
                "Join failed",
                "Could not update your profile",
            ));
            return None;
        }

        match self.state.families.iter().position(|f| f.id == family.id) {
            Some(pos) => self.state.families[pos] = family.clone(),
            None => self.state.families.push(family.clone()),
        }
        self.state.user = Some(updated);
        self.state.current_family = Some(family.clone());
        self.publish();

        self.notifier.notify(Notification::success(
            "Family Joined",
            &format!("Welcome to {}.", family.name),
        ));
        Some(family)
    }

    /// Rename the current user, refreshing the denormalized copy on every
    /// family that lists them in one write. In-memory state changes only
    /// after every persisted record has.
    pub async fn update_user_name(&mut self, new_name: &str) {
        let Some(user) = self.state.user.clone() else {
            return;
        };
        let new_name = new_name.trim();
        if new_name.is_empty() {
            self.notifier
                .notify(Notification::error("Update failed", "Name cannot be empty"));
            return;
        }

        let mut updated = user;
        updated.rename(new_name);

        if let Err(e) = self.gateway.save_user(&updated).await {
            tracing::error!("rename error: {e}");
            self.notifier.notify(Notification::error(
                "Update failed",
                "Could not save your profile",
            ));
            return;
        }

        let all = match self.gateway.get_families().await {
            Ok(all) => all,
            Err(e) => {
                tracing::error!("rename error: {e}");
                self.notifier.notify(Notification::error(
                    "Update failed",
                    "Could not refresh your families",
                ));
                return;
            }
        };
        let mut refreshed = Vec::new();
        for mut family in all {
            if family.rename_member(&updated.id, &updated.name, &updated.initials) {
                refreshed.push(family);
            }
        }
        if let Err(e) = self.gateway.save_families(&refreshed).await {
            tracing::error!("rename error: {e}");
            self.notifier.notify(Notification::error(
                "Update failed",
                "Could not refresh your families",
            ));
            return;
        }

        let (families, current) = match self.load_families(&updated).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("rename error: {e}");
                self.notifier.notify(Notification::error(
                    "Update failed",
                    "Could not refresh your families",
                ));
                return;
            }
        };
        self.set_signed_in(updated, families, current);

        self.notifier.notify(Notification::success(
            "Profile Updated",
            "Your name has been updated successfully.",
        ));
    }
}
