//! # Row storage for the five record kinds
//!
//! [`Gateway`] is the typed contract the rest of the application consumes:
//! per-kind reads, id lookups, family-scoped queries and upsert-style saves
//! for users, families, chores, messages and shopping items. All reads and
//! writes go through the trait, so the same call sites work against the
//! local key-value backend or a hosted row store.
//!
//! Two multi-record operations exist for the writes that must not drift
//! apart:
//!
//! - [`Gateway::save_families`] — persist several family records as one
//!   write. The rename fan-out uses this so refreshed member copies land
//!   together.
//! - [`Gateway::save_family_and_user`] — persist a family and then the user
//!   referencing it, family first, so the user's foreign reference always
//!   points at an already-persisted family.
//!
//! ## [`LocalGateway`]
//!
//! The local implementation keeps each collection as one JSON array under a
//! fixed key (`choresync_users`, `choresync_families`, ...). Saves are
//! upserts by id; a missing collection reads as empty. Because a collection
//! is a single document, [`save_families`](Gateway::save_families) is a
//! single write here.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;
use crate::kv::KvStore;
use crate::models::{Chore, Family, FamilyMember, Message, ShoppingItem, User};

pub const USERS_KEY: &str = "choresync_users";
pub const FAMILIES_KEY: &str = "choresync_families";
pub const CHORES_KEY: &str = "choresync_chores";
pub const MESSAGES_KEY: &str = "choresync_messages";
pub const SHOPPING_ITEMS_KEY: &str = "choresync_shopping_items";

/// Typed row-store contract consumed by the auth core and feature code.
pub trait Gateway {
    async fn get_users(&self) -> Result<Vec<User>, StoreError>;
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_families(&self) -> Result<Vec<Family>, StoreError>;
    async fn get_family_by_id(&self, family_id: &str) -> Result<Option<Family>, StoreError>;
    async fn save_family(&self, family: &Family) -> Result<(), StoreError>;
    /// Persist several family records as one write.
    async fn save_families(&self, families: &[Family]) -> Result<(), StoreError>;
    /// Persist `family`, then `user`, in that order.
    async fn save_family_and_user(&self, family: &Family, user: &User) -> Result<(), StoreError>;
    /// Append `member` to the family's member list. Idempotent: an existing
    /// membership is left untouched. Returns the (possibly updated) family,
    /// or `None` if no such family exists.
    async fn add_member(
        &self,
        family_id: &str,
        member: &FamilyMember,
    ) -> Result<Option<Family>, StoreError>;

    async fn get_chores_by_family(&self, family_id: &str) -> Result<Vec<Chore>, StoreError>;
    async fn save_chore(&self, chore: &Chore) -> Result<(), StoreError>;
    async fn delete_chore(&self, chore_id: &str) -> Result<(), StoreError>;
    /// Flip a chore's completion flag. Returns the updated chore, or `None`
    /// if no such chore exists.
    async fn toggle_chore(&self, chore_id: &str) -> Result<Option<Chore>, StoreError>;

    /// Messages for a family, oldest first.
    async fn get_messages_by_family(&self, family_id: &str) -> Result<Vec<Message>, StoreError>;
    async fn save_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn get_shopping_items_by_family(
        &self,
        family_id: &str,
    ) -> Result<Vec<ShoppingItem>, StoreError>;
    async fn save_shopping_item(&self, item: &ShoppingItem) -> Result<(), StoreError>;
    async fn toggle_shopping_item(&self, item_id: &str) -> Result<Option<ShoppingItem>, StoreError>;
    async fn delete_shopping_item(&self, item_id: &str) -> Result<(), StoreError>;
    /// Drop completed items from days before `today`. Incomplete items and
    /// items completed today survive.
    async fn cleanup_shopping_items(&self, today: NaiveDate) -> Result<(), StoreError>;
}

/// [`Gateway`] over any [`KvStore`]: one JSON collection document per kind.
#[derive(Clone, Debug)]
pub struct LocalGateway<S: KvStore> {
    kv: S,
}

impl<S: KvStore> LocalGateway<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    async fn collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.kv.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Data {
                key: key.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_collection<T: Serialize>(
        &self,
        key: &str,
        rows: &[T],
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(rows).map_err(|source| StoreError::Data {
            key: key.to_string(),
            source,
        })?;
        self.kv.set(key, &raw).await
    }

    async fn upsert<T>(
        &self,
        key: &str,
        row: T,
        same: impl Fn(&T) -> bool,
    ) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut rows: Vec<T> = self.collection(key).await?;
        match rows.iter().position(|r| same(r)) {
            Some(pos) => rows[pos] = row,
            None => rows.push(row),
        }
        self.write_collection(key, &rows).await
    }
}

impl<S: KvStore> Gateway for LocalGateway<S> {
    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        self.collection(USERS_KEY).await
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.get_users().await?.into_iter().find(|u| u.id == user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.get_users().await?.into_iter().find(|u| u.email == email))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let id = user.id.clone();
        self.upsert(USERS_KEY, user.clone(), |u: &User| u.id == id).await
    }

    async fn get_families(&self) -> Result<Vec<Family>, StoreError> {
        self.collection(FAMILIES_KEY).await
    }

    async fn get_family_by_id(&self, family_id: &str) -> Result<Option<Family>, StoreError> {
        Ok(self
            .get_families()
            .await?
            .into_iter()
            .find(|f| f.id == family_id))
    }

    async fn save_family(&self, family: &Family) -> Result<(), StoreError> {
        let id = family.id.clone();
        self.upsert(FAMILIES_KEY, family.clone(), |f: &Family| f.id == id)
            .await
    }

    async fn save_families(&self, families: &[Family]) -> Result<(), StoreError> {
        let mut rows: Vec<Family> = self.collection(FAMILIES_KEY).await?;
        for family in families {
            match rows.iter().position(|f| f.id == family.id) {
                Some(pos) => rows[pos] = family.clone(),
                None => rows.push(family.clone()),
            }
        }
        self.write_collection(FAMILIES_KEY, &rows).await
    }

    async fn save_family_and_user(&self, family: &Family, user: &User) -> Result<(), StoreError> {
        self.save_family(family).await?;
        self.save_user(user).await
    }

    async fn add_member(
        &self,
        family_id: &str,
        member: &FamilyMember,
    ) -> Result<Option<Family>, StoreError> {
        let mut rows: Vec<Family> = self.collection(FAMILIES_KEY).await?;
        let Some(pos) = rows.iter().position(|f| f.id == family_id) else {
            return Ok(None);
        };
        if rows[pos].has_member(&member.user_id) {
            return Ok(Some(rows[pos].clone()));
        }
        rows[pos].members.push(member.clone());
        let joined = rows[pos].clone();
        self.write_collection(FAMILIES_KEY, &rows).await?;
        Ok(Some(joined))
    }

    async fn get_chores_by_family(&self, family_id: &str) -> Result<Vec<Chore>, StoreError> {
        let chores: Vec<Chore> = self.collection(CHORES_KEY).await?;
        Ok(chores.into_iter().filter(|c| c.family_id == family_id).collect())
    }

    async fn save_chore(&self, chore: &Chore) -> Result<(), StoreError> {
        let id = chore.id.clone();
        self.upsert(CHORES_KEY, chore.clone(), |c: &Chore| c.id == id).await
    }

    async fn delete_chore(&self, chore_id: &str) -> Result<(), StoreError> {
        let mut rows: Vec<Chore> = self.collection(CHORES_KEY).await?;
        rows.retain(|c| c.id != chore_id);
        self.write_collection(CHORES_KEY, &rows).await
    }

    async fn toggle_chore(&self, chore_id: &str) -> Result<Option<Chore>, StoreError> {
        let mut rows: Vec<Chore> = self.collection(CHORES_KEY).await?;
        let Some(chore) = rows.iter_mut().find(|c| c.id == chore_id) else {
            return Ok(None);
        };
        chore.is_complete = !chore.is_complete;
        let toggled = chore.clone();
        self.write_collection(CHORES_KEY, &rows).await?;
        Ok(Some(toggled))
    }

    async fn get_messages_by_family(&self, family_id: &str) -> Result<Vec<Message>, StoreError> {
        let messages: Vec<Message> = self.collection(MESSAGES_KEY).await?;
        let mut messages: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.family_id == family_id)
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn save_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut rows: Vec<Message> = self.collection(MESSAGES_KEY).await?;
        rows.push(message.clone());
        self.write_collection(MESSAGES_KEY, &rows).await
    }

    async fn get_shopping_items_by_family(
        &self,
        family_id: &str,
    ) -> Result<Vec<ShoppingItem>, StoreError> {
        let items: Vec<ShoppingItem> = self.collection(SHOPPING_ITEMS_KEY).await?;
        Ok(items.into_iter().filter(|i| i.family_id == family_id).collect())
    }

    async fn save_shopping_item(&self, item: &ShoppingItem) -> Result<(), StoreError> {
        let id = item.id.clone();
        self.upsert(SHOPPING_ITEMS_KEY, item.clone(), |i: &ShoppingItem| i.id == id)
            .await
    }

    async fn toggle_shopping_item(&self, item_id: &str) -> Result<Option<ShoppingItem>, StoreError> {
        let mut rows: Vec<ShoppingItem> = self.collection(SHOPPING_ITEMS_KEY).await?;
        let Some(item) = rows.iter_mut().find(|i| i.id == item_id) else {
            return Ok(None);
        };
        item.is_complete = !item.is_complete;
        let toggled = item.clone();
        self.write_collection(SHOPPING_ITEMS_KEY, &rows).await?;
        Ok(Some(toggled))
    }

    async fn delete_shopping_item(&self, item_id: &str) -> Result<(), StoreError> {
        let mut rows: Vec<ShoppingItem> = self.collection(SHOPPING_ITEMS_KEY).await?;
        rows.retain(|i| i.id != item_id);
        self.write_collection(SHOPPING_ITEMS_KEY, &rows).await
    }

    async fn cleanup_shopping_items(&self, today: NaiveDate) -> Result<(), StoreError> {
        let rows: Vec<ShoppingItem> = self.collection(SHOPPING_ITEMS_KEY).await?;
        let kept: Vec<ShoppingItem> = rows
            .into_iter()
            .filter(|i| !i.is_complete || i.added_at.date_naive() == today)
            .collect();
        self.write_collection(SHOPPING_ITEMS_KEY, &kept).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{Duration, Utc};

    fn gateway() -> LocalGateway<MemoryStore> {
        LocalGateway::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_save_user_is_upsert() {
        let gw = gateway();
        let mut user = User::new("sam@example.com", "Sam Ortiz");

        gw.save_user(&user).await.unwrap();
        user.rename("Samuel Ortiz");
        gw.save_user(&user).await.unwrap();

        let users = gw.get_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Samuel Ortiz");

        let by_email = gw.get_user_by_email("sam@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        let gw = gateway();
        let sam = User::new("sam@example.com", "Sam Ortiz");
        let kim = User::new("kim@example.com", "Kim Park");
        let family = Family::new("Flat 12", FamilyMember::of(&sam));
        gw.save_family(&family).await.unwrap();

        let joined = gw.add_member(&family.id, &FamilyMember::of(&kim)).await.unwrap();
        assert_eq!(joined.unwrap().members.len(), 2);

        let again = gw.add_member(&family.id, &FamilyMember::of(&kim)).await.unwrap();
        assert_eq!(again.unwrap().members.len(), 2);

        assert!(gw
            .add_member("missing", &FamilyMember::of(&kim))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_families_updates_every_record() {
        let gw = gateway();
        let sam = User::new("sam@example.com", "Sam Ortiz");
        let a = Family::new("Flat 12", FamilyMember::of(&sam));
        let b = Family::new("Lake House", FamilyMember::of(&sam));
        gw.save_families(&[a.clone(), b.clone()]).await.unwrap();

        let mut a2 = a.clone();
        let mut b2 = b.clone();
        a2.rename_member(&sam.id, "Samuel Ortiz", "SO");
        b2.rename_member(&sam.id, "Samuel Ortiz", "SO");
        gw.save_families(&[a2, b2]).await.unwrap();

        let families = gw.get_families().await.unwrap();
        assert_eq!(families.len(), 2);
        assert!(families
            .iter()
            .all(|f| f.members[0].name == "Samuel Ortiz"));
    }

    #[tokio::test]
    async fn test_toggle_chore() {
        let gw = gateway();
        let chore = Chore::new("Dishes", "fam", "u1", Utc::now());
        gw.save_chore(&chore).await.unwrap();

        let toggled = gw.toggle_chore(&chore.id).await.unwrap().unwrap();
        assert!(toggled.is_complete);
        let toggled = gw.toggle_chore(&chore.id).await.unwrap().unwrap();
        assert!(!toggled.is_complete);

        assert!(gw.toggle_chore("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messages_sorted_oldest_first() {
        let gw = gateway();
        let mut early = Message::new("fam", "u1", "first");
        let mut late = Message::new("fam", "u2", "second");
        early.timestamp = Utc::now() - Duration::hours(2);
        late.timestamp = Utc::now();

        gw.save_message(&late).await.unwrap();
        gw.save_message(&early).await.unwrap();
        gw.save_message(&Message::new("other", "u3", "elsewhere"))
            .await
            .unwrap();

        let messages = gw.get_messages_by_family("fam").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, "second");
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_completed_items() {
        let gw = gateway();
        let today = Utc::now().date_naive();

        let mut stale = ShoppingItem::new("fam", "Milk", "u1");
        stale.is_complete = true;
        stale.added_at = Utc::now() - Duration::days(2);

        let mut fresh = ShoppingItem::new("fam", "Eggs", "u1");
        fresh.is_complete = true;

        let open = ShoppingItem::new("fam", "Bread", "u2");

        gw.save_shopping_item(&stale).await.unwrap();
        gw.save_shopping_item(&fresh).await.unwrap();
        gw.save_shopping_item(&open).await.unwrap();

        gw.cleanup_shopping_items(today).await.unwrap();

        let items = gw.get_shopping_items_by_family("fam").await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(items.len(), 2);
        assert!(names.contains(&"Eggs"));
        assert!(names.contains(&"Bread"));
    }
}
