//! # Domain models for households and their shared data
//!
//! Defines the record kinds persisted by the storage gateway. All types are
//! `Serialize + Deserialize` so the same shapes work against the local
//! key-value backend and the hosted row store.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`User`] | A signed-up person. Carries the membership id set (`families`) and the currently selected family. `initials` is derived from `name` and refreshed by [`User::rename`]. |
//! | [`Family`] | A household — the tenancy boundary for chores, messages and shopping items. `members` holds a denormalized copy of each member's display fields, refreshed by the rename fan-out. |
//! | [`FamilyMember`] | The denormalized per-family copy of a user's display fields. |
//! | [`Chore`] | A task assigned to one member, due on a given day. |
//! | [`Message`] | A chat message within a family. |
//! | [`ShoppingItem`] | A shared shopping-list entry. |
//!
//! ## Helper functions
//!
//! - [`initials`] — first letter of every whitespace-separated name token,
//!   uppercased ("Jamie Lee Curtis" → "JLC").
//! - [`chores_on`] — chores due on a calendar day.
//! - [`completion_rate`] — percentage of a member's chores that are done.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user and their family memberships.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub initials: String,
    /// Argon2 PHC string, present only for password accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Ids of the families this user belongs to. Kept free of duplicates.
    pub families: Vec<String>,
    /// Must be `None` or an element of `families`.
    pub current_family_id: Option<String>,
}

impl User {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            initials: initials(name),
            password_hash: None,
            families: Vec::new(),
            current_family_id: None,
        }
    }

    /// Change the display name, keeping `initials` in sync.
    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        self.initials = initials(name);
    }

    /// Record membership in `family_id` and select it as current.
    pub fn join(&mut self, family_id: &str) {
        if !self.families.iter().any(|f| f == family_id) {
            self.families.push(family_id.to_string());
        }
        self.current_family_id = Some(family_id.to_string());
    }
}

/// Denormalized member entry carried on every [`Family`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub user_id: String,
    pub name: String,
    pub initials: String,
}

impl FamilyMember {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            initials: user.initials.clone(),
        }
    }
}

/// A household group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub members: Vec<FamilyMember>,
}

impl Family {
    pub fn new(name: &str, founder: FamilyMember) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            members: vec![founder],
        }
    }

    /// The auto-created family for a user who has none: "{name}'s Family".
    pub fn default_for(user: &User) -> Self {
        Self::new(&format!("{}'s Family", user.name), FamilyMember::of(user))
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// Refresh the denormalized display fields for one member.
    /// Returns `true` if an entry was updated.
    pub fn rename_member(&mut self, user_id: &str, name: &str, member_initials: &str) -> bool {
        match self.members.iter_mut().find(|m| m.user_id == user_id) {
            Some(member) => {
                member.name = name.to_string();
                member.initials = member_initials.to_string();
                true
            }
            None => false,
        }
    }
}

/// A task assigned to one family member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub title: String,
    pub family_id: String,
    pub assigned_user_id: String,
    pub due_date: DateTime<Utc>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl Chore {
    pub fn new(title: &str, family_id: &str, assigned_user_id: &str, due_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            family_id: family_id.to_string(),
            assigned_user_id: assigned_user_id.to_string(),
            due_date,
            is_complete: false,
            created_at: Utc::now(),
        }
    }
}

/// A chat message within a family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub family_id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(family_id: &str, sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            family_id: family_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A shared shopping-list entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub added_by_id: String,
    pub is_complete: bool,
    pub added_at: DateTime<Utc>,
}

impl ShoppingItem {
    pub fn new(family_id: &str, name: &str, added_by_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            family_id: family_id.to_string(),
            name: name.to_string(),
            added_by_id: added_by_id.to_string(),
            is_complete: false,
            added_at: Utc::now(),
        }
    }
}

/// Derive display initials from a name: the uppercased first character of
/// every whitespace-separated token, concatenated in order.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Chores due on the given calendar day.
pub fn chores_on(chores: &[Chore], date: NaiveDate) -> Vec<Chore> {
    chores
        .iter()
        .filter(|c| c.due_date.date_naive() == date)
        .cloned()
        .collect()
}

/// Percentage (0..=100) of the member's chores that are complete.
/// A member with no chores scores 0.
pub fn completion_rate(chores: &[Chore], user_id: &str) -> u8 {
    let assigned: Vec<&Chore> = chores.iter().filter(|c| c.assigned_user_id == user_id).collect();
    if assigned.is_empty() {
        return 0;
    }
    let done = assigned.iter().filter(|c| c.is_complete).count();
    ((done * 100) / assigned.len()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Jamie Lee Curtis"), "JLC");
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("Plato"), "P");
        assert_eq!(initials("  spaced   out  "), "SO");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_rename_keeps_initials_in_sync() {
        let mut user = User::new("sam@example.com", "Sam Ortiz");
        assert_eq!(user.initials, "SO");

        user.rename("Samuel Ortiz Vega");
        assert_eq!(user.name, "Samuel Ortiz Vega");
        assert_eq!(user.initials, "SOV");
    }

    #[test]
    fn test_join_deduplicates_and_selects() {
        let mut user = User::new("sam@example.com", "Sam Ortiz");
        user.join("fam-1");
        user.join("fam-2");
        user.join("fam-1");

        assert_eq!(user.families, vec!["fam-1", "fam-2"]);
        assert_eq!(user.current_family_id.as_deref(), Some("fam-1"));
    }

    #[test]
    fn test_default_family_name_and_founder() {
        let user = User::new("sam@example.com", "Sam Ortiz");
        let family = Family::default_for(&user);

        assert_eq!(family.name, "Sam Ortiz's Family");
        assert_eq!(family.members.len(), 1);
        assert_eq!(family.members[0].user_id, user.id);
        assert_eq!(family.members[0].initials, "SO");
    }

    #[test]
    fn test_rename_member_only_touches_matching_entry() {
        let sam = User::new("sam@example.com", "Sam Ortiz");
        let kim = User::new("kim@example.com", "Kim Park");
        let mut family = Family::new("Flat 12", FamilyMember::of(&sam));
        family.members.push(FamilyMember::of(&kim));

        assert!(family.rename_member(&sam.id, "Samuel Ortiz", "SO"));
        assert!(!family.rename_member("missing", "X", "X"));

        assert_eq!(family.members[0].name, "Samuel Ortiz");
        assert_eq!(family.members[1].name, "Kim Park");
    }

    #[test]
    fn test_chores_on_filters_by_day() {
        let due = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();
        let other = Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap();
        let chores = vec![
            Chore::new("Dishes", "fam", "u1", due),
            Chore::new("Trash", "fam", "u2", other),
            Chore::new("Vacuum", "fam", "u1", due),
        ];

        let today = chores_on(&chores, due.date_naive());
        assert_eq!(today.len(), 2);
        assert!(today.iter().all(|c| c.due_date.date_naive() == due.date_naive()));
    }

    #[test]
    fn test_completion_rate() {
        let due = Utc::now();
        let mut chores = vec![
            Chore::new("Dishes", "fam", "u1", due),
            Chore::new("Trash", "fam", "u1", due),
            Chore::new("Vacuum", "fam", "u1", due),
            Chore::new("Plants", "fam", "u2", due),
        ];
        chores[0].is_complete = true;
        chores[1].is_complete = true;

        assert_eq!(completion_rate(&chores, "u1"), 66);
        assert_eq!(completion_rate(&chores, "u2"), 0);
        assert_eq!(completion_rate(&chores, "nobody"), 0);
    }
}
