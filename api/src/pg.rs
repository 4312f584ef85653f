//! # PostgreSQL gateway — the hosted row store (feature `server`)
//!
//! Implements [`store::Gateway`] over sqlx/Postgres, so the same auth core
//! runs against a hosted backend instead of local files. The schema keeps
//! the shapes the local backend uses: TEXT ids, a `TEXT[]` membership set
//! on `users`, and the denormalized member copies as JSONB on `families`.
//!
//! The multi-record writes ([`save_families`](store::Gateway::save_families),
//! [`save_family_and_user`](store::Gateway::save_family_and_user),
//! [`add_member`](store::Gateway::add_member)) each run inside one
//! transaction.
//!
//! The pool is a lazy, process-wide singleton behind a
//! [`tokio::sync::OnceCell`]: the first call reads `DATABASE_URL` (via
//! `dotenvy`), falling back to the coordinates from [`Settings`].

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use store::{Chore, Family, FamilyMember, Gateway, Message, ShoppingItem, StoreError, User};

use crate::settings::Settings;

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Get or initialize the shared connection pool.
pub async fn get_pool() -> Result<&'static PgPool, sqlx::Error> {
    POOL.get_or_try_init(|| async {
        dotenvy::dotenv().ok();

        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => Settings::new().unwrap_or_default().database.url(),
        };

        PgPoolOptions::new().max_connections(5).connect(&url).await
    })
    .await
}

/// Run the bundled migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

type UserRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Vec<String>,
    Option<String>,
);

fn user_from_row(row: UserRow) -> User {
    let (id, email, name, initials, password_hash, families, current_family_id) = row;
    User {
        id,
        email,
        name,
        initials,
        password_hash,
        families,
        current_family_id,
    }
}

const USER_COLUMNS: &str = "id, email, name, initials, password_hash, families, current_family_id";

type FamilyRow = (String, String, Json<Vec<FamilyMember>>);

fn family_from_row((id, name, Json(members)): FamilyRow) -> Family {
    Family { id, name, members }
}

type ChoreRow = (
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    bool,
    DateTime<Utc>,
);

fn chore_from_row(row: ChoreRow) -> Chore {
    let (id, title, family_id, assigned_user_id, due_date, is_complete, created_at) = row;
    Chore {
        id,
        title,
        family_id,
        assigned_user_id,
        due_date,
        is_complete,
        created_at,
    }
}

const CHORE_COLUMNS: &str =
    "id, title, family_id, assigned_user_id, due_date, is_complete, created_at";

type MessageRow = (String, String, String, String, DateTime<Utc>);

fn message_from_row((id, family_id, sender_id, text, timestamp): MessageRow) -> Message {
    Message {
        id,
        family_id,
        sender_id,
        text,
        timestamp,
    }
}

type ItemRow = (String, String, String, String, bool, DateTime<Utc>);

fn item_from_row((id, family_id, name, added_by_id, is_complete, added_at): ItemRow) -> ShoppingItem {
    ShoppingItem {
        id,
        family_id,
        name,
        added_by_id,
        is_complete,
        added_at,
    }
}

const ITEM_COLUMNS: &str = "id, family_id, name, added_by_id, is_complete, added_at";

/// [`store::Gateway`] over PostgreSQL rows.
#[derive(Clone, Debug)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect through the shared pool.
    pub async fn connect() -> Result<Self, StoreError> {
        let pool = get_pool().await.map_err(db_err)?;
        Ok(Self::new(pool.clone()))
    }

    async fn upsert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO users (id, email, name, initials, password_hash, families, current_family_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                email = $2,
                name = $3,
                initials = $4,
                password_hash = $5,
                families = $6,
                current_family_id = $7",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.initials)
        .bind(&user.password_hash)
        .bind(&user.families)
        .bind(&user.current_family_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn upsert_family<'e, E>(executor: E, family: &Family) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO families (id, name, members)
             VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET name = $2, members = $3",
        )
        .bind(&family.id)
        .bind(&family.name)
        .bind(Json(&family.members))
        .execute(executor)
        .await?;
        Ok(())
    }
}

impl Gateway for PgGateway {
    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users"))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(user_from_row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(user_from_row))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        Self::upsert_user(&self.pool, user).await.map_err(db_err)
    }

    async fn get_families(&self) -> Result<Vec<Family>, StoreError> {
        let rows: Vec<FamilyRow> = sqlx::query_as("SELECT id, name, members FROM families")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(family_from_row).collect())
    }

    async fn get_family_by_id(&self, family_id: &str) -> Result<Option<Family>, StoreError> {
        let row: Option<FamilyRow> =
            sqlx::query_as("SELECT id, name, members FROM families WHERE id = $1")
                .bind(family_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(family_from_row))
    }

    async fn save_family(&self, family: &Family) -> Result<(), StoreError> {
        Self::upsert_family(&self.pool, family).await.map_err(db_err)
    }

    async fn save_families(&self, families: &[Family]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for family in families {
            Self::upsert_family(&mut *tx, family).await.map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)
    }

    async fn save_family_and_user(&self, family: &Family, user: &User) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        Self::upsert_family(&mut *tx, family).await.map_err(db_err)?;
        Self::upsert_user(&mut *tx, user).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn add_member(
        &self,
        family_id: &str,
        member: &FamilyMember,
    ) -> Result<Option<Family>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row: Option<FamilyRow> =
            sqlx::query_as("SELECT id, name, members FROM families WHERE id = $1 FOR UPDATE")
                .bind(family_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut family = family_from_row(row);
        if !family.has_member(&member.user_id) {
            family.members.push(member.clone());
            sqlx::query("UPDATE families SET members = $2 WHERE id = $1")
                .bind(&family.id)
                .bind(Json(&family.members))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(Some(family))
    }

    async fn get_chores_by_family(&self, family_id: &str) -> Result<Vec<Chore>, StoreError> {
        let rows: Vec<ChoreRow> = sqlx::query_as(&format!(
            "SELECT {CHORE_COLUMNS} FROM chores WHERE family_id = $1"
        ))
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(chore_from_row).collect())
    }

    async fn save_chore(&self, chore: &Chore) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO chores (id, title, family_id, assigned_user_id, due_date, is_complete, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                title = $2,
                family_id = $3,
                assigned_user_id = $4,
                due_date = $5,
                is_complete = $6",
        )
        .bind(&chore.id)
        .bind(&chore.title)
        .bind(&chore.family_id)
        .bind(&chore.assigned_user_id)
        .bind(chore.due_date)
        .bind(chore.is_complete)
        .bind(chore.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_chore(&self, chore_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM chores WHERE id = $1")
            .bind(chore_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn toggle_chore(&self, chore_id: &str) -> Result<Option<Chore>, StoreError> {
        let row: Option<ChoreRow> = sqlx::query_as(&format!(
            "UPDATE chores SET is_complete = NOT is_complete WHERE id = $1
             RETURNING {CHORE_COLUMNS}"
        ))
        .bind(chore_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(chore_from_row))
    }

    async fn get_messages_by_family(&self, family_id: &str) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, family_id, sender_id, text, timestamp FROM messages
             WHERE family_id = $1 ORDER BY timestamp ASC",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn save_message(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, family_id, sender_id, text, timestamp)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&message.id)
        .bind(&message.family_id)
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_shopping_items_by_family(
        &self,
        family_id: &str,
    ) -> Result<Vec<ShoppingItem>, StoreError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_items WHERE family_id = $1"
        ))
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(item_from_row).collect())
    }

    async fn save_shopping_item(&self, item: &ShoppingItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shopping_items (id, family_id, name, added_by_id, is_complete, added_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                family_id = $2,
                name = $3,
                added_by_id = $4,
                is_complete = $5",
        )
        .bind(&item.id)
        .bind(&item.family_id)
        .bind(&item.name)
        .bind(&item.added_by_id)
        .bind(item.is_complete)
        .bind(item.added_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn toggle_shopping_item(&self, item_id: &str) -> Result<Option<ShoppingItem>, StoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE shopping_items SET is_complete = NOT is_complete WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(item_from_row))
    }

    async fn delete_shopping_item(&self, item_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM shopping_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn cleanup_shopping_items(&self, today: NaiveDate) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM shopping_items WHERE is_complete AND added_at::date <> $1")
            .bind(today)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
