//! `PostgreSQL` item store.
//!
//! Uses `sqlx::PgPool`. Status values are stored as their wire labels.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS todo_items (
//!     id             BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
//!     description    TEXT        NOT NULL,
//!     status         TEXT        NOT NULL CHECK (status IN ('not done', 'done', 'past due')),
//!     due_date_time  TIMESTAMPTZ NOT NULL,
//!     done_at        TIMESTAMPTZ,
//!     created_at     TIMESTAMPTZ NOT NULL,
//!     updated_at     TIMESTAMPTZ NOT NULL,
//!     version        BIGINT      NOT NULL DEFAULT 1
//! );
//! CREATE INDEX IF NOT EXISTS idx_todo_items_status_due ON todo_items (status, due_date_time);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::repository::{ItemStore, StoreError};
use crate::domain::{Item, ItemDraft, ItemId, ItemStatus};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todo_items (
    id             BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    description    TEXT        NOT NULL,
    status         TEXT        NOT NULL CHECK (status IN ('not done', 'done', 'past due')),
    due_date_time  TIMESTAMPTZ NOT NULL,
    done_at        TIMESTAMPTZ,
    created_at     TIMESTAMPTZ NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL,
    version        BIGINT      NOT NULL DEFAULT 1
)";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_todo_items_status_due ON todo_items (status, due_date_time)";

const COLUMNS: &str =
    "id, description, status, due_date_time, done_at, created_at, updated_at, version";

// =============================================================================
// Row Conversion
// =============================================================================

/// Column tuple in `COLUMNS` order.
type ItemRow = (
    i64,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
    i64,
);

fn database_error(error: sqlx::Error) -> StoreError {
    StoreError::DatabaseError(error.to_string())
}

#[allow(clippy::cast_sign_loss)]
fn row_to_item(row: ItemRow) -> Result<Item, StoreError> {
    let (id, description, status, due_date_time, done_at, created_at, updated_at, version) = row;
    let status = status
        .parse::<ItemStatus>()
        .map_err(|error| StoreError::SerializationError(error.to_string()))?;
    Ok(Item {
        id: ItemId::from_i64(id),
        description,
        due_date_time,
        status,
        done_at,
        created_at,
        updated_at,
        version: version as u64,
    })
}

fn rows_to_items(rows: Vec<ItemRow>) -> Result<Vec<Item>, StoreError> {
    rows.into_iter().map(row_to_item).collect()
}

/// Writes `item` inside an open transaction, checking its version first.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
async fn update_locked(connection: &mut PgConnection, item: &Item) -> Result<Item, StoreError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT version FROM todo_items WHERE id = $1 FOR UPDATE")
            .bind(item.id.as_i64())
            .fetch_optional(&mut *connection)
            .await
            .map_err(database_error)?;

    let Some((existing_version,)) = existing else {
        return Err(StoreError::NotFound(item.id));
    };
    if existing_version as u64 != item.version {
        return Err(StoreError::VersionConflict {
            id: item.id,
            expected: existing_version as u64,
            found: item.version,
        });
    }

    let row: ItemRow = sqlx::query_as(&format!(
        "UPDATE todo_items
         SET description = $2, status = $3, due_date_time = $4, done_at = $5,
             updated_at = $6, version = version + 1
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(item.id.as_i64())
    .bind(&item.description)
    .bind(item.status.label())
    .bind(item.due_date_time)
    .bind(item.done_at)
    .bind(item.updated_at)
    .fetch_one(&mut *connection)
    .await
    .map_err(database_error)?;

    row_to_item(row)
}

// =============================================================================
// PostgreSQL Item Store
// =============================================================================

/// `PostgreSQL` implementation of [`ItemStore`].
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `todo_items` table and its index when they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database_error)?;
        }
        Ok(())
    }

    async fn fetch_where(
        &self,
        condition: &str,
        instant: Option<DateTime<Utc>>,
    ) -> Result<Vec<Item>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM todo_items {condition} ORDER BY id");
        let mut query = sqlx::query_as::<_, ItemRow>(&sql);
        if let Some(instant) = instant {
            query = query.bind(instant);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(database_error)?;
        rows_to_items(rows)
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM todo_items WHERE id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;
        row.map(row_to_item).transpose()
    }

    async fn insert(&self, draft: ItemDraft) -> Result<Item, StoreError> {
        let row: ItemRow = sqlx::query_as(&format!(
            "INSERT INTO todo_items (description, status, due_date_time, done_at, created_at, updated_at, version)
             VALUES ($1, $2, $3, NULL, $4, $4, 1)
             RETURNING {COLUMNS}"
        ))
        .bind(&draft.description)
        .bind(ItemStatus::NotDone.label())
        .bind(draft.due_date_time)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;
        row_to_item(row)
    }

    async fn save(&self, item: &Item) -> Result<Item, StoreError> {
        let mut transaction = self.pool.begin().await.map_err(database_error)?;
        let saved = update_locked(&mut transaction, item).await?;
        transaction.commit().await.map_err(database_error)?;
        Ok(saved)
    }

    async fn save_all(&self, items: &[Item]) -> Result<Vec<Item>, StoreError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        // Dropping the transaction on an early return rolls the batch back.
        let mut transaction = self.pool.begin().await.map_err(database_error)?;
        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            saved.push(update_locked(&mut transaction, item).await?);
        }
        transaction.commit().await.map_err(database_error)?;
        Ok(saved)
    }

    async fn delete_by_id(&self, id: ItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todo_items WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_all(&self) -> Result<Vec<Item>, StoreError> {
        self.fetch_where("", None).await
    }

    async fn find_all_excluding_done(&self) -> Result<Vec<Item>, StoreError> {
        self.fetch_where("WHERE status <> 'done'", None).await
    }

    async fn find_not_done_with_due_before(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError> {
        self.fetch_where(
            "WHERE status = 'not done' AND due_date_time < $1",
            Some(instant),
        )
        .await
    }
}
