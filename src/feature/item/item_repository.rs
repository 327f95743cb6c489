//! Types and functions for storing and loading items from the database.

use super::item_model::{Item, ItemStatus, UnknownStatus};
use crate::infra::database::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{instrument, Instrument};

/// A failure to talk to storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The `code` unique constraint rejected the write.
    #[error("an item with this code already exists")]
    DuplicateCode,
    /// A stored row could not be turned into an [`Item`].
    #[error("corrupt item row: {0}")]
    Corrupt(#[from] UnknownStatus),
    /// Any other database error.
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::DuplicateCode,
            e => StorageError::Sqlx(e),
        }
    }
}

/// The result of storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Anything that can store items.
///
/// Implementations hold no business rules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Stores a new item and returns it with its assigned id.
    async fn create(&self, item: &Item) -> StorageResult<Item>;

    /// Fetches an item, `None` if there is no item with that id.
    async fn get_by_id(&self, id: i64) -> StorageResult<Option<Item>>;

    /// Overwrites the stored state of an existing item and returns the stored row,
    /// `None` if the item no longer exists.
    async fn update(&self, item: &Item) -> StorageResult<Option<Item>>;

    /// Deletes an item.
    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Lists items, most recently updated first.
    async fn find_all(
        &self,
        status: Option<ItemStatus>,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Item>>;

    /// Counts items, optionally only those with a given status.
    async fn count(&self, status: Option<ItemStatus>) -> StorageResult<i64>;

    /// Whether `code` is taken, ignoring the item with id `exclude_id` if positive.
    async fn exists_by_code(&self, code: &str, exclude_id: Option<i64>) -> StorageResult<bool>;
}

/// A row of the `items` table.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    code: String,
    title: String,
    description: String,
    price: i64,
    stock: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = StorageError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            status: row.status.parse()?,
            code: row.code,
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, code, title, description, price, stock, status, created_at, updated_at";

/// An item repository backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgItemRepository {
    db: DbPool,
}

impl PgItemRepository {
    /// Creates a new repository.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    #[instrument(skip_all, fields(code = %item.code))]
    async fn create(&self, item: &Item) -> StorageResult<Item> {
        tracing::info!("Creating item");
        let row: ItemRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO items (code, title, description, price, stock, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&item.code)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.stock)
        .bind(item.status.as_str())
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&self.db)
        .await?;
        tracing::info!("Created item {}", row.id);
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i64) -> StorageResult<Option<Item>> {
        tracing::debug!("Reading item");
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .instrument(tracing::info_span!("fetch_optional"))
                .await?;
        row.map(Item::try_from).transpose()
    }

    #[instrument(skip_all, fields(id = item.id))]
    async fn update(&self, item: &Item) -> StorageResult<Option<Item>> {
        tracing::info!("Updating item");
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            r#"
            UPDATE items
            SET code = $1, title = $2, description = $3, price = $4, stock = $5,
                status = $6, updated_at = $7
            WHERE id = $8
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&item.code)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.stock)
        .bind(item.status.as_str())
        .bind(item.updated_at)
        .bind(item.id)
        .fetch_optional(&self.db)
        .await?;
        if row.is_none() {
            tracing::warn!("Item was gone before the update");
        }
        row.map(Item::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> StorageResult<()> {
        tracing::info!("Deleting item");
        let rows = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if rows.rows_affected() == 0 {
            tracing::warn!("Item was already gone");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_all(
        &self,
        status: Option<ItemStatus>,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM items
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY updated_at DESC, id DESC
            LIMIT $2
            OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        tracing::debug!("Listed {} items", rows.len());
        rows.into_iter().map(Item::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self, status: Option<ItemStatus>) -> StorageResult<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE ($1::text IS NULL OR status = $1)")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn exists_by_code(&self, code: &str, exclude_id: Option<i64>) -> StorageResult<bool> {
        let exclude_id = exclude_id.filter(|id| *id > 0);
        let exists = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM items
                WHERE code = $1 AND ($2::bigint IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }
}
