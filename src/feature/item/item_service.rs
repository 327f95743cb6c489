//! A service for managing the item lifecycle.
//!
//! All business rules live here: field validation, code uniqueness,
//! status derivation (through [`Item`]) and pagination.

use super::{
    item_model::{Item, ItemFields, ItemStatus, PagedItems},
    item_repository::{ItemRepository, StorageError},
};
use crate::infra::pagination::PageRequest;
use async_trait::async_trait;
use tracing::instrument;

/// Why an item operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    /// The supplied fields break a rule.
    #[error("invalid item data: {0}")]
    InvalidData(&'static str),
    /// Another item already uses the code.
    #[error("an item with code {0:?} already exists")]
    DuplicateCode(String),
    /// No item has the id.
    #[error("item {0} not found")]
    NotFound(i64),
    /// Storage failed.
    #[error("{context}: {source}")]
    Storage {
        /// What the service was doing.
        context: &'static str,
        /// The underlying failure.
        source: StorageError,
    },
}

/// The result of item operations.
pub type ItemResult<T> = Result<T, ItemError>;

/// Wraps a storage failure with what the service was doing.
fn storage(context: &'static str) -> impl FnOnce(StorageError) -> ItemError {
    move |source| ItemError::Storage { context, source }
}

/// Like [`storage`], but a unique violation on write becomes [`ItemError::DuplicateCode`].
fn write_failure(context: &'static str, code: &str) -> impl FnOnce(StorageError) -> ItemError {
    let code = code.to_string();
    move |source| match source {
        StorageError::DuplicateCode => ItemError::DuplicateCode(code),
        source => ItemError::Storage { context, source },
    }
}

/// Checks the rules every stored item satisfies.
fn validate(fields: &ItemFields) -> ItemResult<()> {
    if fields.code.is_empty() || fields.title.is_empty() || fields.description.is_empty() {
        return Err(ItemError::InvalidData(
            "code, title and description are required",
        ));
    }
    if fields.price <= 0 {
        return Err(ItemError::InvalidData("price must be greater than 0"));
    }
    if fields.stock < 0 {
        return Err(ItemError::InvalidData("stock cannot be negative"));
    }
    Ok(())
}

/// Everything the HTTP layer can ask of items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemService: Send + Sync {
    /// Creates a new item.
    async fn create_item(&self, fields: ItemFields) -> ItemResult<Item>;

    /// Reads an item.
    async fn get_item(&self, id: i64) -> ItemResult<Item>;

    /// Replaces every field of an item.
    async fn update_item(&self, id: i64, fields: ItemFields) -> ItemResult<Item>;

    /// Deletes an item.
    async fn delete_item(&self, id: i64) -> ItemResult<()>;

    /// Lists one page of items.
    async fn list_items(
        &self,
        status: Option<ItemStatus>,
        limit: i64,
        page: i64,
    ) -> ItemResult<PagedItems>;
}

/// The [`ItemService`] on top of some [`ItemRepository`].
#[derive(Clone, Debug)]
pub struct ItemServiceImpl<R> {
    repository: R,
}

impl<R: ItemRepository> ItemServiceImpl<R> {
    /// Creates a new service.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    async fn fetch(&self, id: i64) -> ItemResult<Item> {
        self.repository
            .get_by_id(id)
            .await
            .map_err(storage("failed to get item"))?
            .ok_or(ItemError::NotFound(id))
    }
}

#[async_trait]
impl<R: ItemRepository> ItemService for ItemServiceImpl<R> {
    #[instrument(skip_all, fields(code = %fields.code))]
    async fn create_item(&self, fields: ItemFields) -> ItemResult<Item> {
        validate(&fields)?;

        let taken = self
            .repository
            .exists_by_code(&fields.code, None)
            .await
            .map_err(storage("failed to check code uniqueness"))?;
        if taken {
            return Err(ItemError::DuplicateCode(fields.code));
        }

        let item = Item::new(fields);
        let item = self
            .repository
            .create(&item)
            .await
            .map_err(write_failure("failed to create item", &item.code))?;
        tracing::info!(id = item.id, "Created item");
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, id: i64) -> ItemResult<Item> {
        self.fetch(id).await
    }

    #[instrument(skip(self, fields), fields(code = %fields.code))]
    async fn update_item(&self, id: i64, fields: ItemFields) -> ItemResult<Item> {
        validate(&fields)?;

        let mut item = self.fetch(id).await?;

        if item.code != fields.code {
            let taken = self
                .repository
                .exists_by_code(&fields.code, Some(id))
                .await
                .map_err(storage("failed to check code uniqueness"))?;
            if taken {
                return Err(ItemError::DuplicateCode(fields.code));
            }
        }

        item.update_fields(fields);
        let item = self
            .repository
            .update(&item)
            .await
            .map_err(write_failure("failed to update item", &item.code))?
            .ok_or(ItemError::NotFound(id))?;
        tracing::info!("Updated item");
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: i64) -> ItemResult<()> {
        self.fetch(id).await?;
        self.repository
            .delete(id)
            .await
            .map_err(storage("failed to delete item"))?;
        tracing::info!("Deleted item");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_items(
        &self,
        status: Option<ItemStatus>,
        limit: i64,
        page: i64,
    ) -> ItemResult<PagedItems> {
        let request = PageRequest::new(limit, page);

        let total = self
            .repository
            .count(status)
            .await
            .map_err(storage("failed to count items"))?;
        let total_pages = request.total_pages(total);

        let items = self
            .repository
            .find_all(status, request.limit(), request.offset())
            .await
            .map_err(storage("failed to list items"))?;
        tracing::debug!(total, returned = items.len(), "Listed items");

        Ok(PagedItems { total_pages, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::item::item_repository::{MockItemRepository, StorageResult};
    use mockall::predicate::eq;
    use std::sync::Mutex;

    fn fields(code: &str, stock: i64) -> ItemFields {
        ItemFields {
            code: code.to_string(),
            title: "Mug".to_string(),
            description: "A ceramic mug".to_string(),
            price: 1200,
            stock,
        }
    }

    fn stored(id: i64, code: &str, stock: i64) -> Item {
        let mut item = Item::new(fields(code, stock));
        item.id = id;
        item
    }

    /// An in-memory repository for exercising whole lifecycles.
    #[derive(Default)]
    struct MemoryRepository {
        items: Mutex<Vec<Item>>,
    }

    #[async_trait]
    impl ItemRepository for MemoryRepository {
        async fn create(&self, item: &Item) -> StorageResult<Item> {
            let mut items = self.items.lock().unwrap();
            let mut item = item.clone();
            item.id = items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
            items.push(item.clone());
            Ok(item)
        }

        async fn get_by_id(&self, id: i64) -> StorageResult<Option<Item>> {
            let items = self.items.lock().unwrap();
            Ok(items.iter().find(|i| i.id == id).cloned())
        }

        async fn update(&self, item: &Item) -> StorageResult<Option<Item>> {
            let mut items = self.items.lock().unwrap();
            Ok(items.iter_mut().find(|i| i.id == item.id).map(|existing| {
                *existing = item.clone();
                item.clone()
            }))
        }

        async fn delete(&self, id: i64) -> StorageResult<()> {
            self.items.lock().unwrap().retain(|i| i.id != id);
            Ok(())
        }

        async fn find_all(
            &self,
            status: Option<ItemStatus>,
            limit: i64,
            offset: i64,
        ) -> StorageResult<Vec<Item>> {
            let mut items: Vec<Item> = self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|i| status.map_or(true, |s| i.status == s))
                .cloned()
                .collect();
            items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
            Ok(items
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn count(&self, status: Option<ItemStatus>) -> StorageResult<i64> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|i| status.map_or(true, |s| i.status == s))
                .count() as i64)
        }

        async fn exists_by_code(&self, code: &str, exclude_id: Option<i64>) -> StorageResult<bool> {
            let exclude_id = exclude_id.filter(|id| *id > 0);
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .any(|i| i.code == code && Some(i.id) != exclude_id))
        }
    }

    fn memory_service() -> ItemServiceImpl<MemoryRepository> {
        ItemServiceImpl::new(MemoryRepository::default())
    }

    #[tokio::test]
    async fn created_item_can_be_read_back() {
        let service = memory_service();
        let created = service.create_item(fields("MUG-1", 3)).await.unwrap();
        let fetched = service.get_item(created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!("MUG-1", fetched.code);
        assert_eq!("Mug", fetched.title);
        assert_eq!("A ceramic mug", fetched.description);
        assert_eq!(1200, fetched.price);
        assert_eq!(3, fetched.stock);
        assert_eq!(ItemStatus::Active, fetched.status);
    }

    #[tokio::test]
    async fn status_is_derived_from_stock() {
        let service = memory_service();
        let empty = service.create_item(fields("MUG-0", 0)).await.unwrap();
        let stocked = service.create_item(fields("MUG-1", 1)).await.unwrap();
        assert_eq!(ItemStatus::Inactive, empty.status);
        assert_eq!(ItemStatus::Active, stocked.status);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let service = memory_service();
        service.create_item(fields("MUG-1", 1)).await.unwrap();
        let result = service.create_item(fields("MUG-1", 2)).await;
        assert!(matches!(result, Err(ItemError::DuplicateCode(code)) if code == "MUG-1"));
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected_without_storage_calls() {
        let service = ItemServiceImpl::new(MockItemRepository::new());

        let mut no_title = fields("MUG-1", 1);
        no_title.title = String::new();
        let mut free = fields("MUG-1", 1);
        free.price = 0;

        for invalid in [no_title, free, fields("MUG-1", -1)] {
            let result = service.create_item(invalid).await;
            assert!(matches!(result, Err(ItemError::InvalidData(_))));
        }
    }

    #[tokio::test]
    async fn unique_violation_on_insert_is_a_duplicate_code() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_exists_by_code()
            .returning(|_, _| Ok(false));
        repository
            .expect_create()
            .returning(|_| Err(StorageError::DuplicateCode));
        let service = ItemServiceImpl::new(repository);

        let result = service.create_item(fields("MUG-1", 1)).await;
        assert!(matches!(result, Err(ItemError::DuplicateCode(_))));
    }

    #[tokio::test]
    async fn storage_failures_are_wrapped() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_exists_by_code()
            .returning(|_, _| Err(StorageError::Sqlx(sqlx::Error::PoolTimedOut)));
        let service = ItemServiceImpl::new(repository);

        let result = service.create_item(fields("MUG-1", 1)).await;
        assert!(matches!(
            result,
            Err(ItemError::Storage {
                context: "failed to check code uniqueness",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn get_missing_item_is_not_found() {
        let service = memory_service();
        assert!(matches!(
            service.get_item(42).await,
            Err(ItemError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn keeping_own_code_skips_uniqueness_check() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_get_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(stored(id, "MUG-1", 1))));
        repository.expect_exists_by_code().never();
        repository
            .expect_update()
            .withf(|item| item.id == 1 && item.stock == 0)
            .times(1)
            .returning(|item| Ok(Some(item.clone())));
        let service = ItemServiceImpl::new(repository);

        let updated = service.update_item(1, fields("MUG-1", 0)).await.unwrap();
        assert_eq!(ItemStatus::Inactive, updated.status);
    }

    #[tokio::test]
    async fn changing_to_a_taken_code_is_rejected() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_get_by_id()
            .returning(|id| Ok(Some(stored(id, "MUG-1", 1))));
        repository
            .expect_exists_by_code()
            .withf(|code, exclude| code == "MUG-2" && *exclude == Some(1))
            .returning(|_, _| Ok(true));
        repository.expect_update().never();
        let service = ItemServiceImpl::new(repository);

        let result = service.update_item(1, fields("MUG-2", 1)).await;
        assert!(matches!(result, Err(ItemError::DuplicateCode(code)) if code == "MUG-2"));
    }

    #[tokio::test]
    async fn unique_violation_on_update_is_a_duplicate_code() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_get_by_id()
            .returning(|id| Ok(Some(stored(id, "MUG-1", 1))));
        repository
            .expect_exists_by_code()
            .returning(|_, _| Ok(false));
        repository
            .expect_update()
            .returning(|_| Err(StorageError::DuplicateCode));
        let service = ItemServiceImpl::new(repository);

        let result = service.update_item(1, fields("MUG-2", 1)).await;
        assert!(matches!(result, Err(ItemError::DuplicateCode(code)) if code == "MUG-2"));
    }

    #[tokio::test]
    async fn item_deleted_during_update_is_not_found() {
        let mut repository = MockItemRepository::new();
        repository
            .expect_get_by_id()
            .returning(|id| Ok(Some(stored(id, "MUG-1", 1))));
        repository.expect_update().returning(|_| Ok(None));
        let service = ItemServiceImpl::new(repository);

        let result = service.update_item(1, fields("MUG-1", 2)).await;
        assert!(matches!(result, Err(ItemError::NotFound(1))));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_refreshes_timestamp() {
        let service = memory_service();
        let created = service.create_item(fields("MUG-1", 4)).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));

        let mut changed = fields("MUG-9", 0);
        changed.title = "Big mug".to_string();
        let updated = service.update_item(created.id, changed).await.unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!("MUG-9", updated.code);
        assert_eq!("Big mug", updated.title);
        assert_eq!(ItemStatus::Inactive, updated.status);
        assert_eq!(created.created_at, updated.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated, service.get_item(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_validates_before_fetching() {
        let mut repository = MockItemRepository::new();
        repository.expect_get_by_id().never();
        let service = ItemServiceImpl::new(repository);

        let result = service.update_item(1, fields("", 1)).await;
        assert!(matches!(result, Err(ItemError::InvalidData(_))));
    }

    #[tokio::test]
    async fn update_missing_item_is_not_found() {
        let service = memory_service();
        let result = service.update_item(3, fields("MUG-1", 1)).await;
        assert!(matches!(result, Err(ItemError::NotFound(3))));
    }

    #[tokio::test]
    async fn deleting_missing_item_does_not_touch_storage() {
        let mut repository = MockItemRepository::new();
        repository.expect_get_by_id().returning(|_| Ok(None));
        repository.expect_delete().never();
        let service = ItemServiceImpl::new(repository);

        let result = service.delete_item(5).await;
        assert!(matches!(result, Err(ItemError::NotFound(5))));
    }

    #[tokio::test]
    async fn deleted_item_is_gone() {
        let service = memory_service();
        let created = service.create_item(fields("MUG-1", 1)).await.unwrap();
        service.delete_item(created.id).await.unwrap();
        assert!(matches!(
            service.get_item(created.id).await,
            Err(ItemError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_normalizes_limit_and_page() {
        let mut repository = MockItemRepository::new();
        repository.expect_count().returning(|_| Ok(0));
        repository
            .expect_find_all()
            .with(eq(None), eq(10), eq(0))
            .times(2)
            .returning(|_, _, _| Ok(vec![]));
        repository
            .expect_find_all()
            .with(eq(None), eq(20), eq(20))
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        let service = ItemServiceImpl::new(repository);

        service.list_items(None, 0, 1).await.unwrap();
        service.list_items(None, 10, 0).await.unwrap();
        let page = service.list_items(None, 50, 2).await.unwrap();
        assert_eq!(0, page.total_pages);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn list_pages_through_items() {
        let service = memory_service();
        for n in 0..25 {
            service
                .create_item(fields(&format!("MUG-{n}"), n))
                .await
                .unwrap();
        }

        let first = service.list_items(None, 10, 1).await.unwrap();
        assert_eq!(3, first.total_pages);
        assert_eq!(10, first.items.len());

        let third = service.list_items(None, 10, 3).await.unwrap();
        assert_eq!(3, third.total_pages);
        assert_eq!(5, third.items.len());

        let fourth = service.list_items(None, 10, 4).await.unwrap();
        assert_eq!(3, fourth.total_pages);
        assert!(fourth.items.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let service = memory_service();
        service.create_item(fields("MUG-0", 0)).await.unwrap();
        service.create_item(fields("MUG-1", 1)).await.unwrap();
        service.create_item(fields("MUG-2", 2)).await.unwrap();

        let inactive = service
            .list_items(Some(ItemStatus::Inactive), 10, 1)
            .await
            .unwrap();
        assert_eq!(1, inactive.total_pages);
        assert_eq!(1, inactive.items.len());
        assert_eq!("MUG-0", inactive.items[0].code);

        let active = service
            .list_items(Some(ItemStatus::Active), 10, 1)
            .await
            .unwrap();
        assert_eq!(2, active.items.len());
    }

    #[tokio::test]
    async fn list_returns_most_recently_updated_first() {
        let service = memory_service();
        let first = service.create_item(fields("MUG-1", 1)).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        service.create_item(fields("MUG-2", 1)).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        service.update_item(first.id, fields("MUG-1", 7)).await.unwrap();

        let page = service.list_items(None, 10, 1).await.unwrap();
        let codes: Vec<&str> = page.items.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(vec!["MUG-1", "MUG-2"], codes);
    }
}
