//! Shopping list service: the in-memory item collection.

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::item::{Item, ItemUpdate, NewItemInfo};
use crate::schema::Schemas;
use crate::validation::ValidationReport;
use crate::ItemService;

/// Owns the authoritative list of items.
///
/// The collection is kept in insertion order behind a single `RwLock`:
/// mutations take the write lock, so they never interleave, and readers
/// copy out a consistent snapshot.
pub struct ShoppingListService {
    items: RwLock<Vec<Item>>,
    schemas: Schemas,
}

impl ShoppingListService {
    pub fn new(schemas: Schemas) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            schemas,
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn position(items: &[Item], id: &str) -> Option<usize> {
        items.iter().position(|item| item.id == id)
    }
}

impl Default for ShoppingListService {
    fn default() -> Self {
        Self::new(Schemas::default())
    }
}

/// Deserialize a payload that already passed its schema.
fn decode<T: for<'de> serde::Deserialize<'de>>(payload: Value) -> ServiceResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| ServiceError::unexpected(format!("failed to decode payload: {e}")))
}

impl ItemService for ShoppingListService {
    async fn create_item(&self, new_item_info: Value) -> ServiceResult<Item> {
        let report = self.validate_new_item(&new_item_info);
        if report.has_errors() {
            return Err(ServiceError::Validation(report));
        }

        let info: NewItemInfo = decode(new_item_info)?;
        let item = Item::new(uuid::Uuid::new_v4().to_string(), info);

        self.items.write().push(item.clone());
        debug!(item_id = %item.id, "item created");
        Ok(item)
    }

    async fn find_item_by_id(&self, id: &str) -> ServiceResult<Item> {
        self.items
            .read()
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(id))
    }

    async fn find_all(&self) -> ServiceResult<Vec<Item>> {
        Ok(self.items.read().clone())
    }

    async fn update_item(&self, id: &str, item_update: Value) -> ServiceResult<Item> {
        let report = self.validate_item_update(&item_update);
        if report.has_errors() {
            return Err(ServiceError::Validation(report));
        }
        let update: ItemUpdate = decode(item_update)?;

        let mut items = self.items.write();
        let pos = Self::position(&items, id).ok_or_else(|| ServiceError::not_found(id))?;
        let updated = items[pos].merged(update);
        items[pos] = updated.clone();
        debug!(item_id = %id, "item updated");
        Ok(updated)
    }

    async fn delete_item(&self, id: &str) -> ServiceResult<Item> {
        let mut items = self.items.write();
        let pos = Self::position(&items, id).ok_or_else(|| ServiceError::not_found(id))?;
        let removed = items.remove(pos);
        debug!(item_id = %id, "item deleted");
        Ok(removed)
    }

    fn validate_new_item(&self, new_item_info: &Value) -> ValidationReport {
        self.schemas.new_item.validate(new_item_info)
    }

    fn validate_item_update(&self, item_update: &Value) -> ValidationReport {
        self.schemas.item_update.validate(item_update)
    }
}
