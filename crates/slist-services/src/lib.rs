//! Shopping list collection service.
//!
//! The service is the sole owner of the item collection. Every mutation is
//! gated by schema validation, and callers only ever receive owned copies
//! of stored items.

pub mod error;
pub mod item;
pub mod schema;
pub mod shopping_list;
pub mod validation;

pub use error::{ServiceError, ServiceResult};
pub use item::{Item, ItemUpdate, NewItemInfo};
pub use schema::{FieldRule, ObjectSchema, SchemaValidator, Schemas};
pub use shopping_list::ShoppingListService;
pub use validation::ValidationReport;

use serde_json::Value;

/// Contract between the connection handler and the collection.
///
/// Payload arguments are raw JSON so validation can see exactly what the
/// client sent, including wrong types and unknown keys.
pub trait ItemService: Send + Sync {
    /// Validate and append a new item, assigning it a fresh id.
    fn create_item(
        &self,
        new_item_info: Value,
    ) -> impl std::future::Future<Output = ServiceResult<Item>> + Send;

    /// Look up one item. Fails with [`ServiceError::NotFound`] if absent.
    fn find_item_by_id(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = ServiceResult<Item>> + Send;

    /// Snapshot of every item in insertion order.
    fn find_all(&self) -> impl std::future::Future<Output = ServiceResult<Vec<Item>>> + Send;

    /// Validate and shallow-merge `item_update` onto the stored item.
    fn update_item(
        &self,
        id: &str,
        item_update: Value,
    ) -> impl std::future::Future<Output = ServiceResult<Item>> + Send;

    /// Remove an item and return what was stored.
    fn delete_item(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = ServiceResult<Item>> + Send;

    fn validate_new_item(&self, new_item_info: &Value) -> ValidationReport;

    fn validate_item_update(&self, item_update: &Value) -> ValidationReport;
}
