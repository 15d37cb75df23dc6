//! Item types.

use serde::{Deserialize, Serialize};

/// One shopping list entry. Serializes to exactly `{id, title, completed}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

/// Fields accepted when creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemInfo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Item {
    pub fn new(id: impl Into<String>, info: NewItemInfo) -> Self {
        Self {
            id: id.into(),
            title: info.title,
            completed: info.completed,
        }
    }

    /// Shallow merge: fields present in `update` replace stored ones.
    pub fn merged(&self, update: ItemUpdate) -> Self {
        Self {
            id: self.id.clone(),
            title: update.title.unwrap_or_else(|| self.title.clone()),
            completed: update.completed.unwrap_or(self.completed),
        }
    }
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}
