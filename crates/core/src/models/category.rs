use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::EntityId;

/// A node in the product category tree. Root categories have no parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub parent_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<EntityId>,
}

impl CreateCategoryRequest {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn child(name: impl Into<String>, parent_id: EntityId) -> Self {
        Self {
            name: name.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// Partial update. `parent_id: Some(None)` moves the category to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub parent_id: Option<Option<EntityId>>,
}

impl Category {
    pub fn from_request(
        id: EntityId,
        request: &CreateCategoryRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: request.name.clone(),
            parent_id: request.parent_id,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn apply(&mut self, changes: &UpdateCategoryRequest, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(parent_id) = changes.parent_id {
            self.parent_id = parent_id;
        }
        self.updated_at = now;
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
