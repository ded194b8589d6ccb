use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::EntityId;

/// A registered shopper, seller or administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_seller: bool,
    pub super_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl CreateUserRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// Sets first and last name.
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

/// Partial update of a user's profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Builds a new user record from a registration request.
    pub fn from_request(
        id: EntityId,
        request: &CreateUserRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            is_seller: false,
            super_admin: false,
            created_at,
            updated_at: created_at,
        }
    }

    /// Applies a partial update, bumping `updated_at`.
    pub fn apply(&mut self, changes: &UpdateUserRequest, now: DateTime<Utc>) {
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(first_name) = &changes.first_name {
            self.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = Some(last_name.clone());
        }
        self.updated_at = now;
    }
}
