use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier shared by every entity in both stores.
pub type EntityId = i64;

/// How a create call obtains the identity of the new record.
///
/// The authoritative store generates identifiers; the secondary store must
/// reuse them so both stores describe the same logical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// The store assigns the identifier and creation time.
    Generate,
    /// Reuse an identifier and creation time assigned elsewhere.
    Assigned {
        id: EntityId,
        created_at: DateTime<Utc>,
    },
}

impl Identity {
    /// Creates an assigned identity.
    pub fn assigned(id: EntityId, created_at: DateTime<Utc>) -> Self {
        Identity::Assigned { id, created_at }
    }

    /// Resolves the identity, drawing on `next_id` only when the store must generate one.
    pub fn resolve(self, next_id: impl FnOnce() -> EntityId, now: DateTime<Utc>) -> (EntityId, DateTime<Utc>) {
        match self {
            Identity::Generate => (next_id(), now),
            Identity::Assigned { id, created_at } => (id, created_at),
        }
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Creates a page request, clamping to a valid page and limit.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * self.limit as usize
    }

    /// Slices an already filtered result set into this page.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let page_items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();
        Page {
            items: page_items,
            total,
            page: self.page,
            limit: self.limit,
            total_pages: total.div_ceil(self.limit as u64) as u32,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

/// One page of a larger result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}
