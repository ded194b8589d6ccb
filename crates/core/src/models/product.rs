use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::EntityId;

/// A product listed by a seller.
///
/// Prices are stored in cents so both stores compare them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub seller_id: EntityId,
    pub category_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub inventory_quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_id: EntityId,
    pub price_cents: i64,
    pub inventory_quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<EntityId>,
    pub price_cents: Option<i64>,
    pub inventory_quantity: Option<u32>,
}

/// Search filters for product listings. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilters {
    pub category_id: Option<EntityId>,
    pub seller_id: Option<EntityId>,
    pub search: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub in_stock_only: bool,
}

impl ProductFilters {
    /// Returns true if the product satisfies every filter.
    pub fn matches(&self, product: &Product) -> bool {
        if self.category_id.is_some_and(|id| id != product.category_id) {
            return false;
        }
        if self.seller_id.is_some_and(|id| id != product.seller_id) {
            return false;
        }
        if self.min_price_cents.is_some_and(|min| product.price_cents < min) {
            return false;
        }
        if self.max_price_cents.is_some_and(|max| product.price_cents > max) {
            return false;
        }
        if self.in_stock_only && product.inventory_quantity == 0 {
            return false;
        }
        match &self.search {
            Some(term) => product.matches_term(term),
            None => true,
        }
    }
}

impl Product {
    pub fn from_request(
        id: EntityId,
        seller_id: EntityId,
        request: &CreateProductRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            seller_id,
            category_id: request.category_id,
            name: request.name.clone(),
            description: request.description.clone(),
            price_cents: request.price_cents,
            inventory_quantity: request.inventory_quantity,
            created_at,
            updated_at: created_at,
        }
    }

    /// Applies a partial update, bumping `updated_at`.
    pub fn apply(&mut self, changes: &UpdateProductRequest, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(description) = &changes.description {
            self.description = Some(description.clone());
        }
        if let Some(category_id) = changes.category_id {
            self.category_id = category_id;
        }
        if let Some(price_cents) = changes.price_cents {
            self.price_cents = price_cents;
        }
        if let Some(quantity) = changes.inventory_quantity {
            self.inventory_quantity = quantity;
        }
        self.updated_at = now;
    }

    /// Case-insensitive match against name and description.
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let request = CreateProductRequest {
            name: "Mechanical Keyboard".to_string(),
            description: Some("Tactile switches".to_string()),
            category_id: 3,
            price_cents: 12_999,
            inventory_quantity: 5,
        };
        Product::from_request(1, 10, &request, Utc::now())
    }

    #[test]
    fn test_matches_term_in_description() {
        assert!(product().matches_term("TACTILE"));
        assert!(!product().matches_term("mouse"));
    }

    #[test]
    fn test_filters_price_range() {
        let filters = ProductFilters {
            min_price_cents: Some(10_000),
            max_price_cents: Some(12_000),
            ..Default::default()
        };
        assert!(!filters.matches(&product()));
    }

    #[test]
    fn test_filters_in_stock_only() {
        let mut p = product();
        let filters = ProductFilters {
            in_stock_only: true,
            ..Default::default()
        };
        assert!(filters.matches(&p));
        p.inventory_quantity = 0;
        assert!(!filters.matches(&p));
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(ProductFilters::default().matches(&product()));
    }
}
