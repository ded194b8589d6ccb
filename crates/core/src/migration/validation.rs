//! Field-level comparison of results read from both stores.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{CartItem, Category, Order, OrderItem, OrderWithItems, Product, User};
use crate::storage::Page;

use super::StoreKind;

/// One field whose value differs between the primary and shadow results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub field: String,
    /// Rendered primary value, `None` when withheld or absent.
    pub primary: Option<String>,
    /// Rendered shadow value, `None` when withheld or absent.
    pub shadow: Option<String>,
    pub message: String,
}

impl FieldMismatch {
    fn values(field: impl Into<String>, primary: String, shadow: String) -> Self {
        let field = field.into();
        let message = format!("{field} mismatch: primary={primary}, shadow={shadow}");
        Self {
            field,
            primary: Some(primary),
            shadow: Some(shadow),
            message,
        }
    }

    fn withheld(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{field} mismatch: values differ (not logged)");
        Self {
            field,
            primary: None,
            shadow: None,
            message,
        }
    }

    fn presence(primary_present: bool) -> Self {
        let message = if primary_present {
            "shadow result is missing but primary result is present"
        } else {
            "primary result is missing but shadow result is present"
        };
        Self {
            field: "record".to_string(),
            primary: Some(primary_present.to_string()),
            shadow: Some((!primary_present).to_string()),
            message: message.to_string(),
        }
    }

    fn prefixed(mut self, prefix: &str) -> Self {
        self.field = format!("{prefix}.{}", self.field);
        self.message = format!("{prefix}.{}", self.message);
        self
    }
}

/// Values that can be compared across stores.
pub trait Divergence {
    /// Returns every field that differs between `self` (primary) and `shadow`.
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch>;
}

/// Accumulates mismatches field by field.
#[derive(Default)]
struct Diff(Vec<FieldMismatch>);

impl Diff {
    fn field<T: PartialEq + Debug>(mut self, name: &str, primary: &T, shadow: &T) -> Self {
        if primary != shadow {
            self.0.push(FieldMismatch::values(
                name,
                format!("{primary:?}"),
                format!("{shadow:?}"),
            ));
        }
        self
    }

    fn secret<T: PartialEq>(mut self, name: &str, primary: &T, shadow: &T) -> Self {
        if primary != shadow {
            self.0.push(FieldMismatch::withheld(name));
        }
        self
    }

    fn finish(self) -> Vec<FieldMismatch> {
        self.0
    }
}

// `updated_at` is left out everywhere: each store stamps its own modification time.

impl Divergence for User {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("username", &self.username, &shadow.username)
            .field("email", &self.email, &shadow.email)
            .secret("password_hash", &self.password_hash, &shadow.password_hash)
            .field("first_name", &self.first_name, &shadow.first_name)
            .field("last_name", &self.last_name, &shadow.last_name)
            .field("is_seller", &self.is_seller, &shadow.is_seller)
            .field("super_admin", &self.super_admin, &shadow.super_admin)
            .field("created_at", &self.created_at, &shadow.created_at)
            .finish()
    }
}

impl Divergence for Product {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("seller_id", &self.seller_id, &shadow.seller_id)
            .field("category_id", &self.category_id, &shadow.category_id)
            .field("name", &self.name, &shadow.name)
            .field("description", &self.description, &shadow.description)
            .field("price_cents", &self.price_cents, &shadow.price_cents)
            .field(
                "inventory_quantity",
                &self.inventory_quantity,
                &shadow.inventory_quantity,
            )
            .field("created_at", &self.created_at, &shadow.created_at)
            .finish()
    }
}

impl Divergence for Category {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("name", &self.name, &shadow.name)
            .field("parent_id", &self.parent_id, &shadow.parent_id)
            .field("created_at", &self.created_at, &shadow.created_at)
            .finish()
    }
}

impl Divergence for Order {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("user_id", &self.user_id, &shadow.user_id)
            .field(
                "total_amount_cents",
                &self.total_amount_cents,
                &shadow.total_amount_cents,
            )
            .field("status", &self.status, &shadow.status)
            .field("created_at", &self.created_at, &shadow.created_at)
            .finish()
    }
}

impl Divergence for OrderItem {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("order_id", &self.order_id, &shadow.order_id)
            .field("product_id", &self.product_id, &shadow.product_id)
            .field("quantity", &self.quantity, &shadow.quantity)
            .field(
                "price_at_time_cents",
                &self.price_at_time_cents,
                &shadow.price_at_time_cents,
            )
            .finish()
    }
}

impl Divergence for OrderWithItems {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        let mut mismatches = self.order.divergences(&shadow.order);
        mismatches.extend(
            self.items
                .divergences(&shadow.items)
                .into_iter()
                .map(|m| m.prefixed("items")),
        );
        mismatches
    }
}

impl Divergence for CartItem {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        Diff::default()
            .field("id", &self.id, &shadow.id)
            .field("user_id", &self.user_id, &shadow.user_id)
            .field("product_id", &self.product_id, &shadow.product_id)
            .field("quantity", &self.quantity, &shadow.quantity)
            .field("created_at", &self.created_at, &shadow.created_at)
            .finish()
    }
}

impl<T: Divergence> Divergence for Option<T> {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        match (self, shadow) {
            (None, None) => Vec::new(),
            (Some(_), None) => vec![FieldMismatch::presence(true)],
            (None, Some(_)) => vec![FieldMismatch::presence(false)],
            (Some(primary), Some(shadow)) => primary.divergences(shadow),
        }
    }
}

impl<T: Divergence> Divergence for Vec<T> {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        if self.len() != shadow.len() {
            return vec![FieldMismatch::values(
                "len",
                self.len().to_string(),
                shadow.len().to_string(),
            )];
        }
        self.iter()
            .zip(shadow)
            .enumerate()
            .flat_map(|(i, (primary, shadow))| {
                primary
                    .divergences(shadow)
                    .into_iter()
                    .map(move |m| m.prefixed(&format!("[{i}]")))
            })
            .collect()
    }
}

impl<T: Divergence> Divergence for Page<T> {
    fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
        let mut mismatches = Diff::default()
            .field("total", &self.total, &shadow.total)
            .finish();
        mismatches.extend(self.items.divergences(&shadow.items));
        mismatches
    }
}

macro_rules! scalar_divergence {
    ($($ty:ty),*) => {
        $(
            impl Divergence for $ty {
                fn divergences(&self, shadow: &Self) -> Vec<FieldMismatch> {
                    Diff::default().field("value", self, shadow).finish()
                }
            }
        )*
    };
}

scalar_divergence!(bool, u64);

/// Outcome of comparing one dual read.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub entity: &'static str,
    pub operation: &'static str,
    pub key: String,
    pub correlation_id: String,
    pub primary_store: StoreKind,
    pub shadow_store: StoreKind,
    pub mismatches: Vec<FieldMismatch>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// A single-line description with suggested follow-ups for operators.
    pub fn summary(&self) -> String {
        if self.passed() {
            return format!(
                "Validation passed for {} {} ({})",
                self.entity, self.operation, self.key
            );
        }

        let errors = self
            .mismatches
            .iter()
            .map(|m| m.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut message = format!(
            "Data validation failed for {} {} ({}): {errors}",
            self.entity, self.operation, self.key
        );

        let mut suggestions = Vec::new();
        if self.mismatches.iter().any(|m| m.field.ends_with("id")) {
            suggestions.push("Check ID mapping between stores");
        }
        if self.mismatches.iter().any(|m| m.field.ends_with("_at")) {
            suggestions.push("Verify timestamp synchronization between stores");
        }
        if self.mismatches.iter().any(|m| m.field == "record") {
            suggestions.push("Check for a missed secondary write");
        }
        if self.mismatches.len() > 3 {
            suggestions.push("Consider full data resynchronization for this entity");
        }
        if !suggestions.is_empty() {
            message.push_str(". Suggested actions: ");
            message.push_str(&suggestions.join("; "));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateUserRequest;

    fn user() -> User {
        let request =
            CreateUserRequest::new("alice", "alice@example.com", "secret").with_name("Al", "Ice");
        User::from_request(1, &request, Utc::now())
    }

    fn report(mismatches: Vec<FieldMismatch>) -> ValidationReport {
        ValidationReport {
            entity: "User",
            operation: "find_by_id",
            key: "1".to_string(),
            correlation_id: "abc".to_string(),
            primary_store: StoreKind::Relational,
            shadow_store: StoreKind::Distributed,
            mismatches,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_identical_users_have_no_divergence() {
        let u = user();
        assert!(u.divergences(&u.clone()).is_empty());
    }

    #[test]
    fn test_updated_at_is_ignored() {
        let u = user();
        let mut shadow = u.clone();
        shadow.updated_at = u.updated_at + chrono::Duration::seconds(5);
        assert!(u.divergences(&shadow).is_empty());
    }

    #[test]
    fn test_username_mismatch_is_reported_with_values() {
        let u = user();
        let mut shadow = u.clone();
        shadow.username = "mallory".to_string();

        let mismatches = u.divergences(&shadow);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "username");
        assert_eq!(mismatches[0].primary.as_deref(), Some("\"alice\""));
        assert_eq!(mismatches[0].shadow.as_deref(), Some("\"mallory\""));
    }

    #[test]
    fn test_password_hash_mismatch_withholds_values() {
        let u = user();
        let mut shadow = u.clone();
        shadow.password_hash = "other".to_string();

        let mismatches = u.divergences(&shadow);
        assert_eq!(mismatches[0].field, "password_hash");
        assert_eq!(mismatches[0].primary, None);
        assert!(!mismatches[0].message.contains("secret"));
    }

    #[test]
    fn test_option_presence_mismatch() {
        let present = Some(user());
        let absent: Option<User> = None;

        let mismatches = present.divergences(&absent);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "record");
        assert!(absent.divergences(&None).is_empty());
    }

    #[test]
    fn test_vec_length_and_index_prefix() {
        let a = vec![user(), user()];
        assert_eq!(a.divergences(&vec![user()])[0].field, "len");

        let mut b = a.clone();
        b[1].email = "x@example.com".to_string();
        let mismatches = a.divergences(&b);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "[1].email");
    }

    #[test]
    fn test_scalar_divergence() {
        assert!(true.divergences(&true).is_empty());
        assert_eq!(3u64.divergences(&4u64)[0].field, "value");
    }

    #[test]
    fn test_summary_suggests_actions() {
        let u = user();
        let mut shadow = u.clone();
        shadow.id = 99;
        shadow.created_at = u.created_at - chrono::Duration::days(1);

        let summary = report(u.divergences(&shadow)).summary();
        assert!(summary.starts_with("Data validation failed for User find_by_id (1)"));
        assert!(summary.contains("Check ID mapping between stores"));
        assert!(summary.contains("Verify timestamp synchronization between stores"));
        assert!(!summary.contains("full data resynchronization"));
    }

    #[test]
    fn test_summary_for_passed_report() {
        let r = report(Vec::new());
        assert!(r.passed());
        assert_eq!(r.summary(), "Validation passed for User find_by_id (1)");
    }
}
