use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle states of an order. Maps to the `order_status` PostgreSQL enum
/// and is serialized in upper case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Cancelled,
}

/// One requested line of a creation command, before the catalog price is
/// known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

/// Product record returned by the validation RPC. Transient: fetched per
/// operation, never persisted or cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub price: f64,
    pub name: String,
}

/// Persisted order header. `total_amount` and `total_items` are computed once
/// at creation; items are immutable afterwards, so neither is ever re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub total_amount: f64,
    pub total_items: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted line item. `price` is the catalog price snapshot taken when the
/// order was created; later catalog changes do not touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub product_id: String,
    pub price: f64,
    pub quantity: i32,
}

/// Line item with the product name attached for the response payload. The
/// name comes from the validation RPC and is never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedOrderItem {
    pub product_id: String,
    pub price: f64,
    pub quantity: i32,
    pub name: String,
}

/// Response shape for create, get and status transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<EnrichedOrderItem>,
}

// ============================================================================
// Unit Tests
// ============================================================================
