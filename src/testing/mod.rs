//! Test support: in-memory implementations of the storage and product
//! validation seams, so workflow behavior can be exercised without a running
//! PostgreSQL instance or product service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tonic::Status;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem, OrderStatus, Product};
use crate::rpc::ProductValidator;
use crate::store::OrderStore;

// ============================================================================
// In-Memory Order Store
// ============================================================================

struct StoredOrder {
    order: Order,
    items: Vec<OrderItem>,
}

/// Vec-backed [`OrderStore`]. Insertion order doubles as creation order, the
/// same stable order the PostgreSQL implementation sorts by.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<StoredOrder>>,
    failing: AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, simulating a store outage.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(
        &self,
        total_amount: f64,
        total_items: i32,
        items: &[OrderItem],
    ) -> Result<Order, sqlx::Error> {
        self.check_available()?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            total_amount,
            total_items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.orders.lock().unwrap().push(StoredOrder {
            order: order.clone(),
            items: items.to_vec(),
        });

        Ok(order)
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, sqlx::Error> {
        self.check_available()?;

        let orders = self.orders.lock().unwrap();
        let total = orders
            .iter()
            .filter(|stored| status.is_none() || status == Some(stored.order.status))
            .count();
        Ok(total as u64)
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, sqlx::Error> {
        self.check_available()?;

        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|stored| status.is_none() || status == Some(stored.order.status))
            .skip(offset as usize)
            .take(limit as usize)
            .map(|stored| stored.order.clone())
            .collect())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<(Order, Vec<OrderItem>)>, sqlx::Error> {
        self.check_available()?;

        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .find(|stored| stored.order.id == id)
            .map(|stored| (stored.order.clone(), stored.items.clone())))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        self.check_available()?;

        let mut orders = self.orders.lock().unwrap();
        let Some(stored) = orders.iter_mut().find(|stored| stored.order.id == id) else {
            return Ok(None);
        };

        stored.order.status = status;
        stored.order.updated_at = Utc::now();
        Ok(Some(stored.order.clone()))
    }
}

// ============================================================================
// Static Product Catalog
// ============================================================================

/// Fixed-inventory [`ProductValidator`]. In strict mode it honors the batch
/// contract and rejects the whole request when any id is unknown; in lenient
/// mode it returns only the ids it knows, simulating an upstream that breaks
/// the contract.
pub struct StaticCatalog {
    products: Mutex<Vec<Product>>,
    strict: bool,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            strict: true,
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn lenient(products: Vec<Product>) -> Self {
        Self {
            strict: false,
            ..Self::new(products)
        }
    }

    /// Change a catalog price after orders were created, to observe that
    /// stored snapshots do not move.
    pub fn set_price(&self, product_id: &str, price: f64) {
        let mut products = self.products.lock().unwrap();
        if let Some(product) = products.iter_mut().find(|p| p.id == product_id) {
            product.price = price;
        }
    }

    /// Simulate the product service being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of validation calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductValidator for StaticCatalog {
    async fn validate_products(&self, product_ids: &[String]) -> Result<Vec<Product>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Status::unavailable("product service unavailable"));
        }

        let products = self.products.lock().unwrap();
        let mut found = Vec::new();
        for id in product_ids {
            match products.iter().find(|p| &p.id == id) {
                Some(product) => found.push(product.clone()),
                None if self.strict => {
                    return Err(Status::not_found(format!("product {id} not found")));
                }
                None => {}
            }
        }

        Ok(found)
    }
}
