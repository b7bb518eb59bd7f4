use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::metrics::Metrics;
use crate::rpc::ProductValidator;
use crate::store::OrderStore;

use super::errors::{ErrorCode, OrderError};
use super::pagination::{Page, Pagination};
use super::value_objects::{
    EnrichedOrderItem, Order, OrderDetails, OrderItem, OrderItemRequest, OrderStatus, Product,
};

// ============================================================================
// Order Workflow
// ============================================================================
//
// Orchestrates: validation RPC → pricing → atomic persistence → enrichment.
//
// Holds only shared long-lived handles; all state lives in the store and the
// product service, so concurrent requests need no workflow-side locking.
//
// ============================================================================

pub struct OrderWorkflow {
    store: Arc<dyn OrderStore>,
    products: Arc<dyn ProductValidator>,
    metrics: Arc<Metrics>,
}

impl OrderWorkflow {
    pub fn new(
        store: Arc<dyn OrderStore>,
        products: Arc<dyn ProductValidator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            products,
            metrics,
        }
    }

    /// Create an order from the requested lines: validate every product,
    /// snapshot prices, compute totals, persist atomically and return the
    /// enriched result.
    pub async fn create(&self, items: Vec<OrderItemRequest>) -> Result<OrderDetails, OrderError> {
        match self.create_inner(items).await {
            Ok(details) => {
                self.metrics.record_order_created();
                Ok(details)
            }
            Err(error) => {
                self.record_failure("create", &error);
                Err(error)
            }
        }
    }

    /// Paginated listing with an optional status filter. Returns bare order
    /// headers: no items and no name enrichment in the list view.
    pub async fn find_all(&self, pagination: Pagination) -> Result<Page<Order>, OrderError> {
        match self.find_all_inner(pagination).await {
            Ok(page) => Ok(page),
            Err(error) => {
                self.record_failure("find_all", &error);
                Err(error)
            }
        }
    }

    /// Load one order with its items, re-validating the referenced products
    /// to attach current names. Always re-fetches; nothing is cached.
    pub async fn find_one(&self, id: Uuid) -> Result<OrderDetails, OrderError> {
        match self.find_one_inner(id).await {
            Ok(details) => Ok(details),
            Err(error) => {
                self.record_failure("find_one", &error);
                Err(error)
            }
        }
    }

    /// Transition an order to `status`. Requesting the current status is an
    /// idempotent no-op that performs no write, so retries are safe.
    pub async fn change_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderDetails, OrderError> {
        match self.change_status_inner(id, status).await {
            Ok(details) => Ok(details),
            Err(error) => {
                self.record_failure("change_status", &error);
                Err(error)
            }
        }
    }

    async fn create_inner(
        &self,
        items: Vec<OrderItemRequest>,
    ) -> Result<OrderDetails, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity(item.quantity));
            }
        }

        // Step 1: confirm the distinct product ids against the catalog.
        let product_ids = distinct_product_ids(items.iter().map(|item| item.product_id.as_str()));
        let products = self.validate(&product_ids).await?;
        let by_id: HashMap<&str, &Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        // Step 2: resolve each line against the response and compute totals.
        // An id the response does not cover is fatal, never a partial order.
        let mut total_amount = 0.0;
        let mut total_items = 0;
        let mut enriched = Vec::with_capacity(items.len());
        for item in &items {
            let product = by_id
                .get(item.product_id.as_str())
                .ok_or_else(|| OrderError::UnknownProduct(item.product_id.clone()))?;

            total_amount += product.price * f64::from(item.quantity);
            total_items += item.quantity;
            enriched.push(EnrichedOrderItem {
                product_id: item.product_id.clone(),
                price: product.price,
                quantity: item.quantity,
                name: product.name.clone(),
            });
        }

        // Step 3: persist the order and every snapshot line in one
        // transaction.
        let lines: Vec<OrderItem> = enriched
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();
        let order = self.store.create_order(total_amount, total_items, &lines).await?;

        tracing::info!(
            order_id = %order.id,
            total_amount = order.total_amount,
            total_items = order.total_items,
            "Order created"
        );

        // Names ride along in the response only; they were never persisted.
        Ok(OrderDetails {
            order,
            items: enriched,
        })
    }

    async fn find_all_inner(&self, pagination: Pagination) -> Result<Page<Order>, OrderError> {
        if pagination.page == 0 || pagination.limit == 0 {
            return Err(OrderError::InvalidPage);
        }

        let total = self.store.count_orders(pagination.status).await?;
        let data = self
            .store
            .list_orders(pagination.status, pagination.offset(), pagination.limit)
            .await?;

        tracing::debug!(
            total,
            page = pagination.page,
            returned = data.len(),
            "Listed orders"
        );

        Ok(Page {
            data,
            meta: pagination.meta(total),
        })
    }

    async fn find_one_inner(&self, id: Uuid) -> Result<OrderDetails, OrderError> {
        let (order, items) = self
            .store
            .find_order(id)
            .await?
            .ok_or(OrderError::NotFound(id))?;

        let product_ids = distinct_product_ids(items.iter().map(|item| item.product_id.as_str()));
        let products = self.validate(&product_ids).await?;
        let names: HashMap<&str, &str> = products
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        let items = items
            .into_iter()
            .map(|item| {
                let name = names
                    .get(item.product_id.as_str())
                    .copied()
                    .ok_or_else(|| OrderError::UnknownProduct(item.product_id.clone()))?;
                Ok(EnrichedOrderItem {
                    name: name.to_string(),
                    product_id: item.product_id,
                    price: item.price,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(OrderDetails { order, items })
    }

    async fn change_status_inner(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderDetails, OrderError> {
        let current = self.find_one_inner(id).await?;

        if current.order.status == status {
            tracing::debug!(order_id = %id, status = ?status, "Status unchanged, no-op");
            self.metrics.record_status_transition(false);
            return Ok(current);
        }

        let updated = self
            .store
            .update_status(id, status)
            .await?
            .ok_or(OrderError::NotFound(id))?;
        self.metrics.record_status_transition(true);

        // The read above already attached names; the write path does not run
        // a second validation.
        Ok(OrderDetails {
            order: updated,
            items: current.items,
        })
    }

    async fn validate(&self, product_ids: &[String]) -> Result<Vec<Product>, OrderError> {
        let started = Instant::now();
        let result = self.products.validate_products(product_ids).await;
        self.metrics
            .record_product_validation(started.elapsed().as_secs_f64(), result.is_ok());
        Ok(result?)
    }

    fn record_failure(&self, operation: &'static str, error: &OrderError) {
        match error.code() {
            ErrorCode::Internal => {
                tracing::error!(operation, error = %error, "Order operation failed")
            }
            _ => tracing::warn!(operation, error = %error, "Order operation rejected"),
        }
        self.metrics.record_order_failure(operation, error.cause_label());
    }
}

fn distinct_product_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).map(str::to_owned).collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryOrderStore, StaticCatalog};

    fn catalog_products() -> Vec<Product> {
        vec![
            Product {
                id: "p1".to_string(),
                price: 10.0,
                name: "Keyboard".to_string(),
            },
            Product {
                id: "p2".to_string(),
                price: 5.0,
                name: "Mouse".to_string(),
            },
        ]
    }

    fn workflow_with(
        store: Arc<MemoryOrderStore>,
        catalog: Arc<StaticCatalog>,
    ) -> OrderWorkflow {
        OrderWorkflow::new(store, catalog, Arc::new(Metrics::new().unwrap()))
    }

    fn request(product_id: &str, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_create_computes_totals_from_validated_prices() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let details = workflow
            .create(vec![request("p1", 2), request("p2", 1)])
            .await
            .unwrap();

        assert_eq!(details.order.total_amount, 25.0);
        assert_eq!(details.order.total_items, 3);
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(store.order_count(), 1);

        // Names attached from the validation response, prices snapshot
        assert_eq!(details.items[0].name, "Keyboard");
        assert_eq!(details.items[0].price, 10.0);
        assert_eq!(details.items[1].name, "Mouse");
        assert_eq!(details.items[1].price, 5.0);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_items() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let error = workflow.create(vec![]).await.unwrap_err();

        assert!(matches!(error, OrderError::EmptyItems));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_quantity() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let error = workflow.create(vec![request("p1", 0)]).await.unwrap_err();

        assert!(matches!(error, OrderError::InvalidQuantity(0)));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_create_fails_whole_order_when_service_rejects_batch() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let error = workflow
            .create(vec![request("p1", 2), request("missing", 1)])
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::BadRequest);
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_create_detects_ids_missing_from_lenient_response() {
        // An upstream that silently drops unknown ids must still fail the
        // whole creation locally.
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::lenient(catalog_products())),
        );

        let error = workflow
            .create(vec![request("p1", 1), request("ghost", 1)])
            .await
            .unwrap_err();

        assert!(matches!(error, OrderError::UnknownProduct(ref id) if id == "ghost"));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_create_surfaces_unreachable_product_service_as_internal() {
        let store = Arc::new(MemoryOrderStore::new());
        let catalog = Arc::new(StaticCatalog::new(catalog_products()));
        catalog.set_unavailable(true);
        let workflow = workflow_with(store.clone(), catalog);

        let error = workflow.create(vec![request("p1", 1)]).await.unwrap_err();

        assert!(matches!(error, OrderError::ProductService(_)));
        assert_eq!(error.code(), ErrorCode::Internal);
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_create_surfaces_store_failure() {
        let store = Arc::new(MemoryOrderStore::new());
        store.set_failing(true);
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let error = workflow.create(vec![request("p1", 1)]).await.unwrap_err();

        assert!(matches!(error, OrderError::Store(_)));
        assert_eq!(error.code(), ErrorCode::Internal);
    }

    #[tokio::test]
    async fn test_create_deduplicates_ids_for_validation() {
        let store = Arc::new(MemoryOrderStore::new());
        let catalog = Arc::new(StaticCatalog::new(catalog_products()));
        let workflow = workflow_with(store, catalog.clone());

        let details = workflow
            .create(vec![request("p1", 1), request("p1", 3)])
            .await
            .unwrap();

        assert_eq!(catalog.calls(), 1);
        assert_eq!(details.order.total_amount, 40.0);
        assert_eq!(details.order.total_items, 4);
    }

    #[tokio::test]
    async fn test_find_one_enriches_and_refetches_every_time() {
        let store = Arc::new(MemoryOrderStore::new());
        let catalog = Arc::new(StaticCatalog::new(catalog_products()));
        let workflow = workflow_with(store, catalog.clone());

        let created = workflow.create(vec![request("p1", 2)]).await.unwrap();

        let first = workflow.find_one(created.order.id).await.unwrap();
        let second = workflow.find_one(created.order.id).await.unwrap();

        assert_eq!(first.items[0].name, "Keyboard");
        assert_eq!(second, first);
        // create + two reads, one validation call each: nothing cached
        assert_eq!(catalog.calls(), 3);
    }

    #[tokio::test]
    async fn test_find_one_unknown_id_is_not_found() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow =
            workflow_with(store, Arc::new(StaticCatalog::new(catalog_products())));

        let id = Uuid::new_v4();
        let error = workflow.find_one(id).await.unwrap_err();

        assert!(matches!(error, OrderError::NotFound(found) if found == id));
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_catalog_change() {
        let store = Arc::new(MemoryOrderStore::new());
        let catalog = Arc::new(StaticCatalog::new(catalog_products()));
        let workflow = workflow_with(store, catalog.clone());

        let created = workflow.create(vec![request("p1", 2)]).await.unwrap();
        assert_eq!(created.order.total_amount, 20.0);

        catalog.set_price("p1", 99.0);

        let read = workflow.find_one(created.order.id).await.unwrap();
        assert_eq!(read.items[0].price, 10.0);
        assert_eq!(read.order.total_amount, 20.0);
    }

    #[tokio::test]
    async fn test_find_all_rejects_zero_window() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow =
            workflow_with(store, Arc::new(StaticCatalog::new(catalog_products())));

        let error = workflow
            .find_all(Pagination {
                status: None,
                page: 0,
                limit: 10,
            })
            .await
            .unwrap_err();

        assert!(matches!(error, OrderError::InvalidPage));
    }

    #[tokio::test]
    async fn test_change_status_persists_new_value() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let created = workflow.create(vec![request("p1", 1)]).await.unwrap();
        let updated = workflow
            .change_status(created.order.id, OrderStatus::Paid)
            .await
            .unwrap();

        assert_eq!(updated.order.status, OrderStatus::Paid);
        let (stored, _) = store.find_order(created.order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        // Enrichment from the read is reused on the write path
        assert_eq!(updated.items[0].name, "Keyboard");
    }

    #[tokio::test]
    async fn test_change_status_to_current_value_is_noop() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow = workflow_with(
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_products())),
        );

        let created = workflow.create(vec![request("p1", 1)]).await.unwrap();
        let paid = workflow
            .change_status(created.order.id, OrderStatus::Paid)
            .await
            .unwrap();

        let repeated = workflow
            .change_status(created.order.id, OrderStatus::Paid)
            .await
            .unwrap();

        // No second write observable: the update timestamp did not move
        assert_eq!(repeated.order, paid.order);
        assert_eq!(repeated.order.updated_at, paid.order.updated_at);
    }

    #[tokio::test]
    async fn test_change_status_unknown_order_is_not_found() {
        let store = Arc::new(MemoryOrderStore::new());
        let workflow =
            workflow_with(store, Arc::new(StaticCatalog::new(catalog_products())));

        let error = workflow
            .change_status(Uuid::new_v4(), OrderStatus::Paid)
            .await
            .unwrap_err();

        assert!(matches!(error, OrderError::NotFound(_)));
    }

    #[test]
    fn test_distinct_product_ids_preserves_first_occurrence_order() {
        let ids = distinct_product_ids(["p2", "p1", "p2", "p3", "p1"].into_iter());
        assert_eq!(ids, vec!["p2", "p1", "p3"]);
    }
}
