use std::sync::Arc;

use orders_service::domain::order::{OrderItemRequest, OrderStatus, OrderWorkflow, Product};
use orders_service::metrics::Metrics;
use orders_service::testing::{MemoryOrderStore, StaticCatalog};

fn catalog() -> Vec<Product> {
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

#[tokio::test]
async fn scenario_creation_snapshots_prices_and_totals() {
    // GIVEN: a catalog with p1 at 10 and p2 at 5
    let store = Arc::new(MemoryOrderStore::new());
    let products = Arc::new(StaticCatalog::new(catalog()));
    let workflow = OrderWorkflow::new(
        store.clone(),
        products.clone(),
        Arc::new(Metrics::new().unwrap()),
    );

    // WHEN: creating an order with 2 x p1 and 1 x p2
    let created = workflow
        .create(vec![
            OrderItemRequest {
                product_id: "p1".to_string(),
                quantity: 2,
            },
            OrderItemRequest {
                product_id: "p2".to_string(),
                quantity: 1,
            },
        ])
        .await
        .expect("creation succeeds");

    // THEN: totals follow the validated prices
    assert_eq!(created.order.total_amount, 25.0);
    assert_eq!(created.order.total_items, 3);
    assert_eq!(created.order.status, OrderStatus::Pending);

    // THEN: the catalog price moves, the stored snapshot does not
    products.set_price("p1", 42.0);

    let read = workflow
        .find_one(created.order.id)
        .await
        .expect("order readable");
    assert_eq!(read.order.total_amount, 25.0);
    assert_eq!(read.items[0].price, 10.0);
    assert_eq!(read.items[1].price, 5.0);

    // AND: every read re-validated against the catalog, nothing cached
    assert_eq!(products.calls(), 2);
}
