use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::Status;

use crate::domain::order::Product;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

use super::proto;
use super::proto::product_validation_client::ProductValidationClient;

// ============================================================================
// Product Validation Client
// ============================================================================
//
// Long-lived handle to the external product service. The contract: a
// successful response contains every requested id with its current price and
// name; the service fails the whole batch when any id is unknown. Nothing is
// cached, every caller re-fetches.
//
// ============================================================================

/// Seam between the workflow and the product service.
#[async_trait]
pub trait ProductValidator: Send + Sync {
    /// Confirm that every id exists in the catalog and return the current
    /// price and name for each.
    async fn validate_products(&self, product_ids: &[String]) -> Result<Vec<Product>, Status>;
}

pub struct GrpcProductValidator {
    client: ProductValidationClient<Channel>,
    circuit_breaker: CircuitBreaker,
}

impl GrpcProductValidator {
    pub fn new(channel: Channel) -> Self {
        // Open after repeated failures so a dead product service fails fast
        // instead of stacking up in-flight RPCs.
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            timeout: std::time::Duration::from_secs(30),
            success_threshold: 2,
        };

        Self {
            client: ProductValidationClient::new(channel),
            circuit_breaker: CircuitBreaker::new(cb_config),
        }
    }
}

#[async_trait]
impl ProductValidator for GrpcProductValidator {
    async fn validate_products(&self, product_ids: &[String]) -> Result<Vec<Product>, Status> {
        // Tonic clients take &mut self; the channel underneath is cheap to
        // clone and multiplexes over one connection.
        let mut client = self.client.clone();
        let request = proto::ValidateProductsRequest {
            product_ids: product_ids.to_vec(),
        };

        let result = self
            .circuit_breaker
            .call(async move { client.validate_products(tonic::Request::new(request)).await })
            .await;

        match result {
            Ok(response) => {
                let products: Vec<Product> = response
                    .into_inner()
                    .products
                    .into_iter()
                    .map(product_from_proto)
                    .collect();

                tracing::debug!(
                    requested = product_ids.len(),
                    returned = products.len(),
                    "Validated products"
                );

                Ok(products)
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!("Circuit breaker open - product service unavailable");
                Err(Status::unavailable("product service unavailable"))
            }
            Err(CircuitBreakerError::OperationFailed(status)) => {
                tracing::error!(error = %status, "Product validation call failed");
                Err(status)
            }
        }
    }
}

fn product_from_proto(product: proto::Product) -> Product {
    Product {
        id: product.id,
        price: product.price,
        name: product.name,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
