mod products;

pub use products::{GrpcProductValidator, ProductValidator};

/// Generated types for the product-validation contract.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/products.v1.rs"));
}
