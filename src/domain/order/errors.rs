use uuid::Uuid;

// ============================================================================
// Order Workflow Errors
// ============================================================================

/// Internal error taxonomy for the order workflow. Carries the full cause for
/// logging; the transport boundary maps it to an [`ErrorCode`] and an opaque
/// message via [`OrderError::external_message`].
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Page and limit must be positive")]
    InvalidPage,

    #[error("Product {0} is missing from the validation response")]
    UnknownProduct(String),

    #[error("Order with id {0} not found")]
    NotFound(Uuid),

    #[error("Product service call failed: {0}")]
    ProductService(#[from] tonic::Status),

    #[error("Storage error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Externally visible error class. Callers see only this code plus the
/// message from [`OrderError::external_message`]; the typed cause stays in
/// the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Internal,
}

impl OrderError {
    /// Map the internal cause to the external class: request/validation
    /// problems are client errors, absent orders are not-found, and upstream
    /// or persistence failures are server errors. A product-service rejection
    /// with a client status code is a validation failure, not an outage.
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::EmptyItems
            | OrderError::InvalidQuantity(_)
            | OrderError::InvalidPage
            | OrderError::UnknownProduct(_) => ErrorCode::BadRequest,
            OrderError::NotFound(_) => ErrorCode::NotFound,
            OrderError::ProductService(status) => match status.code() {
                tonic::Code::NotFound | tonic::Code::InvalidArgument => ErrorCode::BadRequest,
                _ => ErrorCode::Internal,
            },
            OrderError::Store(_) => ErrorCode::Internal,
        }
    }

    /// Message safe to return to the caller. Client-class errors name the
    /// failing entity; server-class errors stay opaque and point at the logs.
    pub fn external_message(&self) -> String {
        match self.code() {
            ErrorCode::Internal => "Internal error, check logs".to_string(),
            _ => self.to_string(),
        }
    }

    /// Stable label for failure counters.
    pub fn cause_label(&self) -> &'static str {
        match self {
            OrderError::EmptyItems => "empty_items",
            OrderError::InvalidQuantity(_) => "invalid_quantity",
            OrderError::InvalidPage => "invalid_page",
            OrderError::UnknownProduct(_) => "unknown_product",
            OrderError::NotFound(_) => "not_found",
            OrderError::ProductService(status) => match status.code() {
                tonic::Code::NotFound | tonic::Code::InvalidArgument => "product_rejected",
                _ => "product_service",
            },
            OrderError::Store(_) => "store",
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
