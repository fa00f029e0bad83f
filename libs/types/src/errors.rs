//! Error taxonomy shared across the engine
//!
//! Uses thiserror. Layer-specific errors (store, queue, HTTP) live in
//! their own crates; this module covers order-level failures.

use thiserror::Error;

/// Order-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid instrument: {0}")]
    InvalidInstrument(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Order already in terminal state: {status}")]
    AlreadyTerminal { status: String },
}

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("System error: {message}")]
    System { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidPrice("must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid price: must be positive");
    }

    #[test]
    fn test_engine_error_from_order_error() {
        let order_err = OrderError::InvalidQuantity("zero".into());
        let engine_err: EngineError = order_err.into();
        assert!(matches!(engine_err, EngineError::Order(_)));
    }
}
