use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested move is not an edge of the transition table.
    #[error("transition '{action}' is not allowed from status '{from}'")]
    InvalidTransition {
        from: OrderStatus,
        action: &'static str,
    },

    /// The edge exists but a required field or condition is missing.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("order not found")]
    OrderNotFound,

    /// Deliberately opaque: the caller is never told which part of the
    /// signature check failed.
    #[error("payment verification failed")]
    SignatureInvalid,

    /// Transient gateway failure; the client may retry.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Optimistic status check lost against a concurrent transition.
    #[error("order was modified concurrently")]
    Conflict,

    #[error("internal error: {0}")]
    Internal(String),
}
