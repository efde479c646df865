use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("Not found")]
    NotFound,

    #[error("Payment verification failed")]
    SignatureInvalid,

    #[error("Payment gateway unavailable")]
    GatewayUnavailable,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            DomainError::PreconditionFailed(msg) => AppError::PreconditionFailed(msg),
            DomainError::OrderNotFound => AppError::NotFound,
            DomainError::SignatureInvalid => AppError::SignatureInvalid,
            DomainError::GatewayUnavailable(msg) => {
                log::warn!("gateway unavailable: {msg}");
                AppError::GatewayUnavailable
            }
            DomainError::Conflict => AppError::Conflict(e.to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::InvalidTransition(_) | AppError::Conflict(_) => {
                HttpResponse::Conflict().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::PreconditionFailed(_) => HttpResponse::UnprocessableEntity()
                .json(serde_json::json!({ "error": self.to_string() })),
            AppError::NotFound => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            // Deliberately opaque: no hint as to which part of the check
            // failed.
            AppError::SignatureInvalid => HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": "Payment verification failed" })),
            AppError::GatewayUnavailable => HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({ "error": self.to_string() })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;
    use crate::domain::order::OrderStatus;

    #[test]
    fn invalid_transition_returns_409() {
        let err: AppError = DomainError::InvalidTransition {
            from: OrderStatus::Completed,
            action: "reject",
        }
        .into();
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn precondition_failure_returns_422() {
        let err: AppError = DomainError::PreconditionFailed("missing price".into()).into();
        assert_eq!(
            err.error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn order_not_found_returns_404() {
        let err: AppError = DomainError::OrderNotFound.into();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn signature_failure_returns_opaque_400() {
        let err: AppError = DomainError::SignatureInvalid.into();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        // The body must not leak why verification failed.
        assert_eq!(err.to_string(), "Payment verification failed");
    }

    #[test]
    fn gateway_outage_returns_503() {
        let err: AppError = DomainError::GatewayUnavailable("timeout".into()).into();
        assert_eq!(
            err.error_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn concurrent_conflict_returns_409() {
        let err: AppError = DomainError::Conflict.into();
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_error_returns_500_with_generic_body() {
        let err: AppError = DomainError::Internal("boom".into()).into();
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
