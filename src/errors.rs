use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let msg = e.to_string();
        match e {
            DomainError::OrderNotFound | DomainError::ProductNotFound { .. } => {
                AppError::NotFound(msg)
            }
            DomainError::Forbidden => AppError::Forbidden(msg),
            DomainError::InvalidTransition { .. }
            | DomainError::InvalidState(_)
            | DomainError::OrderAlreadyCancelled(_)
            | DomainError::CartChanged
            | DomainError::OrderNumberTaken(_) => AppError::Conflict(msg),
            DomainError::EmptyCart | DomainError::InvalidAddress | DomainError::InvalidInput(_) => {
                AppError::BadRequest(msg)
            }
            DomainError::AmountMismatch { .. } => AppError::Unprocessable(msg),
            DomainError::Internal(detail) => AppError::Internal(detail),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Internal(detail) => {
                log::error!("request failed: {}", detail);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Internal server error"
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state_machine::{OrderEvent, OrderStatus};
    use actix_web::ResponseError;
    use bigdecimal::BigDecimal;

    fn status_of(e: DomainError) -> StatusCode {
        AppError::from(e).error_response().status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(status_of(DomainError::OrderNotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_returns_403() {
        assert_eq!(status_of(DomainError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn state_conflicts_return_409() {
        assert_eq!(
            status_of(DomainError::InvalidTransition {
                from: OrderStatus::Completed,
                event: OrderEvent::Dispatched
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::OrderAlreadyCancelled("n".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(DomainError::CartChanged), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::OrderNumberTaken("n".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_failures_return_4xx() {
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::InvalidAddress), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::AmountMismatch {
                expected: BigDecimal::from(10),
                paid: BigDecimal::from(1)
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn internal_error_returns_500_without_details() {
        let err = AppError::from(DomainError::Internal("connection refused".to_string()));
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(err.to_string(), "Internal error: connection refused");
    }
}
