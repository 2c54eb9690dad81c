use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::application::checkout_service::CheckoutError;
use crate::application::webhook_service::WebhookError;
use crate::domain::errors::DomainError;
use crate::domain::payment::PaymentError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    PaymentDeclined { message: String, order_id: Uuid },

    #[error("{message}")]
    PaymentUnavailable {
        message: String,
        order_id: Option<Uuid>,
    },

    #[error("Payment provider error: {0}")]
    BadGateway(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Webhook Error: {0}")]
    Webhook(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::InvalidInput(msg) | DomainError::InvalidCart(msg) => {
                AppError::BadRequest(msg)
            }
            e @ (DomainError::DuplicateOrder(_)
            | DomainError::DuplicateProduct(_)
            | DomainError::InvalidTransition { .. }) => {
                AppError::Conflict(e.to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Validation(msg) => AppError::BadRequest(msg),
            e @ CheckoutError::AmountTooSmall { .. } => AppError::BadRequest(e.to_string()),
            CheckoutError::Declined { order_id, reason } => AppError::PaymentDeclined {
                message: reason,
                order_id,
            },
            e @ CheckoutError::Provider { .. } => AppError::PaymentUnavailable {
                order_id: e.order_id(),
                message: e.to_string(),
            },
            e @ CheckoutError::Integrity { .. } => AppError::Conflict(e.to_string()),
            CheckoutError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        match e {
            e @ PaymentError::AmountTooSmall { .. } => AppError::BadRequest(e.to_string()),
            PaymentError::Provider(msg) => AppError::BadGateway(msg),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Signature(msg) | WebhookError::Payload(msg) => AppError::Webhook(msg),
            WebhookError::Store(e) => AppError::Internal(e.to_string()),
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
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Webhook(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::PaymentUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::PaymentDeclined { order_id, .. } => builder.json(json!({
                "error": self.to_string(),
                "order_id": order_id
            })),
            AppError::PaymentUnavailable { order_id, .. } => {
                log::warn!("{}", self);
                builder.json(json!({
                    "error": self.to_string(),
                    "order_id": order_id
                }))
            }
            AppError::Webhook(_) => {
                log::warn!("Rejected webhook: {}", self);
                builder.content_type("text/plain").body(self.to_string())
            }
            AppError::BadGateway(_) => {
                log::error!("{}", self);
                builder.json(json!({ "error": "Error while creating the payment" }))
            }
            AppError::Conflict(_) => {
                log::error!("{}", self);
                builder.json(json!({ "error": self.to_string() }))
            }
            AppError::Internal(_) => {
                log::error!("{}", self);
                builder.json(json!({ "error": "Internal server error" }))
            }
            AppError::NotFound | AppError::BadRequest(_) => {
                builder.json(json!({ "error": self.to_string() }))
            }
        }
    }
}
