use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    response::{ApiResponse, Meta},
    sentiment::SentimentError,
    types::status::OrderStatus,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Insufficient stock for product {product_id}")]
    OutOfStock { product_id: Uuid },

    #[error("Order cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Sentiment service unavailable")]
    Upstream(#[from] SentimentError),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_)
            | AppError::OutOfStock { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_conflict() {
        let out_of_stock = AppError::OutOfStock {
            product_id: Uuid::nil(),
        };
        let transition = AppError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Shipped,
        };
        assert_eq!(out_of_stock.status_code(), StatusCode::CONFLICT);
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            transition.to_string(),
            "Order cannot move from Delivered to Shipped"
        );
    }

    #[test]
    fn sentiment_failure_is_bad_gateway() {
        let err = AppError::from(SentimentError::EmptyResponse);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
