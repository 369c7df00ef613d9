use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::model::{Ticket, TicketId};
use crate::store::StoreError;

/// Error type for HTTP handlers.
///
/// Renders as `{ "error": <message> }`, with the ticket attached for
/// [`ApiError::AlreadyRedeemed`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("ticket {0} not found")]
    NotFound(TicketId),

    #[error("ticket {} already redeemed", .0.id)]
    AlreadyRedeemed(Box<Ticket>),

    /// Storage or task failure; `message` is what the client sees.
    #[error("{message}: {reason}")]
    Internal {
        message: &'static str,
        reason: String,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Map a store error, reporting persistence failures as `message`.
    pub fn failed(message: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |e| match e {
            StoreError::Validation(_) => ApiError::BadRequest("Name is required".to_string()),
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::Persistence(source) => ApiError::Internal {
                message,
                reason: source.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, json!({ "error": "Ticket not found" }))
            }
            ApiError::AlreadyRedeemed(ticket) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Ticket already redeemed", "ticket": ticket }),
            ),
            ApiError::Internal { message, reason } => {
                error!(reason = %reason, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        (status, Json(body)).into_response()
    }
}
