//! Handlers translating HTTP requests into ticket store calls.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::model::Ticket;
use crate::store::{Redemption, StoreError, TicketStore};

#[derive(Debug, Deserialize)]
pub struct CreateTicket {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub qr_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub message: &'static str,
    pub ticket: Ticket,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Unwrap a JSON body, reporting malformed input as 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Treat a missing or empty field as absent.
fn required(field: Option<String>, message: &str) -> ApiResult<String> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// Run a store operation on the blocking pool.
///
/// Store calls hold the mirror lock across a full file write.
async fn with_store<T, F>(state: &AppState, message: &'static str, op: F) -> ApiResult<T>
where
    F: FnOnce(&TicketStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ApiError::Internal {
            message,
            reason: format!("store task failed: {e}"),
        })?
        .map_err(ApiError::failed(message))
}

/// GET /tickets
///
/// All tickets, newest first.
pub async fn list_tickets(State(state): State<AppState>) -> ApiResult<Json<Vec<Ticket>>> {
    let mut tickets = with_store(&state, "Failed to fetch tickets", TicketStore::list).await?;
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(tickets))
}

/// GET /tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Ticket>> {
    let lookup = id.clone();
    with_store(&state, "Failed to fetch ticket", move |store| store.get_by_id(&lookup))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// POST /tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    payload: Result<Json<CreateTicket>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let name = required(body(payload)?.name, "Name is required")?;
    let ticket =
        with_store(&state, "Failed to create ticket", move |store| store.create(&name)).await?;
    Ok(Json(ticket))
}

/// DELETE /tickets?id=ID
pub async fn delete_ticket(
    State(state): State<AppState>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let id = required(params.id, "Ticket ID is required")?;

    let target = id.clone();
    let removed =
        with_store(&state, "Failed to delete ticket", move |store| store.delete(&target)).await?;

    if !removed {
        warn!(id = %id, "delete of unknown ticket");
        return Err(ApiError::NotFound(id));
    }

    Ok(Json(MessageResponse {
        message: "Ticket deleted",
    }))
}

/// POST /scan
///
/// Redeem the ticket whose id was read from a QR code. A repeat scan is
/// rejected with the ticket attached so the door can see who it belongs to.
pub async fn scan_ticket(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<Json<ScanResponse>> {
    let id = required(body(payload)?.qr_data, "QR data is required")?;

    match with_store(&state, "Failed to scan ticket", move |store| store.scan(&id)).await? {
        Redemption::Redeemed(ticket) => Ok(Json(ScanResponse {
            message: "Success",
            ticket,
        })),
        Redemption::AlreadyRedeemed(ticket) => {
            warn!(id = %ticket.id, name = %ticket.name, "repeat scan rejected");
            Err(ApiError::AlreadyRedeemed(Box::new(ticket)))
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
