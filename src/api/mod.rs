//! HTTP surface over the ticket store.

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::CorsOrigins;
use crate::store::TicketStore;

mod error;
pub use error::{ApiError, ApiResult};

pub mod handlers;

/// Shared state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TicketStore>,
}

/// Routes without middleware.
pub fn router(store: Arc<TicketStore>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/tickets",
            get(handlers::list_tickets)
                .post(handlers::create_ticket)
                .delete(handlers::delete_ticket),
        )
        .route("/tickets/{id}", get(handlers::get_ticket))
        .route("/scan", post(handlers::scan_ticket))
        .with_state(AppState { store })
}

/// The full application: routes plus CORS and request tracing.
pub fn app(store: Arc<TicketStore>, origins: &CorsOrigins) -> Router {
    router(store)
        .layer(cors(origins))
        .layer(TraceLayer::new_for_http())
}

fn cors(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|_| warn!(origin = %origin, "ignoring invalid CORS origin"))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}
