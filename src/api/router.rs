//! Alert API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Auth/session management is handled by
//! the hosting deployment, not here.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the alert API router with all endpoints under `/api/`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn alert_api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/alerts", post(endpoints::alerts::raise).get(endpoints::alerts::list))
        .route("/alerts/:id", get(endpoints::alerts::detail))
        .route("/alerts/patient/:patient_id", get(endpoints::alerts::by_patient))
        .route("/alerts/:id/assigning", post(endpoints::alerts::assigning))
        .route("/alerts/:id/accept", post(endpoints::alerts::accept))
        .route("/alerts/:id/professional", post(endpoints::alerts::professional))
        .route("/alerts/:id/complete", post(endpoints::alerts::complete))
        .route("/alerts/:id/cancel", post(endpoints::alerts::cancel))
        .route(
            "/alerts/:id/nearest-workers",
            get(endpoints::alerts::nearest_workers),
        )
        .route("/workers", post(endpoints::workers::register).get(endpoints::workers::list))
        .with_state(ctx);

    Router::new().nest("/api", routes)
}
