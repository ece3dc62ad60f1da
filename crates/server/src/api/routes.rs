use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{audit, campaigns, handlers, middleware as mw, operations, stoploss};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Campaigns
        .route("/campaigns", post(campaigns::create_campaign))
        .route("/campaigns", get(campaigns::list_campaigns))
        .route("/campaigns/{id}", get(campaigns::get_campaign))
        .route("/campaigns/{id}/retry", post(campaigns::retry_campaign))
        .route("/campaigns/{id}/resume", post(campaigns::resume_campaign))
        // Launch queue
        .route("/queue/status", get(operations::queue_status))
        .route("/queue/process", post(operations::process_queue))
        // Stop-loss
        .route("/stop-loss/check", post(stoploss::run_check))
        .route("/stop-loss/violations", get(stoploss::list_violations))
        .route(
            "/stop-loss/violations/{id}/acknowledge",
            post(stoploss::acknowledge_violation),
        )
        // Maintenance
        .route("/cleanup/run", post(operations::run_cleanup))
        .route("/scheduler/status", get(operations::scheduler_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(mw::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
