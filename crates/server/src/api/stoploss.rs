//! Stop-loss API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use launchpro_core::stoploss::{StopLossError, StopLossViolation, ViolationFilter};
use launchpro_core::StopLossReport;

use super::handlers::{api_error, ApiError};
use super::middleware::AuthUser;
use crate::state::AppState;

const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListViolationsParams {
    pub campaign_id: Option<String>,
    /// Ignored for non-admins, who only see their own violations.
    pub manager_id: Option<String>,
    /// Only unacknowledged violations
    #[serde(default)]
    pub open: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListViolationsResponse {
    pub violations: Vec<StopLossViolation>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn stop_loss_error(e: StopLossError) -> ApiError {
    match e {
        StopLossError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        StopLossError::AlreadyAcknowledged(_) => api_error(StatusCode::CONFLICT, e.to_string()),
        StopLossError::NotOwner { .. } => api_error(StatusCode::FORBIDDEN, e.to_string()),
        e => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Scan every ACTIVE campaign now
pub async fn run_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StopLossReport>, ApiError> {
    state
        .stop_loss()
        .check()
        .await
        .map(Json)
        .map_err(stop_loss_error)
}

pub async fn list_violations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListViolationsParams>,
) -> Result<Json<ListViolationsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = ViolationFilter::new();

    if !user.is_admin {
        base_filter = base_filter.with_manager(&user.user_id);
    } else if let Some(ref manager_id) = params.manager_id {
        base_filter = base_filter.with_manager(manager_id);
    }

    if let Some(ref campaign_id) = params.campaign_id {
        base_filter = base_filter.with_campaign(campaign_id);
    }

    if params.open {
        base_filter = base_filter.open_only();
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let violations = state
        .violations()
        .list(&query_filter)
        .map_err(stop_loss_error)?;
    let total = state
        .violations()
        .count(&base_filter)
        .map_err(stop_loss_error)?;

    Ok(Json(ListViolationsResponse {
        violations,
        total,
        limit,
        offset,
    }))
}

pub async fn acknowledge_violation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<StopLossViolation>, ApiError> {
    state
        .stop_loss()
        .acknowledge(&id, &user.user_id, user.is_admin)
        .await
        .map(Json)
        .map_err(stop_loss_error)
}
