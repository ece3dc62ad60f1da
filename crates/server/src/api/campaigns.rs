//! Campaign API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use launchpro_core::{
    AuditEvent, Campaign, CampaignError, CampaignFilter, CampaignStatus, CreateCampaignRequest,
    OrchestratorError, RunOutcome,
};
use launchpro_core::campaign::{NewPlatformTarget, Offer};

use super::handlers::{api_error, ApiError};
use super::middleware::AuthUser;
use crate::metrics::CAMPAIGNS_CREATED_TOTAL;
use crate::state::AppState;

/// Maximum allowed limit for campaign queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for campaign queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignBody {
    pub name: String,
    /// Owner of the campaign. Only admins may create on behalf of another manager.
    pub manager_id: Option<String>,
    pub offer: Offer,
    /// Lower values launch first; campaigns without one launch after all ordered ones.
    pub queue_order: Option<i64>,
    pub platforms: Vec<NewPlatformTarget>,
}

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsParams {
    /// Filter by status (e.g. "QUEUED")
    pub status: Option<String>,
    pub manager_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListCampaignsResponse {
    pub campaigns: Vec<Campaign>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn store_error(e: CampaignError) -> ApiError {
    match e {
        CampaignError::NotFound(id) => {
            api_error(StatusCode::NOT_FOUND, format!("Campaign not found: {}", id))
        }
        CampaignError::InvalidState { .. } => api_error(StatusCode::CONFLICT, e.to_string()),
        CampaignError::Invalid(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        e => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new QUEUED campaign
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateCampaignBody>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let manager_id = match body.manager_id {
        Some(manager_id) if manager_id != user.user_id => {
            if !user.is_admin {
                return Err(api_error(
                    StatusCode::FORBIDDEN,
                    "Only admins may create campaigns for another manager",
                ));
            }
            manager_id
        }
        _ => user.user_id.clone(),
    };

    if body.platforms.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "At least one platform target is required",
        ));
    }

    let request = CreateCampaignRequest {
        name: body.name,
        manager_id,
        offer: body.offer,
        queue_order: body.queue_order,
        targets: body.platforms,
    };

    let campaign = state.campaigns().create(request).map_err(store_error)?;

    CAMPAIGNS_CREATED_TOTAL.inc();
    state.audit().try_emit(AuditEvent::CampaignCreated {
        campaign_id: campaign.id.clone(),
        created_by: user.user_id,
        name: campaign.name.clone(),
        platforms: campaign
            .platform_targets
            .iter()
            .map(|t| t.platform.to_string())
            .collect(),
        queue_order: campaign.queue_order,
    });

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Get a campaign by ID
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    match state.campaigns().get(&id) {
        Ok(Some(campaign)) => Ok(Json(campaign)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Campaign not found: {}", id),
        )),
        Err(e) => Err(store_error(e)),
    }
}

/// List campaigns with optional filters
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCampaignsParams>,
) -> Result<Json<ListCampaignsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = CampaignFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status: CampaignStatus = status
            .parse()
            .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    if let Some(ref manager_id) = params.manager_id {
        filter = filter.with_manager(manager_id);
    }

    let campaigns = state.campaigns().list(&filter).map_err(store_error)?;

    let count_filter = CampaignFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state.campaigns().count(&count_filter).map_err(store_error)?;

    Ok(Json(ListCampaignsResponse {
        campaigns,
        total,
        limit,
        offset,
    }))
}

/// Put a FAILED campaign back in the queue
pub async fn retry_campaign(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let current = state
        .campaigns()
        .get(&id)
        .map_err(store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Campaign not found: {}", id)))?;

    if !user.is_admin && current.manager_id != user.user_id {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only the campaign's manager or an admin may retry it",
        ));
    }

    let campaign = state.campaigns().requeue_failed(&id).map_err(store_error)?;

    state.audit().try_emit(AuditEvent::CampaignRetried {
        campaign_id: campaign.id.clone(),
        retried_by: user.user_id,
        retry_count: campaign.retry_count,
    });
    state.audit().try_emit(AuditEvent::CampaignStatusChanged {
        campaign_id: campaign.id.clone(),
        from_status: CampaignStatus::Failed.to_string(),
        to_status: CampaignStatus::Queued.to_string(),
        reason: Some("manual_retry".to_string()),
    });

    Ok(Json(campaign))
}

/// Continue a stalled processing campaign from its current stage. Admin only.
///
/// Runs on its own task like a queue invocation. A campaign that moved
/// recently, or that another caller resumed first, is a 409.
pub async fn resume_campaign(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RunOutcome>, ApiError> {
    if !user.is_admin {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only admins may resume campaigns",
        ));
    }

    let orchestrator = Arc::clone(state.orchestrator());
    let resumed = tokio::spawn(async move { orchestrator.resume(&id, &user.user_id).await })
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Resume aborted: {}", e),
            )
        })?;

    match resumed {
        Ok(outcome) => Ok(Json(outcome)),
        Err(OrchestratorError::CampaignNotFound(id)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Campaign not found: {}", id),
        )),
        Err(
            e @ (OrchestratorError::InvalidState { .. }
            | OrchestratorError::NotStale { .. }
            | OrchestratorError::ResumeConflict(_)),
        ) => Err(api_error(StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
