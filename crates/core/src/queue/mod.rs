//! Single-flight launch queue.
//!
//! Each invocation either reports why nothing can run or claims the next
//! QUEUED campaign and runs it to completion through the orchestrator.
//! Mutual exclusion lives entirely in the store's conditional claim.
//!
//! A campaign that stalls mid-stage keeps the slot until it goes stale;
//! the next invocation then resumes it, which bumps its retry count so
//! stuck-state cleanup can eventually fail it.

mod processor;

pub use processor::QueueProcessor;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::{Campaign, CampaignError, CampaignStatus};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("campaign store error: {0}")]
    Store(#[from] CampaignError),
}

/// Minimal view of a campaign in queue reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRef {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
}

impl From<&Campaign> for CampaignRef {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id.clone(),
            name: campaign.name.clone(),
            status: campaign.status,
        }
    }
}

/// Result of one queue invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueueOutcome {
    /// A campaign holds the launch slot. `processing` is `None` only if it
    /// finished between the claim attempt and the lookup.
    Blocked {
        #[serde(skip_serializing_if = "Option::is_none")]
        processing: Option<CampaignRef>,
    },
    QueueEmpty,
    /// The campaign was claimed and the orchestrator ran it.
    Started {
        campaign_id: String,
        name: String,
        final_status: CampaignStatus,
        remaining: i64,
    },
    /// A stalled campaign held the slot and was resumed.
    Resumed {
        campaign_id: String,
        name: String,
        from_status: CampaignStatus,
        final_status: CampaignStatus,
    },
    /// Another invocation claimed the campaign first.
    AlreadyClaimed { campaign_id: String },
    /// The orchestrator errored or panicked; the campaign was marked FAILED.
    StartFailed {
        campaign_id: String,
        name: String,
        error: String,
        remaining: i64,
    },
}

impl QueueOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            QueueOutcome::Blocked { .. } => "blocked",
            QueueOutcome::QueueEmpty => "queue_empty",
            QueueOutcome::Started { .. } => "started",
            QueueOutcome::Resumed { .. } => "resumed",
            QueueOutcome::AlreadyClaimed { .. } => "already_claimed",
            QueueOutcome::StartFailed { .. } => "start_failed",
        }
    }
}

/// Read-only queue summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub processing: Option<CampaignRef>,
    /// The campaign the next invocation would claim.
    pub next: Option<CampaignRef>,
    pub queued: i64,
    /// Campaign counts for every status, in lifecycle order.
    pub counts: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: CampaignStatus,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_tagging() {
        let json = serde_json::to_value(QueueOutcome::QueueEmpty).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "queue_empty"}));

        let json = serde_json::to_value(QueueOutcome::Started {
            campaign_id: "c-1".to_string(),
            name: "Spring".to_string(),
            final_status: CampaignStatus::Active,
            remaining: 2,
        })
        .unwrap();
        assert_eq!(json["outcome"], "started");
        assert_eq!(json["final_status"], "ACTIVE");
        assert_eq!(json["remaining"], 2);

        let json = serde_json::to_value(QueueOutcome::Resumed {
            campaign_id: "c-2".to_string(),
            name: "Autumn".to_string(),
            from_status: CampaignStatus::GeneratingAi,
            final_status: CampaignStatus::Active,
        })
        .unwrap();
        assert_eq!(json["outcome"], "resumed");
        assert_eq!(json["from_status"], "GENERATING_AI");

        let json = serde_json::to_value(QueueOutcome::Blocked { processing: None }).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "blocked"}));
    }
}
