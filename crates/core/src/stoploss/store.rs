//! Violation storage trait and types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StopLossError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    ImmediateLoss,
    TimeBasedLoss,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::ImmediateLoss => "IMMEDIATE_LOSS",
            ViolationKind::TimeBasedLoss => "TIME_BASED_LOSS",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMMEDIATE_LOSS" => Ok(ViolationKind::ImmediateLoss),
            "TIME_BASED_LOSS" => Ok(ViolationKind::TimeBasedLoss),
            other => Err(format!("unknown violation kind: {}", other)),
        }
    }
}

/// A recorded loss-rule breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossViolation {
    pub id: String,
    pub campaign_id: String,
    /// Owner of the campaign, and so of the violation.
    pub manager_id: String,
    pub kind: ViolationKind,
    pub net_revenue: f64,
    pub active_hours: f64,
    pub detected_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
}

impl StopLossViolation {
    pub fn is_open(&self) -> bool {
        self.acknowledged_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewViolation {
    pub campaign_id: String,
    pub manager_id: String,
    pub kind: ViolationKind,
    pub net_revenue: f64,
    pub active_hours: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ViolationFilter {
    pub manager_id: Option<String>,
    pub campaign_id: Option<String>,
    pub open_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ViolationFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationFilter {
    pub fn new() -> Self {
        Self {
            manager_id: None,
            campaign_id: None,
            open_only: false,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_manager(mut self, manager_id: impl Into<String>) -> Self {
        self.manager_id = Some(manager_id.into());
        self
    }

    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

pub trait ViolationStore: Send + Sync {
    /// Record a violation unless an open one exists for the same campaign
    /// and kind. Returns `None` when nothing was inserted.
    fn record(&self, violation: NewViolation) -> Result<Option<StopLossViolation>, StopLossError>;

    fn get(&self, id: &str) -> Result<Option<StopLossViolation>, StopLossError>;

    /// Newest first.
    fn list(&self, filter: &ViolationFilter) -> Result<Vec<StopLossViolation>, StopLossError>;

    fn count(&self, filter: &ViolationFilter) -> Result<i64, StopLossError>;

    /// Mark an open violation acknowledged. Returns false if it was not open.
    fn acknowledge(
        &self,
        id: &str,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StopLossError>;
}
