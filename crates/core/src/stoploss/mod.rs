//! Stop-loss monitoring for live campaigns.
//!
//! Each scan compares every ACTIVE campaign's net revenue against two loss
//! rules and records at most one open violation per campaign and rule.
//! Newly recorded violations are pushed to the alert notifier; managers
//! acknowledge them through the API.

mod alerts;
mod config;
mod monitor;
mod performance;
mod rules;
mod sqlite;
mod store;

pub use alerts::{AlertNotifier, LogAlertNotifier, WebhookAlertNotifier};
pub use config::StopLossConfig;
pub use monitor::{StopLossMonitor, StopLossReport};
pub use performance::{HttpPerformanceSource, PerformanceSnapshot, PerformanceSource};
pub use rules::evaluate;
pub use sqlite::SqliteViolationStore;
pub use store::{NewViolation, StopLossViolation, ViolationFilter, ViolationKind, ViolationStore};

use thiserror::Error;

use crate::campaign::CampaignError;
use crate::http_client::HttpCallError;

#[derive(Debug, Error)]
pub enum StopLossError {
    #[error("Violation not found: {0}")]
    NotFound(String),

    #[error("Violation {0} is already acknowledged")]
    AlreadyAcknowledged(String),

    #[error("User {user_id} does not own violation {violation_id}")]
    NotOwner {
        violation_id: String,
        user_id: String,
    },

    #[error("campaign store error: {0}")]
    Campaign(#[from] CampaignError),

    #[error("upstream error: {0}")]
    Http(#[from] HttpCallError),

    #[error("invalid performance data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(String),
}
