//! Campaigns, their platform targets, and durable storage.

mod sqlite_store;
mod store;
mod types;

pub(crate) use sqlite_store::{format_timestamp, parse_timestamp};
pub use sqlite_store::SqliteCampaignStore;
pub use store::{
    CampaignError, CampaignFilter, CampaignStore, ClaimResult, CreateCampaignRequest,
    StatusUpdate, TargetUpdate,
};
pub use types::{
    BudgetMode, Campaign, CampaignStatus, ErrorDetails, ErrorKind, NewPlatformTarget, Offer,
    Platform, PlatformErrorEntry, PlatformTarget, TargetStatus, MAX_ERROR_CONTEXT_CHARS,
};
