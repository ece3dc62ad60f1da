//! Campaign orchestrator.
//!
//! Drives one campaign through the launch pipeline:
//! PENDING_ARTICLE → AWAITING_TRACKING → ARTICLE_APPROVED → GENERATING_AI
//! → LAUNCHING → ACTIVE, with FAILED reachable from every stage.
//!
//! Every status write is a compare-and-swap from the stage being worked on.
//! Losing one means someone else moved the campaign, and the run stops
//! without writing anything further.
//!
//! A resume takes over a campaign only after it has sat in one stage past
//! the resume threshold, and only one resumer wins a given stall. Platform
//! targets are claimed individually before the platform is called.

mod launch;
mod runner;
mod types;

pub use launch::TargetOutcome;
pub use runner::{CampaignOrchestrator, DEFAULT_RESUME_AFTER_MINUTES};
pub use types::{OrchestratorError, RunOutcome};
