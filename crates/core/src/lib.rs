pub mod article;
pub mod audit;
pub mod auth;
pub mod campaign;
pub mod cleanup;
pub mod config;
pub mod creative;
pub mod http_client;
pub mod metrics;
pub mod orchestrator;
pub mod platform;
pub mod queue;
pub mod scheduler;
pub mod stoploss;
pub mod testing;
pub mod tracking;

pub use article::{ArticleError, ArticleSubmitter, HttpArticleSubmitter, SubmissionResult};
pub use audit::{AuditEvent, AuditHandle};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, OpenAccessAuthenticator,
};
pub use campaign::{
    Campaign, CampaignError, CampaignFilter, CampaignStatus, CampaignStore, ClaimResult,
    CreateCampaignRequest, Platform, SqliteCampaignStore,
};
pub use cleanup::{CleanupConfig, CleanupReport, StuckStateCleanup};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, AuthMethod, Config,
    ConfigError, SanitizedConfig,
};
pub use creative::{CreativeAssets, CreativeGenerator, HttpCreativeGenerator};
pub use orchestrator::{CampaignOrchestrator, OrchestratorError, RunOutcome};
pub use platform::{PlatformLauncher, PlatformRegistry};
pub use queue::{QueueOutcome, QueueProcessor, QueueStatus};
pub use scheduler::{LaunchScheduler, SchedulerConfig, SchedulerStatus};
pub use stoploss::{StopLossConfig, StopLossMonitor, StopLossReport, SqliteViolationStore};
pub use tracking::{PollOutcome, PollerConfig, TrackingLinkPoller};
