use std::sync::Arc;

use launchpro_core::{
    article::ArticleSubmitter,
    audit::{AuditHandle, AuditStore},
    campaign::CampaignStore,
    cleanup::StuckStateCleanup,
    creative::CreativeGenerator,
    orchestrator::CampaignOrchestrator,
    platform::PlatformRegistry,
    queue::QueueProcessor,
    scheduler::LaunchScheduler,
    stoploss::{AlertNotifier, PerformanceSource, StopLossMonitor, ViolationStore},
    tracking::{TrackingLinkPoller, TrackingStatusSource},
    Authenticator, Config, SanitizedConfig,
};

/// Upstream systems the launch pipeline depends on.
pub struct Collaborators {
    pub articles: Arc<dyn ArticleSubmitter>,
    pub tracking: Arc<dyn TrackingStatusSource>,
    pub creatives: Arc<dyn CreativeGenerator>,
    pub platforms: PlatformRegistry,
    pub performance: Arc<dyn PerformanceSource>,
    pub notifier: Arc<dyn AlertNotifier>,
}

/// The launch pipeline components, wired against shared stores.
pub struct LaunchServices {
    pub orchestrator: Arc<CampaignOrchestrator>,
    pub queue: Arc<QueueProcessor>,
    pub stop_loss: Arc<StopLossMonitor>,
    pub cleanup: Arc<StuckStateCleanup>,
    pub scheduler: Arc<LaunchScheduler>,
}

impl LaunchServices {
    pub fn new(
        config: &Config,
        campaigns: Arc<dyn CampaignStore>,
        violations: Arc<dyn ViolationStore>,
        collaborators: Collaborators,
        audit: Option<AuditHandle>,
    ) -> Self {
        let orchestrator = Arc::new(CampaignOrchestrator::new(
            Arc::clone(&campaigns),
            collaborators.articles,
            TrackingLinkPoller::new(collaborators.tracking, config.tracking.clone()),
            collaborators.creatives,
            collaborators.platforms.clone(),
            audit.clone(),
        )
        .with_resume_after(chrono::Duration::minutes(
            config.cleanup.stale_after_minutes as i64,
        )));
        let queue = Arc::new(QueueProcessor::new(
            Arc::clone(&campaigns),
            Arc::clone(&orchestrator),
            audit.clone(),
        ));
        let stop_loss = Arc::new(StopLossMonitor::new(
            Arc::clone(&campaigns),
            violations,
            collaborators.performance,
            collaborators.notifier,
            config.stop_loss.clone(),
            audit.clone(),
        ));
        let cleanup = Arc::new(StuckStateCleanup::new(
            campaigns,
            collaborators.platforms,
            config.cleanup.clone(),
            audit,
        ));
        let scheduler = Arc::new(LaunchScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&queue),
            Arc::clone(&stop_loss),
            Arc::clone(&cleanup),
        ));

        Self {
            orchestrator,
            queue,
            stop_loss,
            cleanup,
            scheduler,
        }
    }
}

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    campaigns: Arc<dyn CampaignStore>,
    violations: Arc<dyn ViolationStore>,
    services: LaunchServices,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        campaigns: Arc<dyn CampaignStore>,
        violations: Arc<dyn ViolationStore>,
        services: LaunchServices,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit,
            audit_store,
            campaigns,
            violations,
            services,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn campaigns(&self) -> &dyn CampaignStore {
        self.campaigns.as_ref()
    }

    pub fn violations(&self) -> &dyn ViolationStore {
        self.violations.as_ref()
    }

    pub fn orchestrator(&self) -> &Arc<CampaignOrchestrator> {
        &self.services.orchestrator
    }

    pub fn queue(&self) -> &Arc<QueueProcessor> {
        &self.services.queue
    }

    pub fn stop_loss(&self) -> &StopLossMonitor {
        &self.services.stop_loss
    }

    pub fn cleanup(&self) -> &StuckStateCleanup {
        &self.services.cleanup
    }

    pub fn scheduler(&self) -> &LaunchScheduler {
        &self.services.scheduler
    }
}
