//! Shared application state: configuration plus the long-lived clients and
//! admission structures every request handler needs.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use llm_gateway::{HealthService, LlmGateway, gateway::gateway_from_env};
use reviewer::github::DEFAULT_API_BASE;
use reviewer::{Admission, AppConfig, GitHubClient, JobLocks, ReviewContext};

use crate::error_handler::AppError;

/// Process-wide shared state. Built once at startup; all fields are shared
/// handles safe for concurrent use.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub github: Arc<GitHubClient>,
    /// `None` when neither LLM provider could be constructed; jobs then
    /// fail with a provider-unavailable outcome and health reports it.
    pub gateway: Option<Arc<LlmGateway>>,
    pub admission: Arc<Admission>,
    pub job_locks: Arc<JobLocks>,
    /// Bounded pool of concurrent review jobs (backpressure).
    pub job_slots: Arc<Semaphore>,
    pub health: Arc<HealthService>,
}

impl AppState {
    /// Loads configuration and constructs all shared dependencies.
    ///
    /// Missing required secrets fail fast; a missing LLM credential only
    /// degrades the gateway (the webhook surface stays up so operators see
    /// the problem in `/health` instead of a crash loop).
    pub fn from_env() -> Result<Self, AppError> {
        let config = Arc::new(AppConfig::from_env()?);

        let github = Arc::new(GitHubClient::new(DEFAULT_API_BASE, &config.github_token)?);

        let gateway = match gateway_from_env() {
            Ok(g) => {
                info!(provider = %g.provider(), degraded = g.primary_degraded, "llm gateway constructed");
                Some(Arc::new(g))
            }
            Err(e) => {
                warn!(error = %e, "llm gateway unavailable, reviews will fail until fixed");
                None
            }
        };

        let admission = Arc::new(Admission::new(&config));
        let job_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs));

        let health = Arc::new(
            HealthService::new(Some(5)).map_err(|e| AppError::Startup(e.to_string()))?,
        );

        Ok(Self {
            config,
            github,
            gateway,
            admission,
            job_locks: Arc::new(JobLocks::new()),
            job_slots,
            health,
        })
    }

    /// Dependency bundle handed to each spawned review job.
    pub fn review_context(&self) -> ReviewContext {
        ReviewContext {
            config: Arc::clone(&self.config),
            github: Arc::clone(&self.github),
            gateway: self.gateway.clone(),
            admission: Arc::clone(&self.admission),
            job_locks: Arc::clone(&self.job_locks),
        }
    }
}
