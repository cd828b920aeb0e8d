use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use tweetwatch_ai::{ClassifierConfig, Provider};
use tweetwatch_common::traits::BlacklistRepository;
use tweetwatch_core::Database;
use tweetwatch_core::Error;
use tweetwatch_core::eventbus::EventBus;
use tweetwatch_core::models::ClearPolicy;
use tweetwatch_core::repositories::{InMemoryBlacklistRepository, PostgresBlacklistRepository};
use tweetwatch_core::services::{BlacklistTracker, DEFAULT_THRESHOLD, SentimentService, TrackerConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "tweetwatch")]
#[command(author, version, about = "TweetWatch - tweet sentiment tracking with per-account author blacklists")]
pub struct Args {
    /// Address to which the HTTP server will bind
    #[arg(long, env = "TWEETWATCH_SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Postgres connection URL
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://tweetwatch@localhost:5432/tweetwatch")]
    pub db_url: String,

    /// Storage backend: "postgres" or "memory"
    #[arg(long, env = "TWEETWATCH_STORAGE", default_value = "postgres")]
    pub storage: String,

    /// Negative tweets before an author is blacklisted
    #[arg(long, env = "TWEETWATCH_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: i32,

    /// What unblacklisting does to the count: "keep-count" or "reset-count"
    #[arg(long, env = "TWEETWATCH_CLEAR_POLICY", default_value = "keep-count")]
    pub clear_policy: String,

    /// Extra attempts for a failed store write
    #[arg(long, env = "TWEETWATCH_STORE_RETRIES", default_value_t = 0)]
    pub store_retries: u32,

    /// Classifier: "keyword" or "http"
    #[arg(long, env = "TWEETWATCH_CLASSIFIER", default_value = "keyword")]
    pub classifier: String,

    /// Endpoint of the remote classifier (required for "http")
    #[arg(long, env = "TWEETWATCH_CLASSIFIER_URL")]
    pub classifier_url: Option<String>,

    #[arg(long, env = "TWEETWATCH_CLASSIFIER_TIMEOUT_MS", default_value_t = 5000)]
    pub classifier_timeout_ms: u64,
}

impl Args {
    pub fn tracker_config(&self) -> Result<TrackerConfig, Error> {
        let config = TrackerConfig {
            threshold: self.threshold,
            clear_policy: self.clear_policy.parse::<ClearPolicy>()?,
            store_retries: self.store_retries,
            ..TrackerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            provider_type: self.classifier.clone(),
            api_base: self.classifier_url.clone(),
            timeout: Duration::from_millis(self.classifier_timeout_ms),
            ..ClassifierConfig::default()
        }
    }
}

/// Everything the request handlers share.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SentimentService>,
}

impl AppState {
    pub fn new(service: Arc<SentimentService>) -> Self {
        Self { service }
    }

    pub fn tracker(&self) -> &BlacklistTracker {
        self.service.tracker()
    }
}

/// Opens storage, picks the classifier and wires up the services.
pub async fn build_state(args: &Args, event_bus: Arc<EventBus>) -> Result<AppState, Error> {
    let repo: Arc<dyn BlacklistRepository> = match args.storage.to_lowercase().as_str() {
        "postgres" => {
            info!("Using Postgres storage");
            let db = Database::new(&args.db_url).await?;
            db.migrate().await?;
            Arc::new(PostgresBlacklistRepository::new(db.pool().clone()))
        }
        "memory" => {
            info!("Using in-memory storage; entries are lost on restart");
            Arc::new(InMemoryBlacklistRepository::new())
        }
        other => {
            return Err(Error::Config(format!(
                "unknown storage '{}', expected postgres or memory",
                other
            )));
        }
    };

    let classifier = Provider::from_config(&args.classifier_config())?;
    let tracker = BlacklistTracker::new(repo, event_bus, args.tracker_config()?)?;
    info!(
        threshold = tracker.config().threshold,
        clear_policy = %tracker.config().clear_policy,
        classifier = %args.classifier,
        "Tracker configured"
    );

    Ok(AppState::new(Arc::new(SentimentService::new(
        classifier,
        Arc::new(tracker),
    ))))
}
