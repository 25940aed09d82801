//! App state: stores, engine, config.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dispas_core::constants::{DEFAULT_LEDGER_TIMEOUT_MS, DEFAULT_RETRY_ATTEMPTS};
use dispas_core::error::{DispasError, Result};
use dispas_core::traits::AnnouncementLog;
use dispas_payout::{DistributionEngine, EngineConfig, MemoryLedger, RetryPolicy, StealthSender};
use dispas_registry::{AccountOwnership, FileAnnouncer, MemoryAnnouncer, MemoryMetaRegistry};
use tracing::info;

const DEFAULT_PORT: u16 = 3001;

/// Server configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Interface to bind
    pub bind: IpAddr,
    /// TCP port
    pub port: u16,
    /// Deadline for each ledger call, in milliseconds
    pub ledger_timeout_ms: u64,
    /// Attempts per ledger call, including the first
    pub retry_attempts: u32,
    /// Scanner worker count
    pub scan_parallelism: usize,
    /// JSON-lines announcement log; in-memory when unset
    pub announcement_log: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            ledger_timeout_ms: DEFAULT_LEDGER_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            scan_parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            announcement_log: None,
        }
    }
}

impl ApiConfig {
    /// Loads `.env` if present, then reads the `DISPAS_*` variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            bind: env_or("DISPAS_BIND", defaults.bind)?,
            port: env_or("DISPAS_PORT", defaults.port)?,
            ledger_timeout_ms: env_or("DISPAS_LEDGER_TIMEOUT_MS", defaults.ledger_timeout_ms)?,
            retry_attempts: env_or("DISPAS_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            scan_parallelism: env_or("DISPAS_SCAN_PARALLELISM", defaults.scan_parallelism)?,
            announcement_log: std::env::var("DISPAS_ANNOUNCEMENT_LOG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Socket address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Retry policy for ledger calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .max_attempts(self.retry_attempts)
            .timeout(Duration::from_millis(self.ledger_timeout_ms))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| DispasError::ConfigError(format!("{key} has an invalid value: {raw:?}"))),
        _ => Ok(default),
    }
}

/// Everything the handlers share.
pub struct AppState {
    /// Active configuration
    pub config: ApiConfig,
    /// Smart-account owners
    pub ownership: Arc<AccountOwnership>,
    /// Identity → meta-address
    pub registry: Arc<MemoryMetaRegistry>,
    /// Announcement log (memory or file)
    pub log: Arc<dyn AnnouncementLog>,
    /// Balances
    pub ledger: Arc<MemoryLedger>,
    /// Batch distribution
    pub engine: DistributionEngine,
    /// Stealth transfers between registered accounts
    pub sender: StealthSender,
    /// Server start, for uptime
    pub started: Instant,
}

impl AppState {
    /// Creates state with an in-memory announcement log.
    pub fn new(config: ApiConfig) -> Self {
        Self::with_log(config, Arc::new(MemoryAnnouncer::new()))
    }

    /// Creates state, opening the file log when one is configured.
    pub async fn open(config: ApiConfig) -> Result<Self> {
        let log: Arc<dyn AnnouncementLog> = match &config.announcement_log {
            Some(path) => {
                let file = FileAnnouncer::open(path).await?;
                info!(path = %path.display(), entries = file.len(), "Opened announcement log");
                Arc::new(file)
            }
            None => Arc::new(MemoryAnnouncer::new()),
        };
        Ok(Self::with_log(config, log))
    }

    fn with_log(config: ApiConfig, log: Arc<dyn AnnouncementLog>) -> Self {
        let ownership = Arc::new(AccountOwnership::new());
        let registry = Arc::new(MemoryMetaRegistry::new(ownership.clone()));
        let ledger = Arc::new(MemoryLedger::new());
        let retry = config.retry_policy();

        let engine = DistributionEngine::with_config(
            ownership.clone(),
            ledger.clone(),
            EngineConfig::new().retry(retry.clone()),
        );
        let sender = StealthSender::new(ownership.clone(), registry.clone(), log.clone(), ledger.clone())
            .with_retry(retry);

        Self {
            config,
            ownership,
            registry,
            log,
            ledger,
            engine,
            sender,
            started: Instant::now(),
        }
    }
}
