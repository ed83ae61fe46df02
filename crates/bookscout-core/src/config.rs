use crate::error::AppError;
use crate::job::CrawlConfig;
use crate::liveness::HeartbeatConfig;
use crate::pager::DEFAULT_PAGE_SIZE;
use crate::resolver::ResolverConfig;

/// Everything a host needs to wire up the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub resolver: ResolverConfig,
    pub heartbeat: HeartbeatConfig,
    pub crawl: CrawlConfig,
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            crawl: CrawlConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Reject values the client cannot run with. Hosts fill the fields
    /// from their own flags or environment first.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.resolver.host.trim().is_empty() {
            return Err(AppError::ConfigError("host must not be empty".into()));
        }
        if self.resolver.candidates.is_empty() {
            return Err(AppError::ConfigError(
                "at least one candidate port is required".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(AppError::ConfigError("page size must be at least 1".into()));
        }
        if self.heartbeat.normal_interval.is_zero() || self.heartbeat.recovery_interval.is_zero() {
            return Err(AppError::ConfigError(
                "heartbeat intervals must be non-zero".into(),
            ));
        }
        if self.heartbeat.probe_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "health check timeout must be non-zero".into(),
            ));
        }
        if self.crawl.crawl_timeout.is_zero() || self.crawl.store_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "crawl and store timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated port list such as `"8001,8000,8002"`.
pub fn parse_ports(raw: &str) -> Result<Vec<u16>, AppError> {
    let ports = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| AppError::ConfigError(format!("Invalid port '{p}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ports.is_empty() {
        return Err(AppError::ConfigError("port list is empty".into()));
    }
    Ok(ports)
}
