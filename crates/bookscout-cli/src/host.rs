use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;

use bookscout_client::ReqwestBackend;
use bookscout_core::config::{ClientConfig, parse_ports};
use bookscout_core::{
    ClientContext, ConfirmGate, CrawlOrchestrator, Endpoint, EndpointResolver, LivenessMonitor,
    LivenessState, Navigator,
};

/// Connection settings shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Host the backend listens on
    #[arg(long, global = true, env = "BOOKSCOUT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Candidate ports, highest priority first
    #[arg(
        long,
        global = true,
        env = "BOOKSCOUT_PORTS",
        default_value = "8001,8000,8002,8003,8004,8005"
    )]
    pub ports: String,

    /// Books per page
    #[arg(long, global = true, env = "BOOKSCOUT_PAGE_SIZE", default_value_t = 10)]
    pub page_size: usize,

    /// Seconds to wait for a crawl to finish
    #[arg(long, global = true, env = "BOOKSCOUT_CRAWL_TIMEOUT", default_value_t = 180)]
    pub crawl_timeout: u64,

    /// Seconds to wait for store reads
    #[arg(long, global = true, env = "BOOKSCOUT_STORE_TIMEOUT", default_value_t = 30)]
    pub store_timeout: u64,

    /// Seconds between heartbeats while the backend is up
    #[arg(long, global = true, env = "BOOKSCOUT_HEARTBEAT", default_value_t = 15)]
    pub heartbeat_interval: u64,

    /// Seconds to wait for a heartbeat health check
    #[arg(long, global = true, env = "BOOKSCOUT_HEALTH_TIMEOUT", default_value_t = 3)]
    pub health_timeout: u64,

    /// Seconds between an outage and leaving the session
    #[arg(long, global = true, env = "BOOKSCOUT_NAVIGATE_DELAY", default_value_t = 3)]
    pub navigate_delay: u64,
}

impl ConnectArgs {
    pub fn to_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::default();
        config.resolver.host = self.host.clone();
        config.resolver.candidates = parse_ports(&self.ports).context("Invalid --ports")?;
        config.page_size = self.page_size;
        config.crawl = config
            .crawl
            .with_crawl_timeout(Duration::from_secs(self.crawl_timeout))
            .with_store_timeout(Duration::from_secs(self.store_timeout));
        config.heartbeat = config
            .heartbeat
            .with_normal_interval(Duration::from_secs(self.heartbeat_interval))
            .with_probe_timeout(Duration::from_secs(self.health_timeout))
            .with_navigate_delay(Duration::from_secs(self.navigate_delay));
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Confirmation for unbounded crawls.
pub enum CliGate {
    /// `--yes` was given.
    AssumeYes,
    /// Ask on stdin. Only for one-shot commands, where nothing else reads stdin.
    Stdin,
    /// Interactive session: the answer was collected before submitting.
    Session(AtomicBool),
}

impl CliGate {
    pub fn session() -> Self {
        CliGate::Session(AtomicBool::new(false))
    }

    /// Record the session user's answer for the next confirmation.
    pub fn preapprove(&self, approved: bool) {
        if let CliGate::Session(flag) = self {
            flag.store(approved, Ordering::SeqCst);
        }
    }
}

impl ConfirmGate for CliGate {
    fn confirm(&self, prompt: &str) -> bool {
        match self {
            CliGate::AssumeYes => true,
            CliGate::Session(flag) => flag.swap(false, Ordering::SeqCst),
            CliGate::Stdin => {
                eprint!("{prompt} [y/N] ");
                let _ = std::io::stderr().flush();
                let mut answer = String::new();
                if std::io::stdin().lock().read_line(&mut answer).is_err() {
                    return false;
                }
                is_yes(&answer)
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// "Returning home" for a terminal host means ending the session.
pub struct ExitOnNavigate {
    cancel: CancellationToken,
}

impl Navigator for ExitOnNavigate {
    fn navigate_away(&self) {
        self.cancel.cancel();
    }
}

pub struct Client {
    pub config: ClientConfig,
    pub ctx: Arc<ClientContext>,
    pub monitor: Arc<LivenessMonitor<ReqwestBackend>>,
    pub orchestrator: CrawlOrchestrator<ReqwestBackend, CliGate>,
    /// Cancelled when the monitor navigates away.
    pub cancel: CancellationToken,
}

/// Discover the backend port and wire up the client components.
/// Does not probe liveness yet.
pub async fn connect(args: &ConnectArgs, gate: CliGate) -> Result<Client> {
    let config = args.to_config()?;
    let backend = ReqwestBackend::new().context("Failed to create HTTP client")?;

    let selected = resolve(&backend, &config).await;
    let ctx = Arc::new(ClientContext::new(
        selected.clone().unwrap_or_else(|| fallback(&config)),
        config.page_size,
    ));
    ctx.set_resolution(selected);

    let cancel = CancellationToken::new();
    let monitor = Arc::new(LivenessMonitor::new(
        backend.clone(),
        Arc::clone(&ctx),
        config.heartbeat.clone(),
        Arc::new(ExitOnNavigate {
            cancel: cancel.clone(),
        }),
    ));
    let orchestrator = CrawlOrchestrator::new(
        backend,
        Arc::clone(&ctx),
        Arc::clone(&monitor),
        gate,
        config.crawl.clone(),
    );

    Ok(Client {
        config,
        ctx,
        monitor,
        orchestrator,
        cancel,
    })
}

/// Like [`connect`], but fails unless the backend passes its first probe.
pub async fn connect_online(args: &ConnectArgs, gate: CliGate) -> Result<Client> {
    let client = connect(args, gate).await?;
    if client.monitor.start().await == LivenessState::Offline {
        bail!(
            "Backend is not running at {}, start the backend service first",
            client.ctx.endpoint()
        );
    }
    Ok(client)
}

pub async fn resolve(backend: &ReqwestBackend, config: &ClientConfig) -> Option<Endpoint> {
    EndpointResolver::new(backend.clone(), config.resolver.clone())
        .resolve()
        .await
}

/// First candidate port, used when discovery finds nothing.
pub fn fallback(config: &ClientConfig) -> Endpoint {
    let port = config
        .resolver
        .candidates
        .first()
        .copied()
        .unwrap_or(bookscout_core::models::DEFAULT_PORT);
    Endpoint::new(config.resolver.host.clone(), port)
}
