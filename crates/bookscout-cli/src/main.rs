mod host;
mod render;
mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookscout_client::ReqwestBackend;
use bookscout_core::{BookSource, CrawlJob, LivenessState, ResultSet};

use crate::host::{CliGate, ConnectArgs};

#[derive(Parser)]
#[command(name = "bookscout", version, about = "Terminal client for the book scraping backend")]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find which candidate port the backend is listening on
    Resolve,

    /// Crawl books for a keyword and show the stored results
    Crawl {
        /// Search keyword
        #[arg(short, long)]
        keyword: String,

        /// Maximum books to crawl (0 = no limit, capped at 500)
        #[arg(short, long, default_value_t = 20, allow_negative_numbers = true)]
        limit: i64,

        /// Proxy for the backend's scraper (e.g. "socks5://127.0.0.1:1080")
        #[arg(long, env = "BOOKSCOUT_PROXY")]
        proxy: Option<String>,

        /// Site to crawl: dangdang or fanqie
        #[arg(short, long, default_value = "dangdang")]
        source: BookSource,

        /// Skip the confirmation for unbounded crawls
        #[arg(short, long, default_value_t = false)]
        yes: bool,

        /// Page of results to print
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Print the books as JSON instead of a page of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show books already in the store
    List {
        /// Only books crawled for this keyword
        #[arg(short, long)]
        keyword: Option<String>,

        /// Store to read: dangdang or fanqie
        #[arg(short, long, default_value = "dangdang")]
        source: BookSource,

        /// Page of results to print
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Print the books as JSON instead of a page of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show store totals
    Stats,

    /// Run the liveness heartbeat and log state changes until interrupted
    Watch {
        /// Load stored books for this keyword first, so the heartbeat has
        /// something to protect
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Interactive session with a live heartbeat
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bookscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve => cmd_resolve(&cli.connect).await?,
        Commands::Crawl {
            keyword,
            limit,
            proxy,
            source,
            yes,
            page,
            json,
        } => {
            let gate = if yes {
                CliGate::AssumeYes
            } else {
                CliGate::Stdin
            };
            let mut job = CrawlJob::new(keyword, limit).with_source(source);
            if let Some(proxy) = proxy {
                job = job.with_proxy(proxy);
            }
            cmd_crawl(&cli.connect, gate, job, page, json).await?;
        }
        Commands::List {
            keyword,
            source,
            page,
            json,
        } => cmd_list(&cli.connect, source, keyword.as_deref(), page, json).await?,
        Commands::Stats => cmd_stats(&cli.connect).await?,
        Commands::Watch { keyword } => cmd_watch(&cli.connect, keyword.as_deref()).await?,
        Commands::Session => {
            let client = host::connect(&cli.connect, CliGate::session()).await?;
            session::run(client).await?;
        }
    }

    Ok(())
}

async fn cmd_resolve(args: &ConnectArgs) -> Result<()> {
    let config = args.to_config()?;
    let backend = ReqwestBackend::new().context("Failed to create HTTP client")?;

    match host::resolve(&backend, &config).await {
        Some(endpoint) => println!("{}", endpoint.base_url()),
        None => {
            let fallback = host::fallback(&config);
            println!(
                "No backend answered on ports {:?}; falling back to {}",
                config.resolver.candidates,
                fallback.base_url()
            );
        }
    }
    Ok(())
}

async fn cmd_crawl(
    args: &ConnectArgs,
    gate: CliGate,
    job: CrawlJob,
    page: usize,
    json: bool,
) -> Result<()> {
    let client = host::connect_online(args, gate).await?;
    let keyword = job.keyword.trim().to_string();

    tracing::info!(
        endpoint = %client.ctx.endpoint(),
        keyword = %keyword,
        source = %job.source,
        "Crawling, this can take a few minutes"
    );

    let results = client
        .orchestrator
        .submit(job)
        .await
        .with_context(|| format!("Crawl for '{keyword}' failed"))?;

    print_results(&client, &results, page, json)
}

async fn cmd_list(
    args: &ConnectArgs,
    source: BookSource,
    keyword: Option<&str>,
    page: usize,
    json: bool,
) -> Result<()> {
    let client = host::connect_online(args, CliGate::AssumeYes).await?;

    let results = client
        .orchestrator
        .list(source, keyword)
        .await
        .with_context(|| format!("Failed to list stored {source} books"))?;

    print_results(&client, &results, page, json)
}

async fn cmd_stats(args: &ConnectArgs) -> Result<()> {
    let client = host::connect_online(args, CliGate::AssumeYes).await?;

    let stats = client
        .orchestrator
        .stats()
        .await
        .context("Failed to read store stats")?;

    print!("{}", render::stats(&stats));
    Ok(())
}

async fn cmd_watch(args: &ConnectArgs, keyword: Option<&str>) -> Result<()> {
    let client = host::connect(args, CliGate::AssumeYes).await?;

    if client.monitor.start().await == LivenessState::Offline {
        print!("{}", render::view(&client.ctx.snapshot()));
        client.cancel.cancelled().await;
        anyhow::bail!("Backend is not running at {}", client.ctx.endpoint());
    }

    if let Some(keyword) = keyword {
        let results = client
            .orchestrator
            .list(BookSource::default(), Some(keyword))
            .await?;
        tracing::info!(keyword, count = results.len(), "Watching with stored books on screen");
    }

    let monitor = Arc::clone(&client.monitor);
    let token = client.cancel.child_token();
    let heartbeat = tokio::spawn(async move { monitor.run(token).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
        () = client.cancel.cancelled() => {
            print!("{}", render::view(&client.ctx.snapshot()));
        }
    }
    client.cancel.cancel();
    heartbeat.await.context("Heartbeat task panicked")?;

    let stats = client.monitor.stats();
    tracing::info!(
        probes = stats.probes,
        skipped = stats.skipped,
        outages = stats.outages,
        recoveries = stats.recoveries,
        "Heartbeat summary"
    );
    Ok(())
}

fn print_results(
    client: &host::Client,
    results: &ResultSet,
    page: usize,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&results.books)?);
        return Ok(());
    }

    if page > 1 && !client.ctx.view().go_to_page(page) {
        tracing::warn!(
            page,
            pages = client.ctx.view().total_pages(),
            "Page out of range, showing page 1"
        );
    }
    print!("{}", render::view(&client.ctx.snapshot()));
    tracing::debug!(
        page_size = client.config.page_size,
        resolved = client.ctx.is_resolved(),
        "Rendered results"
    );
    Ok(())
}
