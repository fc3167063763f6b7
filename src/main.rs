// Domain prober CLI
//
// Reads one domain per line, probes them with a headless Chromium and prints
// one JSON object per finished domain to stdout as results arrive. Logs go to
// stderr; set RUST_LOG to adjust verbosity.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use domain_probe::probe_engine::cleanup::{self, CleanupResult};
use domain_probe::{ChannelProgress, ChromiumDriver, Domain, DomainTask, ProbeConfig, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "domain-probe")]
#[command(about = "Classify domains as active, dead, redirecting or inconclusive", long_about = None)]
struct Cli {
    /// File with one domain per line, or `-` for stdin
    input: PathBuf,

    /// Number of domains probed concurrently
    #[arg(short, long, default_value_t = domain_probe::utils::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-navigation timeout in milliseconds
    #[arg(long, default_value_t = domain_probe::utils::DEFAULT_NAVIGATION_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Maximum navigations started per second
    #[arg(long, default_value_t = domain_probe::utils::DEFAULT_MAX_REQUESTS_PER_INTERVAL)]
    rate_limit: u32,

    /// Never fall back to plain HTTP
    #[arg(long)]
    https_only: bool,

    /// Treat redirects within the same base domain as active
    #[arg(long)]
    ignore_similar_redirects: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(2);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let input = if cli.input.as_os_str() == "-" {
        read_domain_source(tokio::io::stdin())
            .await
            .context("Failed to read domains from stdin")?
    } else {
        tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read {}", cli.input.display()))?
    };

    let tasks = parse_domain_list(&input);
    if tasks.is_empty() {
        warn!("No valid domains in input");
        return Ok(());
    }

    // Force-abort sits well past the navigation timeout
    let config = ProbeConfig::builder()
        .concurrency(cli.concurrency)
        .navigation_timeout_ms(cli.timeout_ms)
        .force_abort_timeout_ms(cli.timeout_ms.saturating_add(cli.timeout_ms / 2))
        .rate_limit(cli.rate_limit, 1000)
        .https_only(cli.https_only)
        .ignore_similar_redirects(cli.ignore_similar_redirects)
        .headless(!cli.headed)
        .build()?;

    let driver = Arc::new(ChromiumDriver::launch(config.headless()).await?);
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&driver), config)?);

    let interrupt_target = Arc::clone(&scheduler);
    let interrupt_listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, closing browser pages");
            interrupt_target.interrupt();
        }
    });

    let (progress, mut reports_rx) = ChannelProgress::new();
    let printer = tokio::spawn(async move {
        while let Some(report) = reports_rx.recv().await {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to serialize report for {}: {e}", report.domain),
            }
        }
    });

    info!("Probing {} domains", tasks.len());
    let reports = scheduler.run(tasks, progress).await;
    interrupt_listener.abort();

    if let CleanupResult::PartialFailure(errors) = cleanup::shutdown_driver(driver.as_ref()).await {
        warn!("Browser shutdown incomplete: {errors:?}");
    }
    if let Err(e) = printer.await {
        warn!("Report printer failed: {e}");
    }

    let count = |label: &str| {
        reports
            .iter()
            .filter(|report| report.outcome.label() == label)
            .count()
    };
    info!(
        "Done: {} active, {} dead, {} redirect, {} inconclusive",
        count("active"),
        count("dead"),
        count("redirect"),
        count("inconclusive")
    );

    Ok(())
}

async fn read_domain_source<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
    let mut input = String::new();
    reader.read_to_string(&mut input).await?;
    Ok(input)
}

/// One task per distinct valid domain; comments and blanks are skipped
fn parse_domain_list(input: &str) -> Vec<DomainTask> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        match Domain::parse(line) {
            Ok(domain) => {
                if seen.insert(domain.clone()) {
                    tasks.push(DomainTask::new(domain));
                }
            }
            Err(e) => warn!("Skipping '{line}': {e}"),
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_domain_list_read_from_async_source() {
        let source: &[u8] = b"! filter list header\nexample.com\n\n# comment\nExample.com.\nnot a domain\nads.tracker.net\n";
        let input = read_domain_source(source).await.expect("in-memory read");

        let domains: Vec<String> = parse_domain_list(&input)
            .iter()
            .map(|task| task.original.to_string())
            .collect();
        assert_eq!(domains, vec!["example.com", "ads.tracker.net"]);
    }
}
