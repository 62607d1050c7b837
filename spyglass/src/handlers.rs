use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use spyglass_core::config::{
    DEFAULT_CONFIG_PATH, DEFAULT_REPORTS_DIR, GateConfig, SecurityConfig, expand_path,
};
use spyglass_core::coverage::{
    CoverageSummary, DEFAULT_CATALOG_PATH, coverage_summary, load_catalog, write_coverage,
};
use spyglass_core::gate::{build_aggregate, write_aggregate};
use spyglass_core::report::{
    DEFAULT_REPORT_PATH, SeverityCounts, generate_report, generate_text_report,
};
use spyglass_core::runner::{ExecutionStatus, Stage, run_stage};
use spyglass_core::scan::{ScanOptions, discover_targets, probe_targets};
use spyglass_core::security::ProbeSettings;
use spyglass_scanner::{Fetcher, HttpFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use url::Url;

/// Accepts bare hosts like `example.com` and upgrades them to `https://example.com`.
pub fn normalize_target_url(target: &str) -> String {
    let target = target.trim();
    match Url::parse(target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => target.to_string(),
        _ if target.contains("://") => target.to_string(),
        _ => format!("https://{}", target),
    }
}

pub fn verbosity_level(count: u8) -> Level {
    match count {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Subcommands whose stdout is a JSON document.
const JSON_SUBCOMMANDS: &[&str] = &["gate", "coverage"];

/// The banner goes to stdout, so it is skipped when stdout carries JSON.
pub fn shows_banner(subcommand: Option<&str>, quiet: bool) -> bool {
    !quiet && !subcommand.is_some_and(|name| JSON_SUBCOMMANDS.contains(&name))
}

/// Logs go to stderr so JSON printed on stdout stays machine readable.
pub fn init_logging(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(verbosity_level(verbosity))
        .with_target(false)
        .try_init();
}

/// Combines command-line gate flags with the configured policy; either can enable a rule.
pub fn effective_gate_policy(
    configured: GateConfig,
    fail_on_high: bool,
    fail_on_critical: bool,
) -> GateConfig {
    GateConfig {
        fail_on_high: fail_on_high || configured.fail_on_high,
        fail_on_critical: fail_on_critical || configured.fail_on_critical,
    }
}

pub fn coverage_exit_code(summary: &CoverageSummary, require_full: bool) -> i32 {
    if require_full && summary.has_gap() { 1 } else { 0 }
}

pub fn format_severity_summary(counts: &SeverityCounts) -> String {
    format!(
        "high={} medium={} low={}",
        counts.high.to_string().red().bold(),
        counts.medium.to_string().yellow().bold(),
        counts.low.to_string().cyan()
    )
}

fn path_arg(args: &ArgMatches, name: &str, default: &str) -> PathBuf {
    expand_path(
        args.get_one::<String>(name)
            .map(String::as_str)
            .unwrap_or(default),
    )
}

fn step(n: usize) -> String {
    format!("[{}/5]", n).bright_blue().bold().to_string()
}

pub async fn handle_scan(args: &ArgMatches) -> Result<i32> {
    let raw_target = args
        .get_one::<String>("URL")
        .context("A target URL is required")?;
    let target = normalize_target_url(raw_target);
    let output = path_arg(args, "output", DEFAULT_REPORT_PATH);
    let details = args.get_flag("details");

    let defaults = ScanOptions::new(target.as_str());
    let options = ScanOptions {
        max_depth: args.get_one::<usize>("depth").copied().unwrap_or(defaults.max_depth),
        workers: args.get_one::<usize>("threads").copied().unwrap_or(defaults.workers),
        timeout_secs: args
            .get_one::<u64>("timeout")
            .copied()
            .unwrap_or(defaults.timeout_secs),
        probe: ProbeSettings {
            burst_requests: args
                .get_one::<usize>("burst")
                .copied()
                .unwrap_or(defaults.probe.burst_requests),
        },
        show_progress: !args.get_flag("quiet"),
        ..defaults
    };

    let fetcher: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::with_timeout(options.timeout_secs).context("Failed to build HTTP client")?,
    );

    println!("{} Crawling target: {}", step(1), target);
    println!(
        "      depth {}, {} workers, {}s timeout",
        options.max_depth, options.workers, options.timeout_secs
    );
    let surface = discover_targets(fetcher.clone(), &options)
        .await
        .with_context(|| format!("Crawl of {} failed", target))?;

    println!("{} Discovery complete", step(2));
    println!("  {}", surface.summary_line());

    println!("{} Running security tests", step(3));
    let issues = probe_targets(fetcher, &surface, &options).await;

    println!("{} Saving report", step(4));
    let report = generate_report(&target, issues, &output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("{} Summary", step(5));
    println!("  {}", format_severity_summary(&report.summary));
    println!("  report={}", output.display());

    if details {
        println!();
        print!("{}", generate_text_report(&report));
    }

    // Findings are the output, not a failure
    Ok(0)
}

pub fn handle_gate(args: &ArgMatches) -> Result<i32> {
    let config_path = path_arg(args, "config", DEFAULT_CONFIG_PATH);
    let reports_dir = path_arg(args, "reports-dir", DEFAULT_REPORTS_DIR);

    let config = SecurityConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let policy = effective_gate_policy(
        config.gates,
        args.get_flag("fail-on-high"),
        args.get_flag("fail-on-critical"),
    );

    let aggregate = build_aggregate(&reports_dir, policy)?;
    write_aggregate(&aggregate, &reports_dir)?;
    println!("{}", serde_json::to_string_pretty(&aggregate)?);

    if aggregate.gate.passed {
        eprintln!("{} {}", "✓".green().bold(), aggregate.gate.reason);
        Ok(0)
    } else {
        eprintln!("{} {}", "✗".red().bold(), aggregate.gate.reason);
        Ok(1)
    }
}

pub fn handle_coverage(args: &ArgMatches) -> Result<i32> {
    let catalog_path = path_arg(args, "catalog", DEFAULT_CATALOG_PATH);
    let reports_dir = path_arg(args, "reports-dir", DEFAULT_REPORTS_DIR);

    let catalog = load_catalog(&catalog_path)
        .with_context(|| format!("Failed to load test catalog {}", catalog_path.display()))?;
    let summary = coverage_summary(&catalog);
    write_coverage(&summary, &reports_dir)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(coverage_exit_code(&summary, args.get_flag("require-full")))
}

pub async fn handle_run(args: &ArgMatches) -> Result<i32> {
    let stage: Stage = args
        .get_one::<String>("STAGE")
        .context("A stage name is required")?
        .parse()?;
    let config_path = path_arg(args, "config", DEFAULT_CONFIG_PATH);
    let reports_dir = path_arg(args, "reports-dir", DEFAULT_REPORTS_DIR);
    let workdir = path_arg(args, "workdir", ".");

    let config = SecurityConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let (report, path) = run_stage(stage, &config, &workdir, &reports_dir).await?;

    for entry in &report.execution {
        let command = entry.command.as_deref().unwrap_or("-");
        match entry.status {
            ExecutionStatus::Passed => println!("{} {}", "✓".green().bold(), command),
            ExecutionStatus::Failed => println!("{} {}", "✗".red().bold(), command),
            ExecutionStatus::Warning | ExecutionStatus::Unknown => println!(
                "{} {} ({})",
                "!".yellow().bold(),
                command,
                entry.message.as_deref().unwrap_or("no details")
            ),
        }
    }
    println!("wrote {}", path.display());

    Ok(0)
}
