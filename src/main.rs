//! depsniff - dependency confusion detector.
//!
//! CLI entry point.

use clap::Parser;
use colored::Colorize;
use depsniff::config::{CheckConfig, InitConfig, ScanTarget};
use depsniff::discovery::HttpFetcher;
use depsniff::notify::ConsoleOutput;
use depsniff::{
    Commands, Config, Configuration, FindingStore, HttpItem, ItemReport, RegistryChecker,
    RegistryVerdict, ScanConfig, ScanIssue, ScanOptions, Scanner,
};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("depsniff=debug,info")
    } else {
        EnvFilter::new("depsniff=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let run = async {
        match config.command.clone() {
            Commands::Scan(scan_config) => run_scan(scan_config, &config).await,
            Commands::Check(check_config) => run_check(check_config, &config).await,
            Commands::InitConfig(init_config) => run_init(init_config, &config),
        }
    };

    // Dropping the pipeline abandons in-flight registry queries.
    tokio::select! {
        result = run => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(code) => code,
        },
        _ = shutdown_signal() => {
            eprintln!("\nSignal received, abandoning in-flight checks...");
            ExitCode::from(130)
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                warn!("Failed to register signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn load_configuration(path: &Path) -> Result<Configuration, ExitCode> {
    Configuration::load(path).map_err(|e| {
        error!("Failed to load configuration {}: {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn build_checker(config: &Configuration, rate_limit: u32) -> Result<RegistryChecker, ExitCode> {
    RegistryChecker::from_config(config)
        .map(|checker| checker.with_rate_limit(rate_limit))
        .map_err(|e| {
            error!("Failed to create registry checker: {}", e);
            ExitCode::FAILURE
        })
}

async fn run_scan(scan_config: ScanConfig, global_config: &Config) -> Result<(), ExitCode> {
    let start_time = Instant::now();

    let targets = match scan_config.load_targets() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load targets: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    if targets.is_empty() {
        error!("No targets specified. Use positional arguments or -f <file>.");
        return Err(ExitCode::FAILURE);
    }

    let configuration = Arc::new(load_configuration(&global_config.config)?);
    let checker = build_checker(&configuration, scan_config.rate_limit)?;

    let fetcher = match HttpFetcher::new(scan_config.http_config(), scan_config.rate_limit) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create HTTP fetcher: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let console = ConsoleOutput::new(global_config.verbose, scan_config.json, scan_config.quiet);
    let parallel = scan_config.parallel.max(1);

    console.print_progress(&format!("Loading {} targets...", targets.len()));
    let items: Vec<HttpItem> = stream::iter(targets)
        .map(|target| load_item(&fetcher, target))
        .buffered(parallel)
        .filter_map(futures::future::ready)
        .collect()
        .await;

    console.print_info(&format!(
        "Inspecting {} items ({} distinct fetched bodies)",
        items.len(),
        fetcher.distinct_bodies().await
    ));

    let scanner = Scanner::new(
        configuration,
        checker,
        ScanOptions {
            parallel,
            skip_local: scan_config.skip_local,
            resolve_registry_links: scan_config.resolve_registry_links,
            ..ScanOptions::default()
        },
    );

    let pb = console.create_progress_bar(items.len() as u64, "Inspecting");
    let reports: Vec<ItemReport> = scanner
        .inspect_all_with(&items, |_| {
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        })
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let store = FindingStore::new();
    for report in &reports {
        console.print_report(report);
        store.extend(report.findings.iter().cloned());
    }

    let findings = store.findings();
    console.print_summary(reports.len(), &findings, start_time.elapsed().as_secs_f64());

    if scan_config.json || scan_config.output.is_some() {
        let json = if scan_config.issues {
            let issues: Vec<ScanIssue> = findings.iter().map(|f| f.to_issue()).collect();
            serde_json::to_string_pretty(&issues)
        } else {
            serde_json::to_string_pretty(&findings)
        }
        .unwrap_or_default();

        if let Some(ref output_path) = scan_config.output {
            if let Err(e) = fs::write(output_path, &json) {
                error!("Failed to write output file: {}", e);
                return Err(ExitCode::FAILURE);
            }
            if !scan_config.json {
                info!("Results written to: {:?}", output_path);
            }
        } else {
            println!("{}", json);
        }
    }

    let high_risk = store.high_risk_count();
    if high_risk > 0 && !scan_config.json {
        eprintln!("\n{} potentially confusable dependencies found!", high_risk);
    }

    Ok(())
}

async fn load_item(fetcher: &HttpFetcher, target: ScanTarget) -> Option<HttpItem> {
    match target {
        ScanTarget::Url(url) => fetcher.fetch_one(&url).await,
        ScanTarget::File(path) => match HttpItem::from_file(&path) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        },
    }
}

async fn run_check(check_config: CheckConfig, global_config: &Config) -> Result<(), ExitCode> {
    let configuration = load_configuration(&global_config.config)?;
    let checker = RegistryChecker::from_config(&configuration).map_err(|e| {
        error!("Failed to create registry checker: {}", e);
        ExitCode::FAILURE
    })?;

    let configuration = &configuration;
    let checker = &checker;
    let verdicts: BTreeMap<String, RegistryVerdict> = stream::iter(check_config.names)
        .map(|name| async move {
            let verdict = checker.check(&name, configuration).await;
            (name, verdict)
        })
        .buffer_unordered(16)
        .collect()
        .await;

    if check_config.json {
        println!("{}", serde_json::to_string_pretty(&verdicts).unwrap_or_default());
        return Ok(());
    }

    for (name, verdict) in &verdicts {
        let status = if verdict.registries.is_empty() {
            "no registry enabled (confusable)".yellow()
        } else if verdict.confusable {
            "NOT FOUND (confusable)".red().bold()
        } else {
            "exists".green()
        };
        println!("{} {}", name.bright_white(), status);
    }

    Ok(())
}

fn run_init(init_config: InitConfig, global_config: &Config) -> Result<(), ExitCode> {
    let path = &global_config.config;
    if path.exists() && !init_config.force {
        error!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
        return Err(ExitCode::FAILURE);
    }

    if let Err(e) = Configuration::default().save(path) {
        error!("Failed to write {}: {}", path.display(), e);
        return Err(ExitCode::FAILURE);
    }

    eprintln!("Wrote default configuration to {}", path.display());
    Ok(())
}
