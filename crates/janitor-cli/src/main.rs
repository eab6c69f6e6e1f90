mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use janitor_core::credentials::ProfileCredentials;
use janitor_core::drive::DriveClient;
use janitor_core::storage::models::RecommendationKind;
use janitor_core::storage::Database;
use janitor_core::{AppConfig, CleanupEngine};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match janitor_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Sync { owner }) => run_sync(&config, &owner),
        Some(Commands::Analyze { owner }) => run_analyze(&config, &owner),
        Some(Commands::Recommendations { owner, json }) => {
            run_recommendations(&config, &owner, json)
        }
        Some(Commands::Delete {
            owner,
            ids,
            bundle,
            yes,
        }) => run_delete(&config, &owner, ids, bundle.as_deref(), yes),
        Some(Commands::Stats { owner }) => run_stats(&config, &owner),
        Some(Commands::SetToken { owner, token }) => run_set_token(&config, &owner, &token),
        Some(Commands::ResetStuck {
            owner,
            older_than_minutes,
        }) => run_reset_stuck(&config, &owner, older_than_minutes),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        Some(Commands::TruncateDb) => run_truncate(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn open_engine(config: &AppConfig) -> anyhow::Result<CleanupEngine> {
    let remote = DriveClient::new(&config.drive).context("building drive client")?;
    let credentials = ProfileCredentials::open(&config.db_path)?;
    let engine = CleanupEngine::new(config.clone(), Arc::new(remote), Box::new(credentials))?;
    Ok(engine)
}

fn run_sync(config: &AppConfig, owner: &str) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let reporter = CliReporter::new();
    let result = engine.sync(owner, &reporter)?;

    // Waits for the queued analysis pass to finish.
    engine.shutdown();

    println!();
    info!(
        "Fetch: {}, Ingest: {}",
        format!("{:.2}s", result.fetch_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.ingest_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files synced for {}",
        format!("{}", result.files_processed).cyan(),
        owner,
    );
    Ok(())
}

fn run_analyze(config: &AppConfig, owner: &str) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let summary = engine.analyze_now(owner)?;
    info!(
        "{} files analyzed, {} recommendations",
        format!("{}", summary.files_analyzed).cyan(),
        format!("{}", summary.recommendations).red(),
    );
    Ok(())
}

fn run_recommendations(config: &AppConfig, owner: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let summary = engine.recommendations(owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.bundles.is_empty() {
        println!("No recommendations for {}", owner);
        return Ok(());
    }
    for bundle in &summary.bundles {
        println!(
            "{:<12} {:>6} files  {:>14} bytes  risk {}",
            bundle.kind.as_str().bold(),
            bundle.file_count,
            bundle.potential_savings_bytes,
            match bundle.risk_level.as_str() {
                "low" => "low".green(),
                "medium" => "medium".yellow(),
                other => other.red(),
            }
        );
    }
    println!(
        "{} files, {} bytes reclaimable",
        summary.total_files,
        format!("{}", summary.total_savings_bytes).red()
    );
    Ok(())
}

fn run_delete(
    config: &AppConfig,
    owner: &str,
    ids: Vec<i64>,
    bundle: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    let file_ids = match bundle {
        Some(kind) => {
            let kind: RecommendationKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            engine
                .recommendations(owner)?
                .bundle(kind)
                .map(|b| b.file_ids.clone())
                .unwrap_or_default()
        }
        None => ids,
    };
    if file_ids.is_empty() {
        bail!("No files found to delete");
    }

    if !yes {
        let prompt = format!("Delete {} files from the drive? This cannot be undone.", file_ids.len());
        if !prompt_confirm(&prompt, Some(false))? {
            return Ok(());
        }
    }

    let reporter = CliReporter::new();
    let report = engine.delete_files(owner, &file_ids, &reporter)?;
    if report.failed_count > 0 {
        println!("{}", report.message().yellow());
    } else {
        println!("{}", report.message().green());
    }
    Ok(())
}

fn run_stats(config: &AppConfig, owner: &str) -> anyhow::Result<()> {
    let db = Database::open(&config.db_path)?;
    let stats = db.storage_stats(owner)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_set_token(config: &AppConfig, owner: &str, token: &str) -> anyhow::Result<()> {
    let db = Database::open(&config.db_path)?;
    db.set_access_token(owner, token)?;
    println!("Token stored for {}", owner.cyan());
    Ok(())
}

fn run_reset_stuck(config: &AppConfig, owner: &str, older_than_minutes: u32) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let older_than = chrono::Duration::minutes(i64::from(older_than_minutes));
    let reset = engine.reset_stuck(owner, older_than)?;
    info!("{} files returned to pending", format!("{}", reset).cyan());
    Ok(())
}

fn run_truncate(config: &AppConfig) -> anyhow::Result<()> {
    if !prompt_confirm(
        "Are you SURE you want to COMPLETELY DELETE the Database?",
        Some(false),
    )? {
        return Ok(());
    }
    let db = Database::open(&config.db_path)?;
    db.truncate_all()?;
    println!("All tables truncated");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(db_path: &str) -> AppConfig {
        AppConfig {
            db_path: db_path.to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_set_token_stores_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("janitor.db");
        let config = config_at(path.to_str().unwrap());

        run_set_token(&config, "alice", "tok").unwrap();
        let db = Database::open(&config.db_path).unwrap();
        assert_eq!(db.get_access_token("alice").unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_set_token_reports_open_failure_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("janitor.db");
        let config = config_at(path.to_str().unwrap());

        assert!(run_set_token(&config, "alice", "tok").is_err());
    }
}
