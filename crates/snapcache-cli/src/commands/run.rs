//! Run command
//!
//! Wires the configured clients into the orchestrator and maps the outcome
//! onto the process exit contract.

use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use snapcache_core::logging::{self, Profile};
use snapcache_core::{Orchestrator, RunError, RunOptions, RunReport, SnapshotSink};
use snapcache_store::{FsSink, HttpRecordStore, HttpSink};

use crate::config::{Config, SinkConfig};

/// Exit code when a fatal stage aborted the run (nothing published)
const EXIT_RUN_FAILED: u8 = 1;
/// Exit code when the artifact published but reconciliation is incomplete
const EXIT_RECONCILE_INCOMPLETE: u8 = 2;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "snapcache.toml")]
    pub config: PathBuf,

    /// Read and encode only; skip publish and reconciliation
    #[arg(long)]
    pub dry_run: bool,

    /// Emit JSON logs instead of human-readable output
    #[arg(long)]
    pub json_logs: bool,
}

fn token_from_env(var: &Option<String>) -> Option<String> {
    var.as_deref().and_then(|name| match std::env::var(name) {
        Ok(token) => Some(token),
        Err(_) => {
            warn!(var = %name, "token environment variable not set; proceeding unauthenticated");
            None
        }
    })
}

/// Map a run outcome onto the process exit contract: 0 on full success,
/// 1 when a fatal stage aborted the run, 2 when the artifact published but
/// reconciliation left failures behind.
fn exit_for(outcome: &Result<RunReport, RunError>) -> u8 {
    match outcome {
        Ok(report) if report.is_clean() => 0,
        Ok(_) => EXIT_RECONCILE_INCOMPLETE,
        Err(_) => EXIT_RUN_FAILED,
    }
}

fn build_sink(config: &Config) -> Box<dyn SnapshotSink> {
    match &config.sink {
        SinkConfig::Http {
            base_url,
            bucket,
            token_env,
        } => Box::new(HttpSink::new(
            base_url.clone(),
            bucket.clone(),
            token_from_env(token_env),
        )),
        SinkConfig::Fs { root } => Box::new(FsSink::new(root.clone())),
    }
}

pub async fn execute(args: RunArgs) -> ExitCode {
    logging::init(if args.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "could not load configuration");
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    let records = HttpRecordStore::new(
        config.record_store.base_url.clone(),
        token_from_env(&config.record_store.token_env),
    );
    let sink = build_sink(&config);

    let options = RunOptions {
        collections: config.collections.clone(),
        object_name: config.object_name.clone(),
        as_attachment: config.as_attachment,
        policy: config.reconcile_policy(),
        concurrency: config.concurrency,
        read: config.read_options(),
        dry_run: args.dry_run,
    };

    let outcome = Orchestrator::new(&records, sink.as_ref(), options).run().await;
    match &outcome {
        Ok(report) if report.is_clean() => {
            info!(
                run_id = %report.run_id,
                kept = report.kept,
                retired = report.retired,
                artifact_bytes = report.artifact_bytes,
                published = report.published,
                "snapshot run succeeded"
            );
        }
        Ok(report) => {
            // Artifact is live; the failed pairs retry on the next run.
            let failed = report
                .reconcile
                .as_ref()
                .map(|r| r.failures.len())
                .unwrap_or(0);
            error!(
                run_id = %report.run_id,
                failed,
                "snapshot published but reconciliation is incomplete"
            );
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "snapshot run failed; nothing was published");
        }
    }
    ExitCode::from(exit_for(&outcome))
}
