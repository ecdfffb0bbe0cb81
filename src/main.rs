use anyhow::Context;
use chrono::Utc;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod actions;
mod cli;
mod config;
mod error;
mod paths;
mod pipeline;
mod stamp;
mod util;

use actions::StageRunner;
use cli::RootArgs;
use config::{resolve_config, validate_run_id, DriverConfig, Overrides};
use error::{DriverError, EXIT_USAGE};
use pipeline::{dispatch, Dispatch, PipelineRun, StageRequest};
use stamp::{write_stamp, HandoffStamp};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args = match RootArgs::try_parse() {
        Ok(args) => args,
        Err(err) => return clap_exit(&err),
    };
    init_tracing(args.verbose);

    let (request, config) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("error: {err}");
            return err.exit_code();
        }
    };

    if args.plan {
        return print_plan(request, &config);
    }

    let run = PipelineRun::new(request, config.run_id.clone());
    tracing::info!(
        requested = %request,
        run_id = %run.run_id,
        root = %config.paths.root().display(),
        "run start"
    );
    let mut runner = StageRunner::new(&config);
    let Dispatch { run, abort } = dispatch(run, &config.paths, &mut runner);

    let stamp = HandoffStamp::capture(&run, &config.paths, Utc::now());
    let stamped = write_stamp(&config.paths, &stamp)
        .map(|()| stamp)
        .map_err(DriverError::Stamp);
    let stamp_error = match stamped {
        Ok(stamp) => {
            if args.json {
                match serde_json::to_string_pretty(&stamp) {
                    Ok(text) => println!("{text}"),
                    Err(err) => tracing::warn!(error = %err, "serialize stamp for stdout"),
                }
            }
            None
        }
        Err(err) => {
            eprintln!("[fail] {err}");
            Some(err)
        }
    };

    let status = run.status();
    match (abort, stamp_error) {
        (Some(err), _) => {
            // Stage errors were already announced by the dispatcher.
            if err.stage().is_none() {
                eprintln!("[fail] {err}");
            }
            tracing::error!(error = %err, status = ?status, "run aborted");
            err.exit_code()
        }
        (None, Some(err)) => err.exit_code(),
        (None, None) => {
            tracing::info!(status = ?status, "run finished");
            0
        }
    }
}

/// Validate everything that must be right before any filesystem side effect.
fn prepare(args: &RootArgs) -> Result<(StageRequest, DriverConfig), DriverError> {
    let request = StageRequest::parse(&args.stage)?;
    if let Some(run_id) = &args.run_id {
        validate_run_id(run_id)?;
    }
    let root = match &args.root {
        Some(root) => Some(pipeline_root(root)?),
        None => None,
    };
    let overrides = Overrides {
        root,
        run_id: args.run_id.clone(),
        provider: args.provider.clone(),
        max_results: args.max_results,
        workers: args.workers,
        verbose: args.verbose,
    };
    let config = resolve_config(&overrides, &|key: &str| std::env::var(key).ok())
        .map_err(DriverError::Config)?;
    Ok((request, config))
}

fn pipeline_root(path: &Path) -> Result<PathBuf, DriverError> {
    path.canonicalize()
        .with_context(|| format!("resolve pipeline root {}", path.display()))
        .map_err(|err| DriverError::Usage(format!("{err:#}")))
}

fn print_plan(request: StageRequest, config: &DriverConfig) -> i32 {
    let plan = pipeline::plan(request, &config.paths);
    match serde_json::to_string_pretty(&plan) {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(err) => {
            eprintln!("error: serialize plan: {err}");
            1
        }
    }
}

/// Help and version exit 0; every other parse failure is a usage error.
fn clap_exit(err: &clap::Error) -> i32 {
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_USAGE,
    }
}

/// `DRIVER_LOG` sets the filter; `DRIVER_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("DRIVER_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var("DRIVER_LOG_FORMAT").is_ok_and(|format| format == "json");
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
