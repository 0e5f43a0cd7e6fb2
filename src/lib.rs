// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod reload;
pub mod sources;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{apply_env_overrides, load_with_fs, value_from_text, LoadOptions};
use crate::config::{validate, ConfigDocument, ConfigSource, Schema, ValidateOptions, ValidationReport};
use crate::fs::RealFileSystem;
use crate::reload::{ConfigWatcher, Snapshot};
use crate::sources::SourceJob;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, environment overlay, `--set` substitutions)
/// - validation and reporting
/// - per-source job resolution and input checks (`--mode`)
/// - hot reload (`--watch`)
pub async fn run(args: CliArgs) -> Result<()> {
    let schema = Schema::standard();
    let options = load_options(&args);

    if args.watch {
        return watch_config(&args.config, schema, options).await;
    }

    let doc = load_document(&args, &schema, &options)?;

    if args.dump {
        println!("{}", doc.to_json_pretty()?);
        return Ok(());
    }

    let report = validate(&schema, &doc, options.validate);
    print_report(&args.config, &report);

    if args.strict {
        report.into_result()?;
    }

    if let Some(source) = args.mode {
        let job = SourceJob::resolve(&schema, &doc, source)?;
        job.check_inputs(&RealFileSystem)?;
        print_job(&job);
    }

    Ok(())
}

fn load_options(args: &CliArgs) -> LoadOptions {
    LoadOptions {
        validate: ValidateOptions {
            strict: args.strict,
        },
        env_prefix: (!args.no_env).then(|| args.env_prefix.clone()),
    }
}

/// Load the file, then apply the environment overlay and `--set`
/// substitutions. Each step yields a new document.
fn load_document(args: &CliArgs, schema: &Schema, options: &LoadOptions) -> Result<ConfigDocument> {
    let source = ConfigSource::File(args.config.clone());
    let mut doc = load_with_fs(&source, schema, &RealFileSystem)?;

    if let Some(prefix) = &options.env_prefix {
        doc = apply_env_overrides(schema, &doc, prefix, std::env::vars())?;
    }

    for (key, raw) in &args.overrides {
        doc = doc.with_value(key, value_from_text(schema, key, raw))?;
        debug!(%key, "applied --set override");
    }

    Ok(doc)
}

async fn watch_config(path: &Path, schema: Schema, options: LoadOptions) -> Result<()> {
    let watcher = ConfigWatcher::spawn(path, schema, options)?;
    let mut rx = watcher.subscribe();

    let initial = rx.borrow_and_update().clone();
    print_snapshot(path, &initial);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_snapshot(path, &snapshot);
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                }
                info!("shutdown requested");
                break;
            }
        }
    }

    Ok(())
}

fn print_report(path: &Path, report: &ValidationReport) {
    println!("{}: {}", path.display(), report);

    let placeholders = report.unresolved_placeholders();
    if !placeholders.is_empty() {
        println!();
        println!("unresolved placeholders ({}):", placeholders.len());
        for key in placeholders {
            println!("  - {key}");
        }
    }
}

fn print_job(job: &SourceJob) {
    println!();
    println!("job {}", job.source);
    println!("  target: {}", job.connection.display_url());
    println!("  batch_size: {}", job.batch_size);
    println!("  inputs:");
    for input in &job.inputs {
        println!("    {}: {}", input.key, input.path.display());
    }
    debug!(files = job.input_files().len(), "all inputs present");
}

fn print_snapshot(path: &Path, snapshot: &Snapshot) {
    println!(
        "{}: generation {} accepted ({} keys, blake3 {})",
        path.display(),
        snapshot.generation,
        snapshot.document.len(),
        &snapshot.hash[..12.min(snapshot.hash.len())]
    );
}
