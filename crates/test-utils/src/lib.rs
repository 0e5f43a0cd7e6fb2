//! Shared fixtures for `ingest-config` tests.

pub mod builders;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ingest_config::config::{ConfigDocument, Format};
use ingest_config::logging::LOG_ENV_VAR;
use ingest_config::reload::Snapshot;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// How long a test waits for the file watcher before giving up.
pub const WATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests, filtered by `INGEST_CONFIG_LOG`
/// (default `info`). Output is captured per test and only shown for
/// failures unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// The shipped template, `demos/config_proto.json`.
pub fn template_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/config_proto.json")
}

/// Write `doc` to `dir/name`, as TOML or JSON depending on the extension.
pub fn write_config(dir: &Path, name: &str, doc: &ConfigDocument) -> Result<PathBuf> {
    let path = dir.join(name);
    let text = match Format::from_path(&path) {
        Format::Toml => doc.to_toml_string()?,
        Format::Json => doc.to_json_pretty()?,
    };
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Wait until the watcher publishes a snapshot with exactly `generation`.
///
/// Fails if it skips past it or nothing arrives within [`WATCH_TIMEOUT`].
pub async fn wait_for_generation(
    rx: &mut watch::Receiver<Arc<Snapshot>>,
    generation: u64,
) -> Result<Arc<Snapshot>> {
    let wait = async {
        loop {
            let snapshot = Arc::clone(&rx.borrow_and_update());
            if snapshot.generation == generation {
                return Ok(snapshot);
            }
            if snapshot.generation > generation {
                bail!(
                    "expected generation {generation}, watcher already at {}",
                    snapshot.generation
                );
            }
            rx.changed().await.context("watcher channel closed")?;
        }
    };
    tokio::time::timeout(WATCH_TIMEOUT, wait)
        .await
        .with_context(|| format!("no generation {generation} within {WATCH_TIMEOUT:?}"))?
}
