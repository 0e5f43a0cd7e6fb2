// src/reload.rs

//! Hot reload of the configuration file.
//!
//! Readers hold a `watch::Receiver` and always see a complete, validated
//! snapshot. A reload builds a new document and swaps the `Arc` in one
//! step; nothing is ever mutated in place. A reload that fails to parse or
//! validate is logged and the previous snapshot stays current.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use blake3::Hasher;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::loader::{finalize, parse_str, Format, LoadOptions};
use crate::config::{ConfigDocument, Schema};
use crate::errors::{ConfigError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// One published version of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub document: Arc<ConfigDocument>,
    /// blake3 hex digest of the file contents.
    pub hash: String,
    /// Starts at 0 for the initial load.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Contents hash to the current snapshot; nothing published.
    Unchanged,
    Published { generation: u64 },
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Loads the file and publishes snapshots. Independent of `notify`, so it
/// can be driven directly.
pub struct Reloader {
    path: PathBuf,
    schema: Schema,
    options: LoadOptions,
    fs: Arc<dyn FileSystem>,
    tx: watch::Sender<Arc<Snapshot>>,
}

impl std::fmt::Debug for Reloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reloader")
            .field("path", &self.path)
            .field("generation", &self.tx.borrow().generation)
            .finish()
    }
}

impl Reloader {
    /// Perform the initial load. Unlike later reloads, a failure here is
    /// returned to the caller.
    pub fn new(
        path: impl Into<PathBuf>,
        schema: Schema,
        options: LoadOptions,
        fs: Arc<dyn FileSystem>,
    ) -> Result<(Self, watch::Receiver<Arc<Snapshot>>)> {
        let path = path.into();
        let (document, hash) = read_document(&path, &schema, &options, fs.as_ref())?;
        let initial = Arc::new(Snapshot {
            document: Arc::new(document),
            hash,
            generation: 0,
        });
        let (tx, rx) = watch::channel(initial);
        info!(path = ?path, "initial configuration snapshot published");
        Ok((
            Self {
                path,
                schema,
                options,
                fs,
                tx,
            },
            rx,
        ))
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Re-read the file and publish it if it changed and is valid.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let current = self.current();
        let bytes = self.fs.read(&self.path)?;
        let hash = content_hash(&bytes);
        if hash == current.hash {
            debug!(path = ?self.path, "config contents unchanged");
            return Ok(ReloadOutcome::Unchanged);
        }

        let document = parse_bytes(&self.path, &bytes, &self.schema, &self.options)?;
        let generation = current.generation + 1;
        self.tx.send_replace(Arc::new(Snapshot {
            document: Arc::new(document),
            hash,
            generation,
        }));
        info!(path = ?self.path, generation, "configuration reloaded");
        Ok(ReloadOutcome::Published { generation })
    }
}

fn read_document(
    path: &Path,
    schema: &Schema,
    options: &LoadOptions,
    fs: &dyn FileSystem,
) -> Result<(ConfigDocument, String)> {
    let bytes = fs.read(path)?;
    let hash = content_hash(&bytes);
    let doc = parse_bytes(path, &bytes, schema, options)?;
    Ok((doc, hash))
}

fn parse_bytes(
    path: &Path,
    bytes: &[u8],
    schema: &Schema,
    options: &LoadOptions,
) -> Result<ConfigDocument> {
    let origin = path.display().to_string();
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ConfigError::malformed(&origin, format!("not valid UTF-8: {e}")))?;
    let doc = parse_str(text, Format::from_path(path), &origin)?;
    finalize(schema, doc, options, std::env::vars())
}

/// Keeps the `notify` watcher alive; dropping it stops reloading.
pub struct ConfigWatcher {
    _inner: RecommendedWatcher,
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").finish()
    }
}

impl ConfigWatcher {
    /// Load `path` and start watching it. Must be called inside a tokio
    /// runtime.
    pub fn spawn(path: impl Into<PathBuf>, schema: Schema, options: LoadOptions) -> Result<Self> {
        let path = path.into();
        let (reloader, rx) = Reloader::new(&path, schema, options, Arc::new(RealFileSystem))?;

        // Editors often replace the file instead of writing it, so watch
        // the directory and filter on the file name.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .with_context(|| format!("config path {:?} has no file name", path))?;

        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        eprintln!("ingest-config: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("ingest-config: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .context("creating config file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {:?}", dir))?;

        info!("config watcher started on {:?}", path);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if matches!(event.kind, EventKind::Access(_)) {
                    continue;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if !touches_config {
                    continue;
                }
                debug!(?event, "config file event");

                match reloader.reload() {
                    Ok(ReloadOutcome::Unchanged) => {}
                    Ok(ReloadOutcome::Published { .. }) => {}
                    Err(err) => {
                        warn!(error = %err, "config reload rejected; keeping previous snapshot")
                    }
                }
            }
            debug!("config watcher event loop finished");
        });

        Ok(Self { _inner: watcher, rx })
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.rx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.rx.clone()
    }
}
