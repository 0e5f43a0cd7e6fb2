#![allow(dead_code)]

use std::io::Write;

use tempfile::{Builder, NamedTempFile};

pub use ingest_config_test_utils::{init_tracing, template_path, wait_for_generation, write_config};

/// Write `contents` to a temp file with the given extension (".json", ".toml").
pub fn temp_config(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file.flush().expect("flush temp config");
    file
}
