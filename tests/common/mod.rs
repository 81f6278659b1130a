//! Common test utilities with tracing setup.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ... test code emitting tracing::trace!, tracing::debug!, etc.
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: filter directives (e.g. `avlist=trace`)
//! - `AVLIST_LOG_DIR`: log directory (default: `logs/`)
//! - `AVLIST_LOG_CONSOLE`: set to "0" to disable console output
//!
//! Logs land in `logs/avlist.jsonl` as newline-delimited JSON; use `jq` to
//! pretty-print or filter.

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Initialize the tracing subscriber with file and console logging.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{default_level}")))
}

#[expect(clippy::expect_used, reason = "fail fast when the log sink is unusable")]
fn setup_tracing() {
    let log_dir: PathBuf =
        env::var("AVLIST_LOG_DIR").map_or_else(|_| PathBuf::from("logs"), PathBuf::from);
    let console_enabled: bool = !env::var("AVLIST_LOG_CONSOLE").is_ok_and(|v| v == "0");

    std::fs::create_dir_all(&log_dir).expect("failed to create log directory");
    let log_path = log_dir.join("avlist.jsonl");

    // Append mode: nextest runs tests in separate processes.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("failed to open log file");

    let console_layer = if console_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(true)
                .compact()
                .with_filter(make_filter(Level::INFO)),
        )
    } else {
        None
    };

    // One JSON object per line.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(make_filter(Level::INFO));

    // try_init instead of init: another harness may have installed one.
    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
