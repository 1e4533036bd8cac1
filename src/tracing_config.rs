//! Tracing configuration for debugging resolutions.
//!
//! Supports three output formats controlled by `CABINET_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event, machine-readable
//!
//! ## Quick start
//!
//! ```bash
//! # Why did this specifier not resolve?
//! CABINET_LOG=debug cabinet --filename src/app.ts ./missing
//!
//! # Every probe the TypeScript engine made
//! CABINET_LOG="cabinet::typescript=trace" CABINET_LOG_FORMAT=tree cabinet --filename src/app.ts lodash
//!
//! # JSON for tooling
//! CABINET_LOG=debug CABINET_LOG_FORMAT=json cabinet --filename src/app.js ./util
//! ```
//!
//! The subscriber is only initialised when `CABINET_LOG` (or `RUST_LOG`) is
//! set, so there is zero overhead in normal runs.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a `CABINET_LOG_FORMAT` value. Unknown values are text.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("CABINET_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `CABINET_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("CABINET_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        // RUST_LOG is set (caller already checked).
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `CABINET_LOG` nor `RUST_LOG` is set. All output
/// goes to stderr so it never mixes with resolved paths on stdout.
pub fn init_tracing() {
    let has_cabinet_log = std::env::var("CABINET_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_cabinet_log && !has_rust_log {
        return;
    }

    let filter = build_filter();

    match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true);

            Registry::default().with(filter).with(tree_layer).init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);

            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
