//! Sentinel Audit Binary
//!
//! Reads one JSON audit request and prints the JSON verdict:
//! - Structured JSON logging on stderr (stdout carries only the verdict)
//! - Thresholds overridable from the environment
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SENTINEL_*`: threshold overrides (see `AuditThresholds::from_env`)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin sentinel_audit -- request.json
//! cat request.json | cargo run --bin sentinel_audit
//! ```

use std::io::Read;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use contagion_sentinel::{AuditThresholds, Auditor, PolicyBank};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentinel_audit=info,contagion_sentinel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    }
}

fn read_request(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) if path != "-" => std::fs::read_to_string(path),
        _ => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let thresholds = AuditThresholds::from_env();
    let bank = PolicyBank::global();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        policy_count = bank.len(),
        bank_fingerprint = %bank.fingerprint(),
        thresholds_fingerprint = %thresholds.fingerprint(),
        "Sentinel audit starting"
    );

    let path = std::env::args().nth(1);
    let input = match read_request(path.as_deref()) {
        Ok(input) => input,
        Err(e) => {
            error!(error = %e, "Failed to read audit request");
            return ExitCode::from(2);
        }
    };

    let verdict = match Auditor::new(bank, thresholds).audit_json(&input) {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(error = %e, "Rejected malformed audit request");
            return ExitCode::from(2);
        }
    };

    match serde_json::to_string_pretty(&verdict) {
        Ok(json) => {
            println!("{}", json);
            if verdict.status.is_rejection() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize verdict");
            ExitCode::from(2)
        }
    }
}
