// src/main.rs
//! dbtrace log inspector
//!
//! Reads one or more trace logs and prints a JSON summary for each.
//!
//! ```text
//! dbtrace dbtrace.1718000000000000000.log [more.log ...]
//! ```

use anyhow::{bail, Context, Result};
use dbtrace::observability::init_tracing;
use dbtrace::recording::{LogReader, LogSummary};
use dbtrace::TraceConfig;
use serde_json::json;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = TraceConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: dbtrace <log-file>...");
    }

    info!("dbtrace v{} inspecting {} log(s)", dbtrace::VERSION, paths.len());

    for path in &paths {
        let records = LogReader::open(path)?
            .read_all()
            .with_context(|| format!("Failed to read {}", path))?;

        let summary = LogSummary::from_records(&records);
        if summary.abandoned > 0 {
            warn!("{}: {} operations never completed", path, summary.abandoned);
        }

        let report = json!({ "file": path, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
