//! JSON log lines: one JSON object per line (ndjson) for ingestion.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with JSON format (one JSON object per line)
pub struct StructuredLogger;

impl StructuredLogger {
    /// Install global subscriber on stderr, level from RUST_LOG or default.
    /// Stdout is left for the run summary.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry().with(filter).with(fmt).try_init();
        } else {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init();
        }
    }

    /// Emit a single structured line (e.g. the run summary) without going through tracing
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Line<'a> {
        kind: &'a str,
        rows: usize,
    }

    #[test]
    fn emits_one_object_per_line() {
        let mut buf = Vec::new();
        StructuredLogger::emit_json(&Line { kind: "run", rows: 3 }, &mut buf).unwrap();
        StructuredLogger::emit_json(&Line { kind: "run", rows: 4 }, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"kind":"run","rows":3}"#);
    }
}
