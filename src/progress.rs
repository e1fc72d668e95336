//! Import progress reporting.
//!
//! Progress goes to **stderr** so stdout stays parseable for scripts.
//! The collection is paged lazily, so the total may be unknown until the
//! API reports it.

use std::io::Write;

/// A single progress event for an import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportProgressEvent {
    /// Waiting for the user to finish authorization.
    Authorizing { source: String },
    /// Listing the collection; no item processed yet.
    Listing { source: String },
    /// `n` items mapped so far, out of `total` when known.
    Importing {
        source: String,
        n: u64,
        total: Option<u64>,
    },
}

/// Reports import progress.
pub trait ImportProgressReporter: Send + Sync {
    fn report(&self, event: ImportProgressEvent);
}

/// Human-friendly progress on stderr: "import numista  importing  12 / 340 items".
pub struct StderrProgress;

impl ImportProgressReporter for StderrProgress {
    fn report(&self, event: ImportProgressEvent) {
        let line = match &event {
            ImportProgressEvent::Authorizing { source } => {
                format!("import {}  waiting for authorization...\n", source)
            }
            ImportProgressEvent::Listing { source } => {
                format!("import {}  listing collection...\n", source)
            }
            ImportProgressEvent::Importing { source, n, total } => match total {
                Some(total) => format!(
                    "import {}  importing  {} / {} items\n",
                    source,
                    format_number(*n),
                    format_number(*total)
                ),
                None => format!(
                    "import {}  importing  {} items\n",
                    source,
                    format_number(*n)
                ),
            },
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ImportProgressReporter for JsonProgress {
    fn report(&self, event: ImportProgressEvent) {
        let obj = match &event {
            ImportProgressEvent::Authorizing { source } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "authorizing"
            }),
            ImportProgressEvent::Listing { source } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "listing"
            }),
            ImportProgressEvent::Importing { source, n, total } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "importing",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ImportProgressReporter for NoProgress {
    fn report(&self, _event: ImportProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ImportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn off_mode_reports_nothing() {
        let reporter = ProgressMode::Off.reporter();
        reporter.report(ImportProgressEvent::Listing {
            source: "numista".into(),
        });
    }
}
