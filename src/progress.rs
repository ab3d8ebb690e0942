//! Sync progress reporting.
//!
//! Reports observable progress during `vsync vectorise` so users see how many
//! files are left and when orphan cleanup starts. Progress is emitted on
//! **stderr** so stdout stays parseable; `--pipe` turns it off entirely.

use std::io::Write;

/// A single progress event for a sync pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncProgressEvent {
    /// Discovery finished with this many files to sync.
    Discovered { files: u64 },
    /// `n` of `total` per-file tasks have settled.
    Syncing { n: u64, total: u64 },
    /// All tasks settled; scanning the collection for orphans.
    Reconciling,
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the sync coordinator.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "vectorise  12 / 40 files".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Discovered { files } => {
                format!("vectorise  discovered {} files\n", format_number(*files))
            }
            SyncProgressEvent::Syncing { n, total } => format!(
                "vectorise  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            SyncProgressEvent::Reconciling => "vectorise  removing orphaned files...\n".to_string(),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Discovered { files } => serde_json::json!({
                "event": "progress",
                "phase": "discovered",
                "files": files
            }),
            SyncProgressEvent::Syncing { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "syncing",
                "n": n,
                "total": total
            }),
            SyncProgressEvent::Reconciling => serde_json::json!({
                "event": "progress",
                "phase": "reconciling"
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// `--pipe` disables progress; otherwise human progress when stderr is a
    /// TTY.
    pub fn for_cli(pipe: bool) -> Self {
        if pipe {
            ProgressMode::Off
        } else if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
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
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn pipe_turns_progress_off() {
        assert_eq!(ProgressMode::for_cli(true), ProgressMode::Off);
    }
}
