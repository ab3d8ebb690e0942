//! End-of-pass statistics output.
//!
//! In pipe mode the counters are printed as one JSON object,
//! `{"add": N, "update": N, "removed": N}`, so scripts and editor plugins can
//! parse stdout directly. Otherwise a small table is printed, followed by
//! any skipped or failed files on stderr.

use anyhow::Result;

use vectorsync_core::models::SyncStats;

use crate::sync::{FileOutcome, SyncReport};

/// Print the report's counters to stdout. In human mode, skipped and failed
/// files follow on stderr; in pipe mode they are only logged.
pub fn print_report(report: &SyncReport, pipe: bool) -> Result<()> {
    if pipe {
        println!("{}", render_json(&report.stats)?);
        return Ok(());
    }

    print!("{}", render_table(&report.stats));
    for file in report.problems() {
        match &file.outcome {
            FileOutcome::Skipped { reason } => {
                eprintln!("skipped {}: {}", file.path.display(), reason)
            }
            FileOutcome::Failed { error } => {
                eprintln!("failed  {}: {}", file.path.display(), error)
            }
            FileOutcome::Added | FileOutcome::Updated => {}
        }
    }
    Ok(())
}

pub fn render_json(stats: &SyncStats) -> Result<String> {
    Ok(serde_json::to_string(stats)?)
}

/// Three right-aligned columns under `Added`, `Updated`, `Removed`.
pub fn render_table(stats: &SyncStats) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>8}  {:>8}  {:>8}\n",
        "Added", "Updated", "Removed"
    ));
    out.push_str(&format!("{}\n", "-".repeat(28)));
    out.push_str(&format!(
        "{:>8}  {:>8}  {:>8}\n",
        stats.added, stats.updated, stats.removed
    ));
    out
}
