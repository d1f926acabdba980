use std::io;
use std::path::{Path, PathBuf};

use migrator_core::MigrationReport;
use serde_json::json;

use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub skipped_filename: String,
    pub summary_filename: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            skipped_filename: "skipped_rows.txt".to_string(),
            summary_filename: Some("migration_summary.json".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub skipped_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot remove stale {path:?}: {source}")]
    RemoveStale { path: PathBuf, source: io::Error },
}

/// Write the list of permanently failed rows and a JSON summary of the run.
///
/// The skipped-rows file is only written when some row failed; a clean run
/// removes one left behind by an earlier run.
pub fn write_failure_report(
    report_dir: &Path,
    report: &MigrationReport,
    generated_utc: &str,
    options: ReportOptions,
) -> Result<ReportPaths, ReportError> {
    ensure_output_dir(report_dir)?;
    let writer = AtomicFileWriter::new(report_dir.to_path_buf());

    let failed = report.failed_indices();
    let skipped_path = if failed.is_empty() {
        remove_stale(&report_dir.join(&options.skipped_filename))?;
        None
    } else {
        let mut listing = String::new();
        for index in &failed {
            listing.push_str(&index.to_string());
            listing.push('\n');
        }
        Some(writer.write(&options.skipped_filename, &listing)?)
    };

    let summary_path = match options.summary_filename {
        Some(name) => {
            let summary = json!({
                "generated_utc": generated_utc,
                "total_rows": report.total_rows,
                "passes": report.passes,
                "completed": report.completed.len(),
                "filtered": report.filtered.iter().collect::<Vec<_>>(),
                "failed": report.permanently_failed.iter().map(|(index, cause)| {
                    json!({
                        "index": index,
                        "cause": cause.to_string(),
                    })
                }).collect::<Vec<_>>()
            });
            Some(writer.write(&name, &summary.to_string())?)
        }
        None => None,
    };

    Ok(ReportPaths {
        skipped_path,
        summary_path,
    })
}

fn remove_stale(path: &Path) -> Result<(), ReportError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ReportError::RemoveStale {
            path: path.to_path_buf(),
            source,
        }),
    }
}
