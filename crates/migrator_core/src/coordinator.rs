use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

use migrator_logging::{migrator_debug, migrator_info, migrator_warn};

use crate::batch::{pad_batch, plan_batches, Batch, EntryRole};
use crate::{ProcessedIndexSet, Row, RowIndex};

pub const DEFAULT_BATCH_SIZE: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("row transform failed: {0}")]
    Transform(String),
    #[error("row processor panicked: {0}")]
    Panicked(String),
}

/// What a processor decided for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Completed(Row),
    /// Intentionally excluded (e.g. draft). Not an error and never retried.
    Filtered,
}

/// Transforms one row. Implementations must be deterministic so that padding
/// re-runs reproduce already recorded output.
pub trait RowProcessor {
    fn process(&self, row: &Row) -> Result<RowOutcome, RowError>;
}

/// Outcome of running one batch entry through the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Completed(Row),
    Filtered(RowIndex),
    Failed { index: RowIndex, cause: RowError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub batch_size: usize,
    /// Upper bound on passes including the primary one. `None` runs until the
    /// outstanding set stops shrinking.
    pub max_passes: Option<usize>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_passes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub total_rows: usize,
    pub passes: usize,
    pub processed: ProcessedIndexSet,
    /// Transformed rows keyed by original index; the last write wins.
    pub completed: BTreeMap<RowIndex, Row>,
    pub filtered: BTreeSet<RowIndex>,
    /// Rows that never completed, with the cause of their last failure.
    pub permanently_failed: BTreeMap<RowIndex, RowError>,
}

impl MigrationReport {
    /// Completed rows in original order.
    pub fn completed_rows(&self) -> impl Iterator<Item = &Row> {
        self.completed.values()
    }

    pub fn failed_indices(&self) -> Vec<RowIndex> {
        self.permanently_failed.keys().copied().collect()
    }

    pub fn is_clean(&self) -> bool {
        self.permanently_failed.is_empty()
    }
}

/// Drives batches through a [`RowProcessor`] and retries rows that did not
/// complete until every row is done or a pass makes no progress.
pub struct BatchCoordinator<'a, P: RowProcessor + ?Sized> {
    processor: &'a P,
    settings: CoordinatorSettings,
    processed: ProcessedIndexSet,
    completed: BTreeMap<RowIndex, Row>,
    filtered: BTreeSet<RowIndex>,
    last_failure: BTreeMap<RowIndex, RowError>,
}

impl<'a, P: RowProcessor + ?Sized> BatchCoordinator<'a, P> {
    pub fn new(processor: &'a P, settings: CoordinatorSettings) -> Self {
        Self {
            processor,
            settings,
            processed: ProcessedIndexSet::new(),
            completed: BTreeMap::new(),
            filtered: BTreeSet::new(),
            last_failure: BTreeMap::new(),
        }
    }

    pub fn run(mut self, rows: &[Row]) -> MigrationReport {
        let by_index: BTreeMap<RowIndex, &Row> =
            rows.iter().map(|row| (row.original_index(), row)).collect();
        let all: Vec<RowIndex> = by_index.keys().copied().collect();

        migrator_info!(
            "Starting migration of {} rows in batches of {}",
            all.len(),
            self.batch_size()
        );
        self.run_pass(1, &all, &by_index);
        let mut passes = 1;
        let mut outstanding = self.outstanding(&all);

        while !outstanding.is_empty() {
            if self.settings.max_passes.is_some_and(|max| passes >= max) {
                migrator_warn!("Pass limit {} reached with {} rows outstanding", passes, outstanding.len());
                break;
            }
            let before = outstanding;
            let work: Vec<RowIndex> = before.iter().copied().collect();
            passes += 1;
            migrator_info!("Retry pass {} over {} outstanding rows", passes, work.len());
            self.run_pass(passes, &work, &by_index);

            outstanding = self.outstanding(&all);
            if outstanding == before {
                migrator_info!(
                    "No progress in pass {}; {} rows are permanently failed",
                    passes,
                    outstanding.len()
                );
                break;
            }
        }

        // Every row is a primary entry in pass 1, so an outstanding row has a
        // recorded failure from its latest attempt.
        let mut permanently_failed = std::mem::take(&mut self.last_failure);
        permanently_failed.retain(|index, _| outstanding.contains(index));
        if !permanently_failed.is_empty() {
            migrator_warn!(
                "Permanently failed rows: {:?}",
                permanently_failed.keys().collect::<Vec<_>>()
            );
        }

        MigrationReport {
            total_rows: all.len(),
            passes,
            processed: self.processed,
            completed: self.completed,
            filtered: self.filtered,
            permanently_failed,
        }
    }

    fn batch_size(&self) -> usize {
        self.settings.batch_size.max(1)
    }

    fn outstanding(&self, all: &[RowIndex]) -> BTreeSet<RowIndex> {
        self.processed
            .outstanding(all.iter().copied())
            .into_iter()
            .filter(|index| !self.filtered.contains(index))
            .collect()
    }

    fn run_pass(&mut self, pass: usize, work: &[RowIndex], rows: &BTreeMap<RowIndex, &Row>) {
        let batch_size = self.batch_size();
        let plan = plan_batches(work, batch_size);
        let last = plan.len().saturating_sub(1);
        for (n, chunk) in plan.iter().enumerate() {
            let mut batch = Batch::primary(chunk);
            if n == last {
                let padded = pad_batch(&mut batch, batch_size, &self.processed);
                if padded > 0 {
                    migrator_debug!("Pass {} batch {} padded with {} completed rows", pass, n, padded);
                }
            }
            self.run_batch(pass, n, &batch, rows);
        }
    }

    fn run_batch(&mut self, pass: usize, n: usize, batch: &Batch, rows: &BTreeMap<RowIndex, &Row>) {
        let mut newly_done = 0usize;
        for entry in batch.entries() {
            let Some(row) = rows.get(&entry.index) else {
                continue;
            };
            match (entry.role, self.process_isolated(row)) {
                (EntryRole::Primary, ProcessingOutcome::Completed(output)) => {
                    if self.processed.mark_done(entry.index) {
                        newly_done += 1;
                    }
                    self.last_failure.remove(&entry.index);
                    self.completed.insert(entry.index, output);
                }
                (EntryRole::Primary, ProcessingOutcome::Filtered(index)) => {
                    migrator_debug!("Row {} filtered", index);
                    self.filtered.insert(index);
                }
                (EntryRole::Primary, ProcessingOutcome::Failed { index, cause }) => {
                    migrator_warn!("Row {} failed in pass {}: {}", index, pass, cause);
                    self.last_failure.insert(index, cause);
                }
                (EntryRole::Padding, ProcessingOutcome::Completed(output)) => {
                    self.completed.insert(entry.index, output);
                }
                (EntryRole::Padding, other) => {
                    migrator_debug!("Padding row {} did not complete: {:?}", entry.index, other);
                }
            }
        }
        migrator_info!(
            "Pass {} batch {} finished: {}/{} primary rows completed, {} padding",
            pass,
            n,
            newly_done,
            batch.primary_count(),
            batch.padding_count()
        );
    }

    fn process_isolated(&self, row: &Row) -> ProcessingOutcome {
        let index = row.original_index();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.processor.process(row)));
        match result {
            Ok(Ok(RowOutcome::Completed(output))) => ProcessingOutcome::Completed(output),
            Ok(Ok(RowOutcome::Filtered)) => ProcessingOutcome::Filtered(index),
            Ok(Err(cause)) => ProcessingOutcome::Failed { index, cause },
            Err(payload) => ProcessingOutcome::Failed {
                index,
                cause: RowError::Panicked(panic_message(payload.as_ref())),
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
