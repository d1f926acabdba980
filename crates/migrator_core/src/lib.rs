//! Migrator core: row model and the batch convergence engine. No IO.
mod batch;
mod coordinator;
mod ledger;
mod row;

pub use batch::{pad_batch, plan_batches, Batch, BatchEntry, EntryRole};
pub use coordinator::{
    BatchCoordinator, CoordinatorSettings, MigrationReport, ProcessingOutcome, RowError,
    RowOutcome, RowProcessor, DEFAULT_BATCH_SIZE,
};
pub use ledger::ProcessedIndexSet;
pub use row::{normalize_header, Field, FieldMapping, Row, RowIndex, RowSchema};
