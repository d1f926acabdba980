use crate::{ProcessedIndexSet, RowIndex};

/// Why a row is part of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// Outstanding work; its outcome is recorded.
    Primary,
    /// Already completed row re-run only to fill a short batch.
    Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    pub index: RowIndex,
    pub role: EntryRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn primary(indices: &[RowIndex]) -> Self {
        Self {
            entries: indices
                .iter()
                .map(|&index| BatchEntry {
                    index,
                    role: EntryRole::Primary,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.role == EntryRole::Primary)
            .count()
    }

    pub fn padding_count(&self) -> usize {
        self.len() - self.primary_count()
    }

    fn contains(&self, index: RowIndex) -> bool {
        self.entries.iter().any(|e| e.index == index)
    }
}

/// Split `work` into contiguous chunks of at most `batch_size` indices.
///
/// A `batch_size` of zero is treated as one.
pub fn plan_batches(work: &[RowIndex], batch_size: usize) -> Vec<Vec<RowIndex>> {
    work.chunks(batch_size.max(1)).map(<[RowIndex]>::to_vec).collect()
}

/// Fill a short batch up to `batch_size` with completed rows, lowest index first.
///
/// Nothing is added when no row has completed yet. Returns the number of
/// padding entries appended.
pub fn pad_batch(batch: &mut Batch, batch_size: usize, processed: &ProcessedIndexSet) -> usize {
    let target = batch_size.max(1);
    if batch.len() >= target || processed.is_empty() {
        return 0;
    }
    let candidates: Vec<RowIndex> = processed
        .iter()
        .filter(|index| !batch.contains(*index))
        .take(target - batch.len())
        .collect();
    for index in &candidates {
        batch.entries.push(BatchEntry {
            index: *index,
            role: EntryRole::Padding,
        });
    }
    candidates.len()
}
