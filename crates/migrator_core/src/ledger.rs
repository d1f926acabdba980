use std::collections::BTreeSet;

use crate::RowIndex;

/// Indices whose completed outcome has been recorded. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedIndexSet {
    done: BTreeSet<RowIndex>,
}

impl ProcessedIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `index` as completed. Returns true if it was not already recorded.
    pub fn mark_done(&mut self, index: RowIndex) -> bool {
        self.done.insert(index)
    }

    pub fn contains(&self, index: RowIndex) -> bool {
        self.done.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Ascending iteration over completed indices.
    pub fn iter(&self) -> impl Iterator<Item = RowIndex> + '_ {
        self.done.iter().copied()
    }

    /// Indices of `candidates` that are not yet completed, ascending.
    pub fn outstanding<I>(&self, candidates: I) -> BTreeSet<RowIndex>
    where
        I: IntoIterator<Item = RowIndex>,
    {
        candidates
            .into_iter()
            .filter(|index| !self.done.contains(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessedIndexSet;

    #[test]
    fn mark_done_reports_first_insert_only() {
        let mut set = ProcessedIndexSet::new();
        assert!(set.mark_done(3));
        assert!(!set.mark_done(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn outstanding_excludes_completed() {
        let mut set = ProcessedIndexSet::new();
        set.mark_done(1);
        set.mark_done(3);
        let outstanding: Vec<_> = set.outstanding(0..5).into_iter().collect();
        assert_eq!(outstanding, vec![0, 2, 4]);
    }
}
