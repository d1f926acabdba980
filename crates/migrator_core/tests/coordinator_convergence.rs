use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use migrator_core::{
    BatchCoordinator, CoordinatorSettings, Field, FieldMapping, Row, RowError, RowIndex,
    RowOutcome, RowProcessor, RowSchema,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    migrator_logging::initialize_for_tests();
}

fn rows(n: usize) -> Vec<Row> {
    let schema = Arc::new(RowSchema::resolve(["status", "name"], &FieldMapping::default()));
    (0..n)
        .map(|i| {
            Row::new(
                i,
                schema.clone(),
                vec![Some("publish".to_string()), Some(format!("Article {i}"))],
            )
        })
        .collect()
}

fn settings(batch_size: usize) -> CoordinatorSettings {
    CoordinatorSettings {
        batch_size,
        ..CoordinatorSettings::default()
    }
}

/// Uppercases the title and records every call. Rows listed in `fail_times`
/// fail that many times before succeeding (`usize::MAX` = always).
#[derive(Default)]
struct ScriptedProcessor {
    fail_times: BTreeMap<RowIndex, usize>,
    drafts: BTreeSet<RowIndex>,
    panics: BTreeSet<RowIndex>,
    calls: RefCell<Vec<RowIndex>>,
}

impl ScriptedProcessor {
    fn failing(index: RowIndex, times: usize) -> Self {
        Self {
            fail_times: BTreeMap::from([(index, times)]),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<RowIndex> {
        self.calls.borrow().clone()
    }

    fn call_count(&self, index: RowIndex) -> usize {
        self.calls.borrow().iter().filter(|i| **i == index).count()
    }
}

impl RowProcessor for ScriptedProcessor {
    fn process(&self, row: &Row) -> Result<RowOutcome, RowError> {
        let index = row.original_index();
        self.calls.borrow_mut().push(index);
        if self.panics.contains(&index) {
            panic!("boom on row {index}");
        }
        if self.drafts.contains(&index) {
            return Ok(RowOutcome::Filtered);
        }
        if let Some(times) = self.fail_times.get(&index) {
            if self.call_count(index) <= *times {
                return Err(RowError::Transform(format!("scripted failure {index}")));
            }
        }
        let mut output = row.clone();
        let title = row.get(Field::Name).map(str::to_uppercase);
        output.set(Field::Name, title);
        Ok(RowOutcome::Completed(output))
    }
}

#[test]
fn all_rows_complete_for_any_batch_size() {
    init_logging();
    for batch_size in [1, 3, 10, 50] {
        let processor = ScriptedProcessor::default();
        let report = BatchCoordinator::new(&processor, settings(batch_size)).run(&rows(10));

        let processed: Vec<_> = report.processed.iter().collect();
        assert_eq!(processed, (0..10).collect::<Vec<_>>(), "batch size {batch_size}");
        assert!(report.is_clean());
        assert_eq!(report.passes, 1);
        assert_eq!(report.completed.len(), 10);
    }
}

#[test]
fn permanent_failure_terminates_and_is_reported() {
    init_logging();
    let processor = ScriptedProcessor::failing(4, usize::MAX);
    let report = BatchCoordinator::new(&processor, settings(3)).run(&rows(9));

    assert_eq!(report.failed_indices(), vec![4]);
    assert_eq!(
        report.permanently_failed[&4],
        RowError::Transform("scripted failure 4".to_string())
    );
    assert_eq!(report.processed.len(), 8);
    assert!(!report.processed.contains(4));
    // Primary pass plus exactly one retry that made no progress.
    assert_eq!(report.passes, 2);
    assert_eq!(processor.call_count(4), 2);
}

#[test]
fn transient_failure_recovers_in_retry_pass() {
    init_logging();
    let processor = ScriptedProcessor::failing(2, 1);
    let report = BatchCoordinator::new(&processor, settings(4)).run(&rows(6));

    assert!(report.is_clean());
    assert_eq!(report.passes, 2);
    assert_eq!(report.completed[&2].get(Field::Name), Some("ARTICLE 2"));
}

#[test]
fn short_final_batch_is_padded_without_double_counting() {
    init_logging();
    let processor = ScriptedProcessor::default();
    let report = BatchCoordinator::new(&processor, settings(3)).run(&rows(7));

    assert_eq!(processor.calls(), vec![0, 1, 2, 3, 4, 5, 6, 0, 1]);
    assert_eq!(report.processed.len(), 7);
    assert_eq!(report.completed.len(), 7);
    assert_eq!(report.passes, 1);
}

#[test]
fn retry_batches_are_padded_from_completed_rows() {
    init_logging();
    let processor = ScriptedProcessor::failing(4, 1);
    let report = BatchCoordinator::new(&processor, settings(2)).run(&rows(5));

    // Pass 1: [0,1] [2,3] [4 + pad 0]; pass 2: [4 + pad 0].
    assert_eq!(processor.calls(), vec![0, 1, 2, 3, 4, 0, 4, 0]);
    assert!(report.is_clean());
    assert_eq!(report.processed.len(), 5);
}

#[test]
fn failing_padding_row_keeps_its_recorded_output() {
    init_logging();
    // Row 0 succeeds first, then fails when re-run as padding.
    struct SecondCallFails(RefCell<usize>);
    impl RowProcessor for SecondCallFails {
        fn process(&self, row: &Row) -> Result<RowOutcome, RowError> {
            if row.original_index() == 0 {
                let mut seen = self.0.borrow_mut();
                *seen += 1;
                if *seen > 1 {
                    return Err(RowError::Transform("late failure".into()));
                }
            }
            Ok(RowOutcome::Completed(row.clone()))
        }
    }

    let processor = SecondCallFails(RefCell::new(0));
    let report = BatchCoordinator::new(&processor, settings(2)).run(&rows(3));

    assert!(report.is_clean());
    assert!(report.processed.contains(0));
    assert!(report.completed.contains_key(&0));
    assert_eq!(*processor.0.borrow(), 2);
}

#[test]
fn filtered_rows_are_neither_processed_nor_retried() {
    init_logging();
    let processor = ScriptedProcessor {
        drafts: BTreeSet::from([1, 3]),
        ..ScriptedProcessor::default()
    };
    let report = BatchCoordinator::new(&processor, settings(10)).run(&rows(5));

    assert_eq!(report.filtered, BTreeSet::from([1, 3]));
    assert_eq!(report.processed.iter().collect::<Vec<_>>(), vec![0, 2, 4]);
    assert!(report.is_clean());
    assert_eq!(report.passes, 1);
    assert_eq!(processor.call_count(1), 1);
}

#[test]
fn panicking_row_is_isolated_from_its_batch() {
    init_logging();
    let processor = ScriptedProcessor {
        panics: BTreeSet::from([1]),
        ..ScriptedProcessor::default()
    };
    let report = BatchCoordinator::new(&processor, settings(3)).run(&rows(3));

    assert_eq!(report.failed_indices(), vec![1]);
    assert!(matches!(report.permanently_failed[&1], RowError::Panicked(ref msg) if msg.contains("boom")));
    assert!(report.processed.contains(0));
    assert!(report.processed.contains(2));
}

#[test]
fn pass_limit_stops_retrying() {
    init_logging();
    let processor = ScriptedProcessor::failing(0, 5);
    let limited = CoordinatorSettings {
        batch_size: 2,
        max_passes: Some(1),
    };
    let report = BatchCoordinator::new(&processor, limited).run(&rows(2));

    assert_eq!(report.passes, 1);
    assert_eq!(report.failed_indices(), vec![0]);
    assert_eq!(
        report.permanently_failed[&0],
        RowError::Transform("scripted failure 0".to_string())
    );
}

#[test]
fn failed_row_reports_cause_of_its_latest_attempt() {
    init_logging();
    let processor = ScriptedProcessor::failing(1, usize::MAX);
    let report = BatchCoordinator::new(&processor, settings(2)).run(&rows(3));

    assert_eq!(report.failed_indices(), vec![1]);
    assert_eq!(
        report.permanently_failed,
        BTreeMap::from([(1, RowError::Transform("scripted failure 1".to_string()))])
    );
    assert_eq!(report.completed.len(), 2);
}

#[test]
fn completed_rows_come_out_in_original_order() {
    init_logging();
    let processor = ScriptedProcessor::failing(0, 1);
    let report = BatchCoordinator::new(&processor, settings(2)).run(&rows(4));

    let order: Vec<_> = report.completed_rows().map(Row::original_index).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
}

#[test]
fn empty_input_finishes_immediately() {
    init_logging();
    let processor = ScriptedProcessor::default();
    let report = BatchCoordinator::new(&processor, settings(3)).run(&[]);

    assert_eq!(report.total_rows, 0);
    assert!(report.is_clean());
    assert!(processor.calls().is_empty());
}
