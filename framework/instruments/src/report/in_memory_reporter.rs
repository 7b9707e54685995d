mod operations_table;

use std::collections::BTreeMap;
use std::time::Duration;

use tabled::settings::Style;
use tabled::Table;

use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;

/// A very basic reporter that is useful while developing scenarios. It keeps all of the operations
/// in memory and prints a summary of the operations at the end of the run.
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn summary_rows(&self) -> Vec<OperationRow> {
        self.operation_records
            .iter()
            .fold(BTreeMap::<&str, Vec<&OperationRecord>>::new(), |mut acc, record| {
                acc.entry(record.operation_id()).or_default().push(record);
                acc
            })
            .into_iter()
            .map(|(operation_id, operations)| {
                let total_operations = operations.len();
                let durations = operations
                    .iter()
                    .filter_map(|record| record.duration())
                    .collect::<Vec<_>>();
                let total_duration: Duration = durations.iter().sum();
                let successful = operations
                    .iter()
                    .filter(|op| !op.is_error())
                    .filter_map(|op| op.duration());

                OperationRow {
                    operation_id: operation_id.to_string(),
                    total_operations,
                    errors: operations.iter().filter(|op| op.is_error()).count(),
                    total_duration_ms: as_ms(total_duration),
                    avg_time_ms: as_ms(total_duration) / total_operations.max(1) as f64,
                    min_time_ms: successful.clone().min().map(as_ms),
                    max_time_ms: successful.max().map(as_ms),
                }
            })
            .collect()
    }

    fn print_summary_of_operations(&self) {
        println!("\nSummary of operations");
        let mut table = Table::new(self.summary_rows());
        table.with(Style::modern());

        println!("{table}");
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::report_operation;
    use crate::ReportConfig;

    #[test]
    fn groups_operations_by_id() {
        let mut reporter = InMemoryReporter::new();
        for (id, is_error) in [("add", false), ("add", true), ("delete", false)] {
            let mut record = OperationRecord::new(id);
            record.finish(is_error);
            reporter.add_operation(&record);
        }

        let rows = reporter.summary_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].operation_id, "add");
        assert_eq!(rows[0].total_operations, 2);
        assert_eq!(rows[0].errors, 1);
        assert!(rows[0].min_time_ms.is_some());
        assert_eq!(rows[1].operation_id, "delete");
        assert_eq!(rows[1].errors, 0);
    }

    #[test]
    fn only_failed_operations_have_no_min_or_max() {
        let mut reporter = InMemoryReporter::new();
        let mut record = OperationRecord::new("login");
        record.finish(true);
        reporter.add_operation(&record);

        let rows = reporter.summary_rows();
        assert_eq!(rows[0].min_time_ms, None);
        assert_eq!(rows[0].max_time_ms, None);
    }

    #[test]
    fn reporter_without_summary_accepts_operations() {
        let reporter = ReportConfig::default().init();
        report_operation(&reporter, OperationRecord::new("noop"), false);
        reporter.finalize();
    }
}
