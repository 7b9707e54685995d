mod in_memory_reporter;

use parking_lot::Mutex;

use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;

pub trait ReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    fn finalize(&self);
}

/// Fans operation records out to the configured collectors.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>>,
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ReportConfig {
    enable_summary: bool,
}

impl ReportConfig {
    /// Keep every operation in memory and print a per-operation table when the run finishes.
    pub fn enable_summary(mut self) -> Self {
        self.enable_summary = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>> = Vec::new();
        if self.enable_summary {
            collectors.push(Mutex::new(Box::new(InMemoryReporter::new())));
        }

        Reporter { collectors }
    }
}

/// Complete the record and hand it to the reporter.
pub fn report_operation(reporter: &Reporter, mut operation_record: OperationRecord, is_error: bool) {
    operation_record.finish(is_error);
    log::trace!(
        "Operation {} took {:?}, failed? {}",
        operation_record.operation_id(),
        operation_record.duration(),
        is_error
    );
    reporter.add_operation(&operation_record);
}
