use std::path::PathBuf;

use artiflow_verify::Checksums;

use crate::error::Error;
use crate::pool::RunReport;

/// A file a worker moved, kept for reporting after the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferredFile {
    pub local_path:  PathBuf,
    pub remote_path: String,
    pub checksums:   Checksums,
}

/// Outcome of a batch operation.
#[derive(Debug, Default)]
pub struct TransferSummary {
    pub succeeded: usize,
    pub failed:    usize,
    pub files:     Vec<TransferredFile>,
    /// First fatal error, if any task hit one.
    pub error:     Option<Error>,
}

impl TransferSummary {
    pub fn is_success(&self) -> bool { self.failed == 0 && self.error.is_none() }
}

impl From<RunReport<Vec<TransferredFile>>> for TransferSummary {
    fn from(report: RunReport<Vec<TransferredFile>>) -> Self {
        Self {
            succeeded: report.tally.succeeded,
            failed:    report.tally.failed,
            files:     report.slots.into_iter().flatten().collect(),
            error:     report.error,
        }
    }
}

impl From<RunReport<()>> for TransferSummary {
    fn from(report: RunReport<()>) -> Self {
        Self {
            succeeded: report.tally.succeeded,
            failed:    report.tally.failed,
            files:     Vec::new(),
            error:     report.error,
        }
    }
}
