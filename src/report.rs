//! Failure reporting and run summaries.
//!
//! The collector and the chart renderer report every recoverable failure
//! through an injected `Reporter`; the binary uses `TracingReporter`.

use std::fmt;
use std::path::Path;

use crate::error::{FetchFailed, MalformedRecord, RenderFailed};
use crate::model::GroupKey;

/// Receives per-unit outcomes as the pipeline runs.
pub trait Reporter: Send + Sync {
    fn fetch_failed(&self, failure: &FetchFailed);
    fn malformed_record(&self, record: &MalformedRecord);
    fn render_failed(&self, failure: &RenderFailed);
    fn chart_written(&self, _key: &GroupKey, _path: &Path) {}
}

/// Emits one `tracing` event per reported outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn fetch_failed(&self, failure: &FetchFailed) {
        tracing::warn!(
            station = %failure.station_id,
            pollutant = %failure.pollutant,
            cause = %failure.cause,
            "fetch failed"
        );
    }

    fn malformed_record(&self, record: &MalformedRecord) {
        tracing::warn!(station = %record.station_id, reason = %record.reason, "dropped malformed record");
    }

    fn render_failed(&self, failure: &RenderFailed) {
        tracing::error!(group = %failure.group_key, cause = %failure.cause, "chart not written");
    }

    fn chart_written(&self, key: &GroupKey, path: &Path) {
        tracing::info!(group = %key, path = %path.display(), "chart written");
    }
}

/// Counts of every unit the pipeline handled in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub stations: usize,
    pub tasks: usize,
    pub fetch_succeeded: usize,
    pub fetch_failed: usize,
    pub malformed_records: usize,
    pub groups: usize,
    pub charts_written: usize,
    pub charts_failed: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stations:          {}", self.stations)?;
        writeln!(
            f,
            "Fetch tasks:       {} ({} succeeded, {} failed)",
            self.tasks, self.fetch_succeeded, self.fetch_failed
        )?;
        writeln!(f, "Dropped records:   {}", self.malformed_records)?;
        writeln!(f, "Series:            {}", self.groups)?;
        write!(
            f,
            "Charts:            {} written, {} failed",
            self.charts_written, self.charts_failed
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that keeps everything it is told, for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub(crate) fetch_failures: Mutex<Vec<FetchFailed>>,
        pub(crate) malformed: Mutex<Vec<MalformedRecord>>,
        pub(crate) render_failures: Mutex<Vec<RenderFailed>>,
        pub(crate) written: Mutex<Vec<std::path::PathBuf>>,
    }

    impl Reporter for RecordingReporter {
        fn fetch_failed(&self, failure: &FetchFailed) {
            self.fetch_failures.lock().unwrap().push(failure.clone());
        }

        fn malformed_record(&self, record: &MalformedRecord) {
            self.malformed.lock().unwrap().push(record.clone());
        }

        fn render_failed(&self, failure: &RenderFailed) {
            self.render_failures.lock().unwrap().push(failure.clone());
        }

        fn chart_written(&self, _key: &GroupKey, path: &Path) {
            self.written.lock().unwrap().push(path.to_path_buf());
        }
    }
}
