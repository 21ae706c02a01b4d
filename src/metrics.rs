use std::sync::atomic::{AtomicU64, Ordering};

use crate::processing::SummaryStatus;

/// Thread-safe counters describing upload and summary activity.
#[derive(Default)]
pub struct PipelineMetrics {
    sets_created: AtomicU64,
    documents_uploaded: AtomicU64,
    summaries_generated: AtomicU64,
    summaries_without_valid_lines: AtomicU64,
    summaries_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created set and the number of documents stored with it.
    pub fn record_upload(&self, document_count: u64) {
        self.sets_created.fetch_add(1, Ordering::Relaxed);
        self.documents_uploaded
            .fetch_add(document_count, Ordering::Relaxed);
    }

    /// Record how a summary request ended. Empty sets are not counted.
    pub fn record_summary(&self, status: SummaryStatus) {
        let counter = match status {
            SummaryStatus::Generated => &self.summaries_generated,
            SummaryStatus::NoValidLines => &self.summaries_without_valid_lines,
            SummaryStatus::Failed => &self.summaries_failed,
            SummaryStatus::EmptySet => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sets_created: self.sets_created.load(Ordering::Relaxed),
            documents_uploaded: self.documents_uploaded.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            summaries_without_valid_lines: self
                .summaries_without_valid_lines
                .load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Document sets created since startup.
    pub sets_created: u64,
    /// Documents stored across all created sets.
    pub documents_uploaded: u64,
    /// Summaries with at least one rendered paragraph.
    pub summaries_generated: u64,
    /// Summaries where the model reply had no line in the expected format.
    pub summaries_without_valid_lines: u64,
    /// Summaries whose model call failed.
    pub summaries_failed: u64,
}
