use std::time::Instant;

use indicatif::ProgressBar;
use tracing::info;

use crate::{model::Status, utils::progress_bar};

/// Per-status counts of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub success: u64,
    pub failed: u64,
    pub empty_address: u64,
    pub skipped: u64,
}

impl Summary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Success => self.success += 1,
            Status::Failed => self.failed += 1,
            Status::EmptyAddress => self.empty_address += 1,
            Status::Skipped => self.skipped += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.success + self.failed + self.empty_address + self.skipped
    }

    /// Share of geocoded rows (success or failed) that succeeded.
    pub fn success_rate(&self) -> Option<f64> {
        match self.success + self.failed {
            0 => None,
            attempted => Some(self.success as f64 / attempted as f64 * 100.0),
        }
    }
}

/// Counts outcomes and logs them every `every` records. Has no say in
/// control flow.
pub struct Progress {
    bar: ProgressBar,
    summary: Summary,
    total: u64,
    every: u64,
    started: Instant,
}

impl Progress {
    pub fn new(total: u64, every: u64) -> Self {
        Self {
            bar: progress_bar(total),
            summary: Summary::default(),
            total,
            every: every.max(1),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, status: Status) {
        self.summary.record(status);
        self.bar.inc(1);
        if self.summary.processed() % self.every == 0 {
            self.report();
        }
    }

    fn report(&self) {
        let s = &self.summary;
        let remaining = self.total.saturating_sub(s.processed());
        let elapsed = self.started.elapsed();
        self.bar.suspend(|| {
            info!(
                "Processed {}, {} successful, {} failed, {remaining} remaining ({elapsed:.1?})",
                s.processed(),
                s.success,
                s.failed,
            )
        });
    }

    pub fn finish(self) -> Summary {
        self.bar.finish_and_clear();
        self.summary
    }
}
