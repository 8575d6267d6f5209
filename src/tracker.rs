use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::Target;
use crate::metrics::{PipelineMetrics, TRACKED_STATUSES};

/// The most recently observed pipeline run for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSnapshot {
    pub id: u64,
    pub status: String,
    /// Runtime in seconds; 0 while the pipeline is still running
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of polling a single target.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The project has no pipelines for the ref yet
    NoData,
    /// The newest pipeline matches the stored snapshot (same id and status)
    Unchanged,
    /// A materially different pipeline was observed (new id or new status)
    Changed(PipelineSnapshot),
}

/// Tracks the last observed pipeline per (project, ref) and derives metrics
/// from observed changes.
///
/// All state is in memory; nothing survives a restart. The map lock is held
/// across each full metric update, so overlapping polls of the same target
/// cannot interleave partial writes. The last writer wins.
pub struct PipelineTracker {
    metrics: PipelineMetrics,
    seen: Mutex<HashMap<(String, String), PipelineSnapshot>>,
}

impl PipelineTracker {
    pub fn new(metrics: PipelineMetrics) -> Self {
        Self {
            metrics,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Stored snapshot for a target, if one was observed. The fetcher uses
    /// this for change comparison without touching the API.
    pub fn last_seen(&self, target: &Target) -> Option<PipelineSnapshot> {
        self.seen.lock().unwrap().get(&target.key()).cloned()
    }

    /// Record a poll outcome for a target, updating stored state and metrics.
    ///
    /// No series exist for a target until its first pipeline is observed.
    /// The first observation creates the run counter at 0; every later
    /// change increments it.
    pub fn record(&self, target: &Target, outcome: PollOutcome) {
        let mut seen = self.seen.lock().unwrap();

        match outcome {
            PollOutcome::NoData => {}
            PollOutcome::Unchanged => {
                if let Some(snapshot) = seen.get(&target.key()) {
                    self.set_time_since_last_run(target, snapshot.created_at);
                }
            }
            PollOutcome::Changed(snapshot) => {
                let previous = seen.insert(target.key(), snapshot.clone());

                let run_count = self
                    .metrics
                    .run_count
                    .with_label_values(&[&target.name, &target.ref_]);
                if previous.is_some() {
                    run_count.inc();
                }

                self.metrics
                    .last_run_duration
                    .with_label_values(&[&target.name, &target.ref_])
                    .set(snapshot.duration as f64);

                for tracked in TRACKED_STATUSES {
                    let value = if tracked == snapshot.status { 1.0 } else { 0.0 };
                    self.metrics
                        .status
                        .with_label_values(&[&target.name, &target.ref_, tracked])
                        .set(value);
                }

                self.set_time_since_last_run(target, snapshot.created_at);
            }
        }
    }

    fn set_time_since_last_run(&self, target: &Target, created_at: DateTime<Utc>) {
        let elapsed = (Utc::now() - created_at).num_milliseconds() as f64 / 1000.0;
        self.metrics
            .time_since_last_run
            .with_label_values(&[&target.name, &target.ref_])
            .set(elapsed.round());
    }
}
