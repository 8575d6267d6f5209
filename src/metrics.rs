use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};

use crate::error::Result;

/// Pipeline statuses exposed as `status` gauge series.
///
/// GitLab reports more statuses than these (e.g. "pending", "canceled",
/// "skipped"); those are observed for change detection but not reflected in
/// any tracked series, so all three series read 0 while one is current.
pub const TRACKED_STATUSES: [&str; 3] = ["success", "failed", "running"];

/// Metric families describing the last observed pipeline per (project, ref).
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Seconds elapsed since the most recent pipeline was created
    pub time_since_last_run: GaugeVec,
    /// Duration of the last pipeline run in seconds
    pub last_run_duration: GaugeVec,
    /// New pipeline runs observed since startup
    pub run_count: IntCounterVec,
    /// One series per tracked status; 1 marks the current status
    pub status: GaugeVec,
}

impl PipelineMetrics {
    /// Create the metric families and register them with the provided registry.
    pub fn new(registry: &Registry) -> Result<Self> {
        let time_since_last_run = GaugeVec::new(
            Opts::new(
                "gitlab_ci_pipeline_time_since_last_run_seconds",
                "Elapsed time since most recent GitLab CI pipeline run",
            ),
            &["project", "ref"],
        )?;

        let last_run_duration = GaugeVec::new(
            Opts::new(
                "gitlab_ci_pipeline_last_run_duration_seconds",
                "Duration of last pipeline run",
            ),
            &["project", "ref"],
        )?;

        let run_count = IntCounterVec::new(
            Opts::new("gitlab_ci_pipeline_run_count", "GitLab CI pipeline run count"),
            &["project", "ref"],
        )?;

        let status = GaugeVec::new(
            Opts::new("gitlab_ci_pipeline_status", "GitLab CI pipeline current status"),
            &["project", "ref", "status"],
        )?;

        registry.register(Box::new(time_since_last_run.clone()))?;
        registry.register(Box::new(last_run_duration.clone()))?;
        registry.register(Box::new(run_count.clone()))?;
        registry.register(Box::new(status.clone()))?;

        Ok(Self {
            time_since_last_run,
            last_run_duration,
            run_count,
            status,
        })
    }
}
