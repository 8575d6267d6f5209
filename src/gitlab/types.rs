use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A GitLab project as returned by the projects API.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    /// Numeric id used by the pipelines endpoints
    pub id: u64,
    /// Full path including namespace (e.g. "group/project")
    pub path_with_namespace: String,
}

/// A pipeline entry from the project pipelines listing.
///
/// The listing is returned newest-first and carries only summary fields;
/// duration and timestamps require a detail fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineInfo {
    /// Unique pipeline id within the GitLab instance
    pub id: u64,
    /// Current status (e.g. "success", "failed", "running", "pending")
    pub status: String,
}

/// Full detail for a single pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline id within the GitLab instance
    pub id: u64,
    /// Current status
    pub status: String,
    /// Total runtime in seconds; null until the pipeline finishes
    #[serde(default)]
    pub duration: Option<i64>,
    /// When the pipeline was created
    pub created_at: DateTime<Utc>,
}
