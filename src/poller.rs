use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{Config, Target};
use crate::error::Result;
use crate::gitlab::GitLabClient;
use crate::tracker::{PipelineSnapshot, PipelineTracker, PollOutcome};

/// Drives the repeating poll cycle over all configured targets.
///
/// Each cycle resolves the configured entries (expanding wildcards), spawns
/// one polling task per target without joining them, then sleeps for the
/// configured interval. A target whose previous task is still in flight is
/// skipped for the cycle instead of piling up a second task.
pub struct Poller {
    client: GitLabClient,
    tracker: Arc<PipelineTracker>,
    config: Config,
    inflight: Mutex<HashSet<(String, String)>>,
}

impl Poller {
    pub fn new(client: GitLabClient, tracker: Arc<PipelineTracker>, config: Config) -> Self {
        Self {
            client,
            tracker,
            config,
            inflight: Mutex::new(HashSet::new()),
        }
    }

    /// Run the scheduler loop forever. The first cycle starts immediately.
    pub async fn run(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.polling_interval_seconds);

        loop {
            for target in self.resolve_targets().await {
                Self::spawn_poll(&self, target);
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Expand configured entries into concrete targets.
    ///
    /// Wildcard entries are resolved against the projects owned by the
    /// configured token, each paired with the entry's ref. A failed expansion
    /// skips that entry for this cycle and is retried on the next; other
    /// entries are unaffected.
    async fn resolve_targets(&self) -> Vec<Target> {
        let mut targets = Vec::new();

        for entry in &self.config.projects {
            if !entry.is_wildcard() {
                targets.push(entry.clone());
                continue;
            }

            info!(
                "Wildcard detected: pulling all owned projects with ref {}",
                entry.ref_
            );

            match self.client.owned_projects().await {
                Ok(projects) => {
                    targets.extend(projects.into_iter().map(|project| Target {
                        name: project.path_with_namespace,
                        ref_: entry.ref_.clone(),
                    }));
                }
                Err(err) => {
                    warn!("Unable to fetch owned projects from the GitLab API: {err}");
                }
            }
        }

        targets
    }

    /// Spawn a fire-and-forget polling task for one target, unless the
    /// previous task for the same target has not finished yet.
    fn spawn_poll(poller: &Arc<Self>, target: Target) {
        {
            let mut inflight = poller.inflight.lock().unwrap();
            if !inflight.insert(target.key()) {
                debug!(
                    "Skipping {}:{}, previous poll still in flight",
                    target.name, target.ref_
                );
                return;
            }
        }

        let poller = Arc::clone(poller);
        tokio::spawn(async move {
            if let Err(err) = poller.poll_target(&target).await {
                warn!("Polling {}:{} failed: {err}", target.name, target.ref_);
            }
            poller.inflight.lock().unwrap().remove(&target.key());
        });
    }

    /// Poll a single target: resolve the project, inspect the newest pipeline
    /// for the ref, fetch detail when it differs from the stored snapshot,
    /// and hand the outcome to the tracker.
    ///
    /// A failure leaves the target's metrics stale; the next cycle retries.
    async fn poll_target(&self, target: &Target) -> Result<()> {
        let project = self.client.project(&target.name).await?;
        info!("Polling ID: {} | {}:{}", project.id, target.name, target.ref_);

        let outcome = self.fetch_outcome(project.id, target).await?;
        self.tracker.record(target, outcome);

        Ok(())
    }

    async fn fetch_outcome(&self, project_id: u64, target: &Target) -> Result<PollOutcome> {
        let pipelines = self.client.pipelines(project_id, &target.ref_).await?;

        // GitLab lists newest-first; only the head matters
        let Some(newest) = pipelines.first() else {
            return Ok(PollOutcome::NoData);
        };

        if let Some(last) = self.tracker.last_seen(target) {
            if last.id == newest.id && last.status == newest.status {
                return Ok(PollOutcome::Unchanged);
            }
        }

        let detail = self.client.pipeline(project_id, newest.id).await?;

        Ok(PollOutcome::Changed(PipelineSnapshot {
            id: detail.id,
            status: detail.status,
            duration: detail.duration.unwrap_or(0),
            created_at: detail.created_at,
        }))
    }
}
