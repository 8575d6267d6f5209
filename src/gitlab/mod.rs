mod client;
mod types;

pub use client::GitLabClient;
pub use types::{Pipeline, PipelineInfo, Project};
