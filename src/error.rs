use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("project '{0}' not found or inaccessible")]
    ProjectNotFound(String),

    #[error("GitLab API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
