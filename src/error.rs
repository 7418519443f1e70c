use std::path::PathBuf;

/// Failure to deliver one metric family to the collector.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("collector rejected push with {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("export period must be greater than zero")]
    InvalidPeriod,
    #[error("push timeout must be greater than zero")]
    InvalidTimeout,
}
