//! Error kinds and policy (§7).

/// Errors that can terminate the pipeline outright. Per-record and
/// per-write failures (§7 "Malformed record", "Storage write failure at
/// runtime") are logged and handled inline; they never produce this type.
#[derive(Debug, thiserror::Error)]
pub enum TrackStreamError {
    #[error("broker unavailable at startup: {0}")]
    BrokerUnavailable(String),

    #[error("storage unavailable at startup: {0}")]
    StorageUnavailable(String),

    #[error("failed to read configuration file")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}
