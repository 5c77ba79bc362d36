use thiserror::Error;

/// Failure kinds surfaced by the scanner and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Market data could not be fetched, or not enough history came back
    #[error("no data for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    /// Best-effort notification was not delivered
    #[error("notification failed: {0}")]
    NotificationFailure(String),

    /// An open position already exists for the instrument
    #[error("already have open position for {instrument}")]
    PositionRejected { instrument: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn data_unavailable(instrument: &str, reason: impl Into<String>) -> Self {
        Error::DataUnavailable {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }
}
