use thiserror::Error;

/// Rejections raised while turning point options into an [`EngineConfig`].
///
/// [`EngineConfig`]: crate::config::EngineConfig
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("on_threshold ({on} lx) must not exceed off_threshold ({off} lx)")]
    ThresholdOrder { on: f64, off: f64 },

    #[error("{field} = {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("{quantity} is not a finite number")]
    NonFinite { quantity: &'static str },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read readings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed readings document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that can abort one refresh cycle of a point.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
