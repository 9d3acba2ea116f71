/// Error types for the ecobee client and the metrics sink
use std::path::PathBuf;

/// Failures talking to the ecobee API or managing its tokens
#[derive(Debug, thiserror::Error)]
pub enum EcobeeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ecobee API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("token cache {path}: {source}")]
    TokenCache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not authorized, run with --get-pin and --save-token first ({0})")]
    NotAuthorized(String),
    #[error("thermostat {0} not found in API response")]
    ThermostatNotFound(String),
    #[error("malformed thermostat summary: {0}")]
    MalformedSummary(String),
}

impl EcobeeError {
    /// ecobee reports an expired access token as status code 14
    pub fn is_token_expired(&self) -> bool {
        matches!(self, EcobeeError::Api { code: 14, .. })
    }
}

/// Failures writing metric points to the database
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("TLS setup error: {0}")]
    Tls(String),
}
