use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded: {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported server URL scheme `{0}`")]
    Scheme(String),
    #[error("websocket error: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),
    #[error("no config directory available")]
    NoConfigDir,
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("settings could not be serialised: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(Box::new(err))
    }
}

impl Error {
    /// Builds a `Status` error from an HTTP status, using the canonical reason phrase.
    pub fn status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
