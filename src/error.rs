use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Unreadable or malformed settings / credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures while obtaining or refreshing a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid redirect URI {uri:?}: {reason}")]
    InvalidRedirect { uri: String, reason: String },

    #[error("failed to bind OAuth callback listener on {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("authorization was denied by the provider: {0}")]
    Denied(String),

    #[error("callback state did not match the authorization request")]
    StateMismatch,

    #[error("no authorization callback received within {0:?}")]
    Timeout(Duration),

    #[error("callback listener stopped before delivering a code")]
    ListenerClosed,

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("stored token has no refresh token")]
    NoRefreshToken,
}

/// Token file persistence failures.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("no usable token at {0}")]
    NotFound(PathBuf),

    #[error("token file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single failed call against the remote API.
#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// A failed API operation, tagged with the query or message it was for.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to list message IDs for query {query:?}: {source}")]
    List {
        query: String,
        #[source]
        source: ApiFailure,
    },

    #[error("failed to get details for message {id}: {source}")]
    Get {
        id: String,
        #[source]
        source: ApiFailure,
    },
}

impl RemoteError {
    /// The query or message id the failed call was about.
    pub fn context(&self) -> &str {
        match self {
            RemoteError::List { query, .. } => query,
            RemoteError::Get { id, .. } => id,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("unable to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("no email ID given")]
    MissingMessageId,
}

pub type Result<T> = std::result::Result<T, Error>;
