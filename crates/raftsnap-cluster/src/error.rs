use raftsnap_core::AgentError;
use thiserror::Error;

/// Lower-cased markers that identify an authentication-class failure.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "403",
    "forbidden",
    "permission denied",
    "invalid token",
    "invalid credential",
];

/// Cluster API errors
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Cluster API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Cluster API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Snapshot sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("No valid authentication method configured")]
    NoCredentials,

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Re-authentication failed: {reauth} (original error: {original})")]
    Reauth {
        reauth: Box<ClusterError>,
        original: Box<ClusterError>,
    },
}

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;

impl ClusterError {
    /// Whether re-authenticating could fix this error.
    ///
    /// HTTP 401/403 always qualify. Other statuses and login failures qualify
    /// when the server's message carries one of the known markers; transport
    /// errors never do, since their text includes the request URL.
    pub fn is_auth(&self) -> bool {
        match self {
            ClusterError::Status {
                status: 401 | 403, ..
            } => true,
            ClusterError::Status { body, .. } => has_auth_marker(body),
            ClusterError::Login(message) => has_auth_marker(message),
            _ => false,
        }
    }
}

fn has_auth_marker(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTH_ERROR_MARKERS.iter().any(|marker| text.contains(marker))
}

impl From<ClusterError> for AgentError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::NoCredentials => AgentError::Config(err.to_string()),
            ref e if e.is_auth() => AgentError::Auth(e.to_string()),
            ClusterError::Reauth { .. } | ClusterError::Login(_) => AgentError::Auth(err.to_string()),
            _ => AgentError::Io(err.to_string()),
        }
    }
}
