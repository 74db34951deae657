//! Credential modes and the re-authentication seam.

use async_trait::async_trait;
use raftsnap_core::ClusterConfig;
use std::fmt;

use crate::error::{ClusterError, ClusterResult};

/// Authentication strategy for the cluster API, in priority order.
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued token, used as-is.
    Token(String),
    /// Role/secret pair exchanged for a short-lived token at login.
    AppRole { role_id: String, secret_id: String },
}

impl Credentials {
    /// Pick the credential mode from configuration. A static token wins over AppRole.
    pub fn from_config(config: &ClusterConfig) -> ClusterResult<Self> {
        if let Some(token) = &config.token {
            return Ok(Credentials::Token(token.clone()));
        }
        match (&config.role_id, &config.secret_id) {
            (Some(role_id), Some(secret_id)) => Ok(Credentials::AppRole {
                role_id: role_id.clone(),
                secret_id: secret_id.clone(),
            }),
            _ => Err(ClusterError::NoCredentials),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::AppRole { .. } => "approle",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credentials::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"<redacted>")
                .finish(),
        }
    }
}

/// Something that can (re)establish a session with the cluster API.
#[async_trait]
pub trait Authenticate: Send + Sync {
    async fn authenticate(&self) -> ClusterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(token: Option<&str>, role: Option<&str>, secret: Option<&str>) -> ClusterConfig {
        ClusterConfig {
            address: "http://127.0.0.1:8200".to_string(),
            token: token.map(String::from),
            role_id: role.map(String::from),
            secret_id: secret.map(String::from),
            skip_verify: false,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn token_takes_priority() {
        let creds = Credentials::from_config(&config(Some("s.tok"), Some("r"), Some("s"))).unwrap();
        assert_eq!(creds.mode(), "token");
    }

    #[test]
    fn approle_requires_both_ids() {
        let creds = Credentials::from_config(&config(None, Some("r"), Some("s"))).unwrap();
        assert_eq!(creds.mode(), "approle");

        let err = Credentials::from_config(&config(None, Some("r"), None)).unwrap_err();
        assert!(matches!(err, ClusterError::NoCredentials));
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!(
            "{:?} {:?}",
            Credentials::Token("s.super-secret".into()),
            Credentials::AppRole {
                role_id: "role-1".into(),
                secret_id: "hunter2".into()
            }
        );
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("role-1"));
    }
}
