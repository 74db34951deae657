//! HTTP client for the cluster API.

use async_trait::async_trait;
use futures::StreamExt;
use raftsnap_core::ClusterConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;

use crate::auth::{Authenticate, Credentials};
use crate::error::{ClusterError, ClusterResult};
use crate::retry::with_reauth;
use crate::traits::{LeadershipGate, SnapshotSource};

const TOKEN_HEADER: &str = "X-Vault-Token";
const LEADER_PATH: &str = "/v1/sys/leader";
const SNAPSHOT_PATH: &str = "/v1/sys/storage/raft/snapshot";
const APPROLE_LOGIN_PATH: &str = "/v1/auth/approle/login";

/// Transport settings for [`ClusterClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Applied to leader and login calls, and as the connect timeout for snapshots.
    pub timeout: Duration,
    pub skip_verify: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            skip_verify: false,
        }
    }
}

/// `GET /v1/sys/leader` response. Only `is_self` drives decisions.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderStatus {
    #[serde(default)]
    pub ha_enabled: bool,
    pub is_self: bool,
    #[serde(default)]
    pub leader_address: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
    #[serde(default)]
    lease_duration: u64,
}

/// Cluster API client holding the current session token.
pub struct ClusterClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl ClusterClient {
    /// Create a client without authenticating. Call [`Authenticate::authenticate`]
    /// (or use [`ClusterClient::connect`]) before issuing requests.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        options: ClientOptions,
    ) -> ClusterResult<Self> {
        // No total timeout on the client: snapshot streams can run far longer
        // than a single API call should.
        let client = Client::builder()
            .connect_timeout(options.timeout)
            .danger_accept_invalid_certs(options.skip_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            timeout: options.timeout,
            token: RwLock::new(None),
        })
    }

    /// Build a client from configuration and perform the initial login.
    pub async fn connect(config: &ClusterConfig) -> ClusterResult<Self> {
        let credentials = Credentials::from_config(config)?;
        tracing::info!(
            address = %config.address,
            auth_mode = credentials.mode(),
            "Connecting to cluster API"
        );
        let client = Self::new(
            config.address.clone(),
            credentials,
            ClientOptions {
                timeout: config.timeout,
                skip_verify: config.skip_verify,
            },
        )?;
        client.authenticate().await?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().await.clone();
        match token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn check_status(response: Response) -> ClusterResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClusterError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Single leader query, no retry.
    pub async fn fetch_leader(&self) -> ClusterResult<LeaderStatus> {
        let request = self
            .client
            .get(self.build_url(LEADER_PATH))
            .timeout(self.timeout);
        let response = self.apply_auth(request).await.send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Start a snapshot download and return the response once headers arrive.
    async fn open_snapshot(&self) -> ClusterResult<Response> {
        let request = self.client.get(self.build_url(SNAPSHOT_PATH));
        let response = self.apply_auth(request).await.send().await?;
        Self::check_status(response).await
    }

    async fn login_approle(&self, role_id: &str, secret_id: &str) -> ClusterResult<String> {
        let response = self
            .client
            .post(self.build_url(APPROLE_LOGIN_PATH))
            .timeout(self.timeout)
            .json(&serde_json::json!({
                "role_id": role_id,
                "secret_id": secret_id,
            }))
            .send()
            .await?;
        let response = Self::check_status(response)
            .await
            .map_err(|e| ClusterError::Login(e.to_string()))?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::Login(format!("invalid login response: {}", e)))?;
        let auth = body
            .auth
            .ok_or_else(|| ClusterError::Login("approle login returned no auth data".to_string()))?;

        tracing::info!(
            lease_duration_secs = auth.lease_duration,
            "AppRole authentication successful"
        );
        Ok(auth.client_token)
    }
}

#[async_trait]
impl Authenticate for ClusterClient {
    async fn authenticate(&self) -> ClusterResult<()> {
        let token = match &self.credentials {
            Credentials::Token(token) => {
                tracing::debug!("Using static token authentication");
                token.clone()
            }
            Credentials::AppRole { role_id, secret_id } => {
                tracing::debug!("Authenticating with AppRole");
                self.login_approle(role_id, secret_id).await?
            }
        };
        *self.token.write().await = Some(token);
        Ok(())
    }
}

#[async_trait]
impl LeadershipGate for ClusterClient {
    async fn is_leader(&self) -> ClusterResult<bool> {
        let status = with_reauth(self, "leader", || self.fetch_leader()).await?;
        tracing::debug!(
            is_self = status.is_self,
            leader_address = %status.leader_address,
            "Leader status"
        );
        Ok(status.is_self)
    }
}

#[async_trait]
impl SnapshotSource for ClusterClient {
    async fn take_snapshot(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> ClusterResult<u64> {
        let response = with_reauth(self, "snapshot", || self.open_snapshot()).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}
