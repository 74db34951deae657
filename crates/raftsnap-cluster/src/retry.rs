//! Bounded retry around cluster calls: one re-authentication, one retry.

use std::future::Future;

use crate::auth::Authenticate;
use crate::error::{ClusterError, ClusterResult};

/// Total attempts per call, the first included.
pub const MAX_ATTEMPTS: u32 = 2;

/// Run `call`, and if it fails with an authentication-class error, re-authenticate
/// through `auth` and run it once more.
///
/// Non-authentication errors are returned immediately. If re-authentication
/// itself fails, a [`ClusterError::Reauth`] carrying both errors is returned.
pub async fn with_reauth<A, T, F, Fut>(auth: &A, operation: &str, mut call: F) -> ClusterResult<T>
where
    A: Authenticate + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = ClusterResult<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Err(err) if err.is_auth() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation = operation,
                    error = %err,
                    "Authentication error from cluster API, re-authenticating"
                );
                if let Err(reauth) = auth.authenticate().await {
                    tracing::error!(
                        operation = operation,
                        error = %reauth,
                        "Re-authentication failed"
                    );
                    return Err(ClusterError::Reauth {
                        reauth: Box::new(reauth),
                        original: Box::new(err),
                    });
                }
                attempt += 1;
                tracing::info!(operation = operation, attempt = attempt, "Retrying with new token");
            }
            result => return result,
        }
    }
}
