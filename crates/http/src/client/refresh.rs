//! Access token refresh

use super::{ApiRequest, ClientError, PublicClient};
use crate::types::{AccessToken, RefreshRequest};
use haven_core::Credentials;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Exchanges the stored refresh token for a new access token
///
/// Refreshes are serialised: while one is in flight, other callers wait for
/// it. A waiter whose request was rejected with a token that has since been
/// rotated reuses the stored token instead of refreshing again, so a burst
/// of concurrent 401s costs a single call to the refresh endpoint. When
/// that call fails, the rejected token is remembered and the waiters get
/// [`ClientError::SessionExpired`] instead of repeating the failure.
pub struct TokenRefresher {
    public: PublicClient,
    credentials: Credentials,
    /// Access token whose recovery last failed
    in_flight: Mutex<Option<String>>,
}

impl TokenRefresher {
    /// Token refresh endpoint
    pub const REFRESH_PATH: &'static str = "/api/token/refresh/";

    pub fn new(public: PublicClient, credentials: Credentials) -> Self {
        Self {
            public,
            credentials,
            in_flight: Mutex::new(None),
        }
    }

    /// Refresh the access token unconditionally
    ///
    /// Fails with [`ClientError::NoRefreshToken`] without touching the
    /// network when no refresh token is stored. On success the new access
    /// token is persisted and returned; the refresh token is never
    /// rewritten. Failures leave the store unchanged.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let _guard = self.in_flight.lock().await;
        self.exchange().await
    }

    /// Refresh after a request carrying `rejected` was answered with 401
    pub(crate) async fn refresh_rejected(
        &self,
        rejected: Option<&str>,
    ) -> Result<String, ClientError> {
        let mut failed_for = self.in_flight.lock().await;

        if let Some(current) = self.credentials.access_token()? {
            if rejected != Some(current.as_str()) {
                debug!("Access token already rotated by a concurrent refresh");
                return Ok(current);
            }
        }

        if rejected.is_some() && failed_for.as_deref() == rejected {
            debug!("Session already ended by a concurrent refresh");
            return Err(ClientError::SessionExpired);
        }

        match self.exchange().await {
            Ok(token) => {
                *failed_for = None;
                Ok(token)
            }
            Err(err) => {
                *failed_for = rejected.map(str::to_string);
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> Result<String, ClientError> {
        let refresh = self
            .credentials
            .refresh_token()?
            .ok_or(ClientError::NoRefreshToken)?;

        let request = ApiRequest::post(Self::REFRESH_PATH).json(&RefreshRequest { refresh: &refresh })?;
        let token: AccessToken = match self.public.execute(&request).await {
            Ok(token) => token,
            Err(ClientError::Http { status, message }) => {
                return Err(ClientError::RefreshFailed { status, message });
            }
            Err(err) => return Err(err),
        };

        self.credentials.replace_access_token(&token.access)?;
        info!("Access token refreshed");
        Ok(token.access)
    }
}
