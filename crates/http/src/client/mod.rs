//! Haven HTTP client
//!
//! [`PublicClient`] talks to unauthenticated endpoints (token issuance,
//! registration, password reset). [`AuthenticatedClient`] wraps it with the
//! request pipeline: the stored access token is attached as a bearer
//! credential, and a 401 answer triggers one token refresh followed by one
//! replay of the original request. When the refresh fails the stored
//! credentials are purged and the [`Navigator`] is sent to the login path.

pub mod auth;
pub mod error;
pub mod refresh;
pub mod request;
pub mod resources;

pub use error::ClientError;
pub use refresh::TokenRefresher;
pub use request::ApiRequest;

use haven_core::{CredentialStore, Credentials, HavenConfig, LogNavigator, Navigator};
use reqwest::{Client, Response, header};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default login entry point
pub const DEFAULT_LOGIN_PATH: &str = "/login";

const DEFAULT_USER_AGENT: &str = concat!("haven-client/", env!("CARGO_PKG_VERSION"));

/// Client for endpoints that don't require authentication
#[derive(Clone)]
pub struct PublicClient {
    client: Client,
    base_url: String,
}

impl PublicClient {
    /// Create a new public client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        ClientBuilder::new().base_url(base_url).build_public()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_builder(&self, request: &ApiRequest, token: Option<&str>) -> reqwest::RequestBuilder {
        let mut headers = request.headers().clone();
        if token.is_some() {
            // The stored credential wins over any caller-supplied one
            headers.remove(header::AUTHORIZATION);
        }

        let mut builder = self
            .client
            .request(request.method().clone(), request.url(&self.base_url))
            .headers(headers);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        builder
    }

    /// Send a request once, optionally with a bearer token
    ///
    /// Non-2xx answers are turned into [`ClientError::Http`].
    pub(crate) async fn transmit(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let response = self.request_builder(request, token).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, &body))
        }
    }

    /// Send a request without credentials
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        self.transmit(request, None).await
    }

    /// Execute a request and decode the JSON answer
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json().await?)
    }
}

/// Client for endpoints that take the stored bearer credential
#[derive(Clone)]
pub struct AuthenticatedClient {
    public: PublicClient,
    credentials: Credentials,
    refresher: Arc<TokenRefresher>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl AuthenticatedClient {
    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.public.base_url()
    }

    /// The unauthenticated client sharing this client's connection pool
    pub const fn public(&self) -> &PublicClient {
        &self.public
    }

    /// Typed view over the credential store
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The refresher used by the 401 recovery
    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    /// Path the navigator is sent to when the session cannot be recovered
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Send a request with the stored access token attached
    ///
    /// Absolute URLs on another origin than the base URL are sent without
    /// credentials and without 401 recovery.
    ///
    /// A 401 answer is recovered from once: the access token is refreshed
    /// and the same request is sent again with the new token. A second 401
    /// is returned to the caller. If the refresh fails, stored credentials
    /// are purged, the navigator is sent to the login path and the refresh
    /// error is returned.
    #[tracing::instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        if !request.shares_origin(self.base_url()) {
            warn!(url = request.path(), "Link leaves the API origin, sending without credentials");
            return self.public.send(request).await;
        }

        let mut token = self.credentials.access_token()?;
        let mut retried = false;

        loop {
            debug!(retried, authenticated = token.is_some(), "Sending request");
            match self.public.transmit(request, token.as_deref()).await {
                Ok(response) => {
                    debug!(status = %response.status(), retried, "Request succeeded");
                    return Ok(response);
                }
                Err(err) if err.is_unauthorized() && !retried => {
                    retried = true;
                    debug!("Access token rejected, refreshing");
                    token = Some(self.recover(token.as_deref()).await?);
                }
                Err(err) => {
                    debug!(error = %err, retried, "Request failed");
                    return Err(err);
                }
            }
        }
    }

    /// Execute a request and decode the JSON answer
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json().await?)
    }

    /// Execute a request whose answer carries no body worth decoding
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    async fn recover(&self, rejected: Option<&str>) -> Result<String, ClientError> {
        match self.refresher.refresh_rejected(rejected).await {
            Ok(token) => Ok(token),
            // Credentials are already purged and the navigator notified
            Err(ClientError::SessionExpired) => Err(ClientError::SessionExpired),
            Err(err) => {
                self.expire_session(&err);
                Err(err)
            }
        }
    }

    fn expire_session(&self, cause: &ClientError) {
        warn!(error = %cause, "Token refresh failed, ending session");
        if let Err(err) = self.credentials.purge() {
            error!(error = %err, "Failed to clear stored credentials");
        }
        self.navigator.navigate(&self.login_path);
    }
}

/// Builder for [`PublicClient`] and [`AuthenticatedClient`]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_path: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: None,
            store: None,
            navigator: None,
            login_path: None,
        }
    }

    /// Start from loaded configuration
    pub fn from_config(config: &HavenConfig) -> Self {
        let mut builder = Self::new()
            .base_url(config.api.base_url.clone())
            .user_agent(config.api.user_agent.clone())
            .login_path(config.session.login_path.clone());
        if let Some(timeout) = config.api.timeout() {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the credential store (required for authenticated clients)
    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the navigator notified when the session ends
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the login path used for the session-expired redirect
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is empty".into()));
        }

        let mut client_builder = Client::builder()
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(PublicClient {
            client: client_builder.build()?,
            base_url,
        })
    }

    /// Build an authenticated client
    pub fn build_authenticated(mut self) -> Result<AuthenticatedClient, ClientError> {
        let store = self
            .store
            .take()
            .ok_or_else(|| ClientError::Configuration("credential store is required".into()))?;
        let navigator = self
            .navigator
            .take()
            .unwrap_or_else(|| Arc::new(LogNavigator::new()));
        let login_path = self
            .login_path
            .take()
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        let public = self.build_public()?;
        let credentials = Credentials::new(store);
        let refresher = Arc::new(TokenRefresher::new(public.clone(), credentials.clone()));

        Ok(AuthenticatedClient {
            public,
            credentials,
            refresher,
            navigator,
            login_path,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
