//! Nutrilabel HTTP client
//!
//! Every request goes out with the current access token as a bearer
//! credential. When the server rejects the token, the client refreshes it once
//! through `POST /token` (using the session cookie, not the bearer header) and
//! replays the request. Concurrent rejections share a single refresh; see
//! [`refresh::RefreshGate`].

pub mod bootstrap;
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod cookies;
pub mod error;
pub mod location;
pub mod products;
pub mod refresh;
pub mod session;
pub mod token;

use config::{ClientConfig, DEFAULT_USER_AGENT};
use error::ClientError;
use location::{Location, PageContext};
use nutrilabel_core::ApiResponse;
use refresh::{Admission, RefreshGate};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Request, Response};
use serde::de::DeserializeOwned;
use session::AuthStore;
use std::sync::Arc;
use std::time::Duration;
use token::{MemoryTokenStore, TokenStore};
use tracing::{debug, error, info, warn};
use url::Url;

/// Path of the token refresh endpoint, relative to the base URL
pub const REFRESH_PATH: &str = "/token";

/// Nutrilabel API client
#[derive(Clone)]
pub struct NutriClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    location: Location,
    auth_store: AuthStore,
    refresh: Arc<RefreshGate>,
    refresh_timeout: Option<Duration>,
}

impl NutriClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> NutriClientBuilder {
        NutriClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Page address the client consults for failure handling
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// UI state the client raises the login prompt on
    pub fn auth_store(&self) -> &AuthStore {
        &self.auth_store
    }

    /// Durable slot holding the access token
    pub fn token_store(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// Single-flight state of the token refresh
    pub fn refresh_gate(&self) -> &RefreshGate {
        &self.refresh
    }

    /// Whether a token refresh is in flight
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Store a token obtained from a login
    pub fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        self.tokens.save(token)?;
        Ok(())
    }

    /// Forget the stored access token
    pub fn logout(&self) -> Result<(), ClientError> {
        self.tokens.clear()?;
        info!("Access token cleared");
        Ok(())
    }

    /// Whether a token is available for the next request
    pub fn is_authenticated(&self) -> bool {
        matches!(self.tokens.load(), Ok(Some(_)))
    }

    /// Gate an action that needs a signed-in user
    ///
    /// Returns `true` when a token is available; otherwise raises the login
    /// prompt and returns `false`.
    pub fn require_login(&self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        self.auth_store.set_show_login_modal(true);
        false
    }

    /// Create a request builder for a path under the base URL
    ///
    /// The bearer credential is attached when the request is sent, so a token
    /// refreshed in the meantime is picked up.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and decode the JSON body
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a request answered with an [`ApiResponse`] envelope and return its result
    pub async fn execute_envelope<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let envelope: ApiResponse<T> = self.execute(request).await?;
        Ok(envelope.into_result()?)
    }

    /// Execute a request whose envelope carries no meaningful result
    pub async fn execute_ack(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let envelope: ApiResponse<serde_json::Value> = self.execute(request).await?;
        Ok(envelope.into_ack()?)
    }

    /// Send a request with token attachment and refresh-and-retry on 401
    ///
    /// A request is replayed at most once. Requests whose body cannot be
    /// cloned are never replayed; their 401 is returned as-is.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let request = request.build().map_err(|err| {
            log_construction_failure(&err);
            ClientError::Request(err)
        })?;
        let replay = request.try_clone();

        let error = match self.dispatch(request).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        let error = self.screen_failure(error)?;
        let Some(replay) = replay else {
            warn!("Request body cannot be replayed, not refreshing");
            return Err(error);
        };

        self.refresh_or_wait().await?;

        debug!(url = %replay.url(), "Retrying request with refreshed token");
        match self.dispatch(replay).await {
            Ok(response) => Ok(response),
            // already retried: a second 401 is surfaced unchanged
            Err(error) => match self.screen_failure(error) {
                Ok(error) | Err(error) => Err(error),
            },
        }
    }

    /// Attach the current token and send once
    async fn dispatch(&self, mut request: Request) -> Result<Response, ClientError> {
        if let Some(token) = self.current_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ClientError::Configuration("access token is not a valid header value".into())
            })?;
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }

        let method = request.method().clone();
        let url = request.url().clone();

        let result = match self.client.execute(request).await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => {
                let status = response.status();
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ClientError::from_status(status, message))
            }
            Err(err) => Err(ClientError::Request(err)),
        };

        if let Err(error) = &result {
            log_failure(&method, &url, error);
        }
        result
    }

    /// Token for the next request, picking up one handed over in the page address
    fn current_token(&self) -> Option<String> {
        bootstrap::extract_and_store_access_token(&self.location, self.tokens.as_ref())
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to read access token, sending without credentials");
                None
            })
    }

    /// Decide whether a failure may be recovered by refreshing the token
    ///
    /// `Ok` carries a 401 eligible for refresh; `Err` carries a failure to
    /// surface unchanged.
    fn screen_failure(&self, error: ClientError) -> Result<ClientError, ClientError> {
        match self.location.page() {
            PageContext::Login => Err(error),
            PageContext::Enroll if error.is_unauthorized() => {
                self.auth_store.set_show_login_modal(true);
                Err(error)
            }
            _ if error.is_unauthorized() => Ok(error),
            _ => Err(error),
        }
    }

    /// Lead a token refresh, or wait for the one in flight
    async fn refresh_or_wait(&self) -> Result<(), ClientError> {
        match self.refresh.admit() {
            Admission::Waiter(rx) => {
                debug!("Token refresh in flight, queueing request");
                match rx.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(cause)) => Err(ClientError::RefreshFailed(cause)),
                    Err(_) => Err(ClientError::RefreshAbandoned),
                }
            }
            Admission::Leader(guard) => {
                info!("Access token rejected, refreshing");
                match self.refresh_access_token().await {
                    Ok(()) => {
                        info!("Access token refreshed");
                        guard.settle(Ok(()));
                        Ok(())
                    }
                    Err(error) => {
                        warn!(error = %error, "Token refresh failed");
                        if error.is_unauthorized() {
                            self.auth_store.set_show_login_modal(true);
                        }
                        let cause = Arc::new(error);
                        guard.settle(Err(Arc::clone(&cause)));
                        Err(ClientError::RefreshFailed(cause))
                    }
                }
            }
        }
    }

    /// Call the refresh endpoint and persist the new token
    async fn refresh_access_token(&self) -> Result<(), ClientError> {
        let token = match self.refresh_timeout {
            #[cfg(not(target_arch = "wasm32"))]
            Some(limit) => tokio::time::timeout(limit, self.call_refresh_endpoint())
                .await
                .map_err(|_| ClientError::RefreshTimeout(limit))??,
            _ => self.call_refresh_endpoint().await?,
        };

        self.tokens.save(&token)?;
        Ok(())
    }

    async fn call_refresh_endpoint(&self) -> Result<String, ClientError> {
        // session cookie only; the rejected bearer token is not sent
        let request = self.request(Method::POST, REFRESH_PATH);
        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ClientError::from_status(status, message));
        }

        let envelope: ApiResponse<String> = response.json().await?;
        if !envelope.is_success {
            return Err(ClientError::RefreshRejected(
                envelope
                    .message
                    .unwrap_or_else(|| "server refused to issue a token".to_string()),
            ));
        }

        envelope
            .result
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ClientError::RefreshRejected("response carried no token".to_string()))
    }
}

/// Failures are only logged in debug builds
fn log_failure(method: &Method, url: &Url, error: &ClientError) {
    if !cfg!(debug_assertions) {
        return;
    }

    match error {
        ClientError::Request(err) if err.is_builder() => {
            error!(%method, %url, error = %err, "Request construction failed");
        }
        ClientError::Request(err) => {
            error!(%method, %url, error = %err, "Network error, no response received");
        }
        other => {
            error!(
                %method,
                %url,
                status = other.status().map(|s| s.as_u16()),
                error = %other,
                "HTTP request failed"
            );
        }
    }
}

fn log_construction_failure(err: &reqwest::Error) {
    if cfg!(debug_assertions) {
        error!(error = %err, "Request construction failed");
    }
}

/// Builder for [`NutriClient`]
#[derive(Default)]
pub struct NutriClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    refresh_timeout: Option<Duration>,
    user_agent: Option<String>,
    tokens: Option<Arc<dyn TokenStore>>,
    location: Option<Location>,
    auth_store: Option<AuthStore>,
    #[cfg(not(target_arch = "wasm32"))]
    cookies: Option<Arc<dyn reqwest::cookie::CookieStore>>,
}

impl NutriClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            refresh_timeout: config.refresh_timeout(),
            user_agent: Some(config.user_agent.clone()),
            ..Self::default()
        }
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound the token refresh call; without it a hung refresh stalls queued requests
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the durable token store (defaults to an in-memory store)
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(store);
        self
    }

    /// Share a page address with the app (defaults to the base URL)
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Share the UI auth state with the app
    pub fn auth_store(mut self, store: AuthStore) -> Self {
        self.auth_store = Some(store);
        self
    }

    /// Keep session cookies in `store` instead of a jar owned by this client
    ///
    /// Pass a [`cookies::FileCookieStore`] so a later client can still refresh.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn cookie_provider<C: reqwest::cookie::CookieStore + 'static>(
        mut self,
        store: Arc<C>,
    ) -> Self {
        self.cookies = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<NutriClient, ClientError> {
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|err| ClientError::Configuration(format!("invalid base_url: {err}")))?;

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        {
            client_builder = match self.cookies {
                Some(store) => {
                    client_builder.cookie_provider(Arc::new(cookies::SharedCookies(store)))
                }
                None => client_builder.cookie_store(true),
            };
            if let Some(timeout) = self.timeout {
                client_builder = client_builder.timeout(timeout);
            }
        }

        client_builder = client_builder
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));

        let client = client_builder.build()?;

        Ok(NutriClient {
            client,
            base_url,
            tokens: self
                .tokens
                .unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
            location: self.location.unwrap_or_else(|| Location::new(parsed)),
            auth_store: self.auth_store.unwrap_or_default(),
            refresh: Arc::new(RefreshGate::new()),
            refresh_timeout: self.refresh_timeout,
        })
    }
}
