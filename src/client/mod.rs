//! Petstore API client.

mod config;
mod error;
mod interceptor;
mod request;
pub mod resilience;
mod response;

pub use config::{
    BASE_URL_ENV, ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_OPEN_TIMEOUT,
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, RETRY_ENABLED_ENV,
};
pub use error::{INVALID_ORDER_TYPE, classify};
pub use interceptor::AuthInterceptor;
pub use request::RequestContext;
pub use resilience::{Attempt, ExponentialBackoff, RETRYABLE_STATUSES, RetryPolicy};
pub use response::Response;

use std::sync::{Arc, RwLock, RwLockReadGuard};

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::Result;
use crate::auth::{AuthStrategy, StrategySelector};
use crate::types::WireFormat;

const JSON: &str = "application/json";

/// Client for the Petstore API.
///
/// Cheap to clone; clones share configuration, the memoized authenticator and
/// the connection pool. Safe to use from many tasks at once.
///
/// Changing the configuration while requests are in flight is not supported:
/// those requests may observe either the old or the new settings.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<ClientConfig>,
    selector: StrategySelector,
    strategy_override: Option<Arc<dyn AuthStrategy>>,
    token_http_override: bool,
    connection: RwLock<Option<reqwest::Client>>,
}

impl Client {
    /// Create a client, building the authenticator up front.
    ///
    /// Malformed credentials fail here rather than on the first request.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client from the process-wide default configuration.
    pub fn from_global() -> Result<Self> {
        Self::new(ClientConfig::global())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.read_config().clone()
    }

    fn read_config(&self) -> RwLockReadGuard<'_, ClientConfig> {
        self.inner.config.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The memoized credential strategy.
    pub fn authenticator(&self) -> Result<Arc<dyn AuthStrategy>> {
        if let Some(strategy) = &self.inner.strategy_override {
            return Ok(strategy.clone());
        }
        let config = self.read_config();
        self.inner.selector.select(&config.auth)
    }

    /// Forget the memoized strategy; the next request rebuilds it.
    pub fn reset_authenticator(&self) {
        self.inner.selector.invalidate();
    }

    /// Forget the memoized connection; the next request rebuilds it.
    pub fn reset_connection(&self) {
        let mut connection = self.inner.connection.write().unwrap_or_else(|e| e.into_inner());
        if connection.take().is_some() {
            tracing::debug!("HTTP connection reset");
        }
    }

    /// Change the configuration and rebuild the cached authenticator and
    /// connection.
    ///
    /// The OAuth2 token client is rebuilt from the new timeouts and user agent
    /// unless one was supplied through [`ClientBuilder::token_http`].
    ///
    /// Fails if the new credentials are invalid; the new configuration stays in
    /// place and the next request retries the build.
    pub fn reconfigure(&self, f: impl FnOnce(&mut ClientConfig)) -> Result<()> {
        {
            let mut config = self.inner.config.write().unwrap_or_else(|e| e.into_inner());
            f(&mut config);
        }
        self.reset_connection();
        if !self.inner.token_http_override {
            let token_http = self.read_config().build_http()?;
            self.inner.selector.set_http(token_http);
        }
        self.reset_authenticator();
        self.authenticator()?;
        Ok(())
    }

    /// The memoized HTTP connection pool.
    fn connection(&self) -> Result<reqwest::Client> {
        if let Some(http) = self
            .inner
            .connection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Ok(http.clone());
        }

        let mut connection = self.inner.connection.write().unwrap_or_else(|e| e.into_inner());
        if let Some(http) = connection.as_ref() {
            return Ok(http.clone());
        }
        let http = self.read_config().build_http()?;
        *connection = Some(http.clone());
        Ok(http)
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.execute(Method::GET, path, params, None).await
    }

    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body)?;
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body)?;
        self.execute(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.execute(Method::DELETE, path, params, None).await
    }

    /// POST a resource model's wire representation.
    pub async fn post_resource<T: WireFormat>(&self, path: &str, resource: &T) -> Result<Response> {
        self.post(path, &Value::Object(resource.to_wire_format())).await
    }

    /// PUT a resource model's wire representation.
    pub async fn put_resource<T: WireFormat>(&self, path: &str, resource: &T) -> Result<Response> {
        self.put(path, &Value::Object(resource.to_wire_format())).await
    }

    /// Send one logical request, retrying per the configured policy.
    ///
    /// Credentials are applied afresh on every attempt so a token refreshed
    /// between attempts is picked up.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let (url, retry) = {
            let config = self.read_config();
            (config.endpoint(path, params)?, config.retry_policy())
        };
        let interceptor = AuthInterceptor::new(self.authenticator()?);
        let http = self.connection()?;

        tracing::debug!(
            method = %method,
            url = %url,
            strategy = interceptor.strategy().type_name(),
            "Sending request"
        );

        let (method_ref, url_ref, body_ref) = (&method, &url, body.as_deref());
        let (interceptor, http) = (&interceptor, &http);
        let raw = retry
            .execute(move || send_once(http, interceptor, method_ref, url_ref, body_ref))
            .await?;

        let response = Response::read(raw).await?;
        tracing::debug!(
            method = %method,
            url = %url,
            status = response.status(),
            "Received response"
        );
        response.into_result()
    }
}

/// One transmission: fresh headers, credentials, then the network call.
async fn send_once(
    http: &reqwest::Client,
    interceptor: &AuthInterceptor,
    method: &Method,
    url: &Url,
    body: Option<&[u8]>,
) -> Result<Attempt> {
    let mut ctx = RequestContext::new(method.clone(), url.clone());
    ctx.set_header(ACCEPT, JSON)?;
    if body.is_some() {
        ctx.set_header(CONTENT_TYPE, JSON)?;
    }
    interceptor.intercept(&mut ctx).await?;

    let (method, url, headers) = ctx.into_parts();
    let mut request = http.request(method, url).headers(headers);
    if let Some(body) = body {
        request = request.body(body.to_vec());
    }
    Ok(request.send().await)
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.read_config();
        f.debug_struct("Client")
            .field("base_url", &config.base_url.as_str())
            .field("auth_mode", &config.auth.mode)
            .finish()
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    strategy: Option<Arc<dyn AuthStrategy>>,
    token_http: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this strategy instead of one built from the auth configuration.
    pub fn auth_strategy(mut self, strategy: Arc<dyn AuthStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// HTTP client used for OAuth2 token requests.
    pub fn token_http(mut self, http: reqwest::Client) -> Self {
        self.token_http = Some(http);
        self
    }

    pub fn build(self) -> Result<Client> {
        let config = self.config.unwrap_or_default();
        let token_http_override = self.token_http.is_some();
        let token_http = match self.token_http {
            Some(http) => http,
            None => config.build_http()?,
        };

        let client = Client {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                selector: StrategySelector::new().with_http(token_http),
                strategy_override: self.strategy,
                token_http_override,
                connection: RwLock::new(None),
            }),
        };

        let strategy = client.authenticator()?;
        tracing::debug!(strategy = %strategy.describe(), "Petstore client created");
        Ok(client)
    }
}
