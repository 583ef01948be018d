//! REST API client.
//!
//! Only account registration is needed by the CLI; everything else happens
//! over the gateway.

use crate::error::AppError;
use derailed_gateway::ProxyConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Body of `POST /v1/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful registration response.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    /// Session token used to identify on the gateway
    pub token: String,
    /// Name the account was registered under
    pub username: String,
}

/// Client for the Derailed REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url`, optionally through an HTTP proxy.
    pub fn new(base_url: &str, proxy: Option<&ProxyConfig>) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            let mut http_proxy = reqwest::Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))?;
            if let Some(username) = proxy.username.as_deref() {
                http_proxy = http_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(http_proxy);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Registers a new account and returns its token.
    ///
    /// A non-success status is reported as [`AppError::Registration`] carrying
    /// the response body.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AppError> {
        let url = format!("{}/v1/register", self.base_url);
        debug!("📤 POST {} for {}", url, request.username);

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("⚠️ Registration rejected with {}", status);
            return Err(AppError::Registration(if body.is_empty() {
                status.to_string()
            } else {
                body
            }));
        }

        Ok(response.json::<RegisterResponse>().await?)
    }
}
