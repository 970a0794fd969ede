//! Stream URL resolution
//!
//! Two sequential lookups: the device's public IP from an IP-echo service,
//! then the stream URL from the application backend, which receives the
//! client IP and the caller's user-agent as request headers.
//! Single attempt per step, no retries.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::ResolvedEndpoint;

/// Header carrying the resolved client IP to the backend
pub const CLIENT_IP_HEADER: &str = "x-client-ip";

/// Which of the two lookups failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    IpLookup,
    Backend,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStage::IpLookup => write!(f, "IP lookup"),
            ResolutionStage::Backend => write!(f, "stream backend"),
        }
    }
}

/// Resolution error types
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("IP lookup request failed: {0}")]
    IpLookupRequest(#[source] reqwest::Error),

    #[error("IP service responded with status: {0}")]
    IpLookupStatus(u16),

    #[error("Could not parse IP address from IP service response")]
    MissingIp,

    #[error("Stream backend request failed: {0}")]
    BackendRequest(#[source] reqwest::Error),

    #[error("Stream backend responded with status: {0}")]
    BackendStatus(u16),

    #[error("Backend response did not contain a valid stream_url")]
    MissingStreamUrl,

    #[error("Malformed {stage} response: {message}")]
    InvalidResponse {
        stage: ResolutionStage,
        message: String,
    },
}

impl ResolutionError {
    pub fn stage(&self) -> ResolutionStage {
        match self {
            ResolutionError::IpLookupRequest(_)
            | ResolutionError::IpLookupStatus(_)
            | ResolutionError::MissingIp => ResolutionStage::IpLookup,
            ResolutionError::BackendRequest(_)
            | ResolutionError::BackendStatus(_)
            | ResolutionError::MissingStreamUrl => ResolutionStage::Backend,
            ResolutionError::InvalidResponse { stage, .. } => *stage,
        }
    }
}

/// Anything that can turn a user-agent into a playable endpoint
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, user_agent: &str) -> Result<ResolvedEndpoint, ResolutionError>;
}

/// IP-echo service response
#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: Option<String>,
}

/// Application backend response
#[derive(Debug, Deserialize)]
struct StreamUrlResponse {
    stream_url: Option<String>,
}

/// HTTP-backed resolver
pub struct StreamResolver {
    ip_service_url: String,
    backend_url: String,
    device_class: String,
    client: reqwest::Client,
}

impl StreamResolver {
    /// Create a resolver from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            ip_service_url: config.ip_service_url.clone(),
            backend_url: config.backend_url.clone(),
            device_class: config.device_class.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a resolver against custom endpoints (for testing)
    pub fn with_urls(ip_service_url: impl Into<String>, backend_url: impl Into<String>) -> Self {
        Self {
            ip_service_url: ip_service_url.into(),
            backend_url: backend_url.into(),
            ..Self::new(&Config::default())
        }
    }

    /// Fetch the device's public IP address
    pub async fn lookup_client_ip(&self) -> Result<String, ResolutionError> {
        let response = self
            .client
            .get(&self.ip_service_url)
            .send()
            .await
            .map_err(ResolutionError::IpLookupRequest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::IpLookupStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(ResolutionError::IpLookupRequest)?;
        let data: IpResponse =
            serde_json::from_str(&body).map_err(|e| ResolutionError::InvalidResponse {
                stage: ResolutionStage::IpLookup,
                message: e.to_string(),
            })?;

        match data.ip {
            Some(ip) if !ip.is_empty() => Ok(ip),
            _ => Err(ResolutionError::MissingIp),
        }
    }

    /// Ask the backend for the stream URL assigned to this client
    pub async fn fetch_stream_url(
        &self,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<String, ResolutionError> {
        let response = self
            .client
            .get(&self.backend_url)
            .query(&[("device", self.device_class.as_str())])
            .header(CLIENT_IP_HEADER, client_ip)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(ResolutionError::BackendRequest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::BackendStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(ResolutionError::BackendRequest)?;
        let data: StreamUrlResponse =
            serde_json::from_str(&body).map_err(|e| ResolutionError::InvalidResponse {
                stage: ResolutionStage::Backend,
                message: e.to_string(),
            })?;

        match data.stream_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ResolutionError::MissingStreamUrl),
        }
    }
}

impl Default for StreamResolver {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[async_trait]
impl EndpointResolver for StreamResolver {
    async fn resolve(&self, user_agent: &str) -> Result<ResolvedEndpoint, ResolutionError> {
        let client_ip = self.lookup_client_ip().await?;
        debug!(client_ip = %client_ip, "Client IP resolved");

        let stream_url = self.fetch_stream_url(&client_ip, user_agent).await?;
        info!(url = %stream_url, "Stream URL resolved");

        Ok(ResolvedEndpoint {
            client_ip,
            stream_url,
        })
    }
}
