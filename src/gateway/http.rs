//! HTTP implementation of the remote session gateway
//!
//! Routes, relative to the configured base URL:
//!
//! - `GET    /sessions`              -- list
//! - `POST   /sessions`              -- create
//! - `PATCH  /sessions/{id}`         -- update title
//! - `DELETE /sessions/{id}`         -- delete
//! - `POST   /sessions/{id}/messages` -- append a message
//! - `POST   /sessions/{id}/title`   -- generate a title
//!
//! Any non-success status is turned into [`ChatsyncError::GatewayStatus`]
//! carrying the response body text.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{
    AddMessageRequest, CreateSessionRequest, CreatedSession, GeneratedTitle, RemoteSession,
    SessionGateway, UpdateSessionRequest,
};
use crate::error::{ChatsyncError, Result};

/// Session gateway speaking JSON over HTTP
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use url::Url;
/// use chatsync::gateway::HttpSessionGateway;
///
/// let gateway = HttpSessionGateway::new(
///     Url::parse("http://localhost:8080/api").unwrap(),
///     HashMap::new(),
///     Duration::from_secs(30),
/// )
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpSessionGateway {
    /// Underlying reqwest HTTP client.
    client: reqwest::Client,
    /// Base URL every route is joined onto.
    base_url: url::Url,
    /// Static extra headers merged into every request.
    headers: HashMap<String, String>,
}

impl HttpSessionGateway {
    /// Construct a gateway targeting `base_url`.
    ///
    /// The `timeout` applies to each individual HTTP request. No network I/O
    /// is performed at construction time.
    pub fn new(
        base_url: url::Url,
        headers: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatsyncError::Gateway(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            headers,
        })
    }

    /// Base URL this gateway talks to
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ChatsyncError::Config(format!("Base URL cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!("Gateway request {} {}", method, url);

        let mut req = self.client.request(method, url);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        Ok(req)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req
            .send()
            .await
            .map_err(|e| ChatsyncError::Gateway(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Gateway returned error {}: {}", status, body);
            return Err(ChatsyncError::GatewayStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = self.send(req).await?;
        let value = response
            .json::<T>()
            .await
            .map_err(|e| ChatsyncError::Gateway(format!("Failed to parse response: {}", e)))?;
        Ok(value)
    }
}

#[async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn list(&self) -> Result<Vec<RemoteSession>> {
        let req = self.request(Method::GET, &["sessions"])?;
        self.send_json(req).await
    }

    async fn create(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let req = self.request(Method::POST, &["sessions"])?.json(&request);
        self.send_json(req).await
    }

    async fn update(&self, id: &str, request: UpdateSessionRequest) -> Result<()> {
        let req = self.request(Method::PATCH, &["sessions", id])?.json(&request);
        self.send(req).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &["sessions", id])?;
        self.send(req).await?;
        Ok(())
    }

    async fn add_message(&self, request: AddMessageRequest) -> Result<()> {
        let req = self
            .request(Method::POST, &["sessions", request.session_id.as_str(), "messages"])?
            .json(&request);
        self.send(req).await?;
        Ok(())
    }

    async fn generate_title(&self, id: &str) -> Result<GeneratedTitle> {
        let req = self.request(Method::POST, &["sessions", id, "title"])?;
        self.send_json(req).await
    }
}
