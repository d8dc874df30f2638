//! `reqwest` implementation of [`HttpBackend`]

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;

use super::shared_resources::global_http_client;
use super::{BackendError, BackendErrorKind, HttpBackend, RawResponse};

/// Production backend issuing GET requests through a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Arc<Client>,
}

impl ReqwestBackend {
    /// Backend on an explicit client
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Backend on the process-wide client
    pub fn shared() -> Self {
        Self::new(global_http_client())
    }
}

fn backend_error(e: reqwest::Error) -> BackendError {
    let kind = if e.is_timeout() {
        BackendErrorKind::Timeout
    } else if e.is_connect() {
        BackendErrorKind::Connect
    } else {
        BackendErrorKind::Other
    };
    BackendError {
        kind,
        message: e.to_string(),
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str, user_agent: &str) -> Result<RawResponse, BackendError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(backend_error)?;

        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(backend_error)?;
        Ok(RawResponse { status_code, body })
    }
}
