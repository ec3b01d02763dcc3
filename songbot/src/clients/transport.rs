use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Method, StatusCode};

use crate::clients::errors::{Error, Result};

/// Upper bound for every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider request, independent of the HTTP client that sends it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    /// Query parameters, encoded by the transport.
    pub query: Vec<(String, String)>,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Option<String>,
}

impl HttpRequest {
    /// `GET` request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// `POST` request for `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a provider answer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code as received.
    pub status: StatusCode,
    /// Body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Response with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    /// Only 200 counts as success for the providers this crate talks to.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Sends one request and returns whatever the provider answered.
/// Connection errors and timeouts come back as `Err`; any status is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request` once, without retries.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `Transport` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Use an existing client; its own timeout is overridden per request.
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }

    /// Fresh client with [`REQUEST_TIMEOUT`] applied.
    pub fn try_default() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(REQUEST_TIMEOUT);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Transport(format!("no answer within {REQUEST_TIMEOUT:?}"))
            } else {
                Error::Http(e)
            }
        })?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
