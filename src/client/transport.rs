//! HTTP transport
//!
//! [`HttpAgent`] wraps a `reqwest::Client` together with the active
//! authentication handler. Every call to [`HttpAgent::get`] and friends hands
//! out a fresh [`AgentRequest`], so concurrent calls never share request
//! builder state. The handler gets to decorate each request right before it
//! is sent.

use super::auth::AuthenticationHandler;
use super::error::{Error, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Header Kibana uses to check client/server version compatibility.
pub const KBN_VERSION: &str = "kbn-version";

#[derive(Clone)]
pub struct HttpAgent {
    client: Client,
    auth: Arc<dyn AuthenticationHandler>,
    debug: bool,
}

impl HttpAgent {
    pub fn new(client: Client, auth: Arc<dyn AuthenticationHandler>) -> Self {
        Self {
            client,
            auth,
            debug: false,
        }
    }

    /// Log response bodies at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn auth(&self) -> &Arc<dyn AuthenticationHandler> {
        &self.auth
    }

    pub fn request(&self, method: Method, url: impl Into<String>) -> AgentRequest {
        AgentRequest {
            agent: self.clone(),
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(&self, url: impl Into<String>) -> AgentRequest {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl Into<String>) -> AgentRequest {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: impl Into<String>) -> AgentRequest {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> AgentRequest {
        self.request(Method::DELETE, url)
    }
}

impl std::fmt::Debug for HttpAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAgent")
            .field("auth", &self.auth.name())
            .field("debug", &self.debug)
            .finish()
    }
}

/// A single outgoing request, owned by exactly one call site.
pub struct AgentRequest {
    agent: HttpAgent,
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl AgentRequest {
    /// Set a request header.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append query-string parameters. Repeated keys are kept.
    pub fn query<K, V>(mut self, pairs: &[(K, V)]) -> Self
    where
        K: ToString,
        V: ToString,
    {
        self.query
            .extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn send<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            Error::Precondition(format!("could not serialize request to {}: {}", self.url, e))
        })?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Use an already-encoded JSON string as the request body.
    pub fn send_raw(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into().into_bytes());
        self
    }

    /// Let the authentication handler decorate the request, then send it.
    pub async fn end(self) -> Result<Response> {
        let url = Url::parse(&self.url)?;
        let mut builder = self.agent.client.request(self.method.clone(), url);

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = self.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let builder = self.agent.auth.initialize(builder).await?;

        log::debug!("{} {}", self.method, self.url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        log::debug!("{} {} -> {}", self.method, self.url, status);
        if self.agent.debug {
            log::debug!("Response body: {}", body);
        }

        Ok(Response {
            method: self.method,
            url: self.url,
            status,
            headers,
            body,
        })
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    /// Anything below 300 counts as success.
    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    /// Wrap this response as a backend application error.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::Api {
            method: self.method.to_string(),
            url: self.url.clone(),
            status: self.status,
            body: self.body.clone(),
            message: message.into(),
        }
    }

    /// Wrap this response as a not-found condition.
    pub fn not_found(&self, message: impl Into<String>) -> Error {
        Error::NotFound {
            url: self.url.clone(),
            status: self.status,
            body: self.body.clone(),
            message: message.into(),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::decode(context, &self.body, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::auth::NoAuthenticationHandler;

    fn response(status: u16, body: &str) -> Response {
        Response {
            method: Method::GET,
            url: "http://localhost:5601/api/status".to_string(),
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_is_success() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(!response(300, "").is_success());
        assert!(!response(404, "").is_success());
    }

    #[test]
    fn test_error_carries_context() {
        let err = response(500, "boom").error("Could not fetch search");
        let message = err.to_string();
        assert!(message.contains("GET"));
        assert!(message.contains("Code: 500"));
        assert!(message.contains("boom"));
        assert!(message.contains("Could not fetch search"));
    }

    #[test]
    fn test_json_decode_error_keeps_body() {
        let err = response(200, "not json")
            .json::<serde_json::Value>("could not parse status")
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("not json"));
    }

    #[test]
    fn test_requests_are_independent() {
        let agent = HttpAgent::new(Client::new(), Arc::new(NoAuthenticationHandler));
        let first = agent.get("http://localhost/a").set("x-one", "1");
        let second = agent.get("http://localhost/b");
        assert_eq!(first.headers.len(), 1);
        assert!(second.headers.is_empty());
    }
}
