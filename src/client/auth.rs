//! Authentication handlers
//!
//! Every outgoing request passes through an [`AuthenticationHandler`] right
//! before it is sent. Which handler is active is decided once from the
//! [`Config`](crate::config::Config).

use super::error::{Error, Result};
use super::logzio::LogzioAuthenticationHandler;
use super::transport::HttpAgent;
use crate::config::Config;
use async_trait::async_trait;
use base64::Engine;
use reqwest::RequestBuilder;
use std::sync::Arc;

#[async_trait]
pub trait AuthenticationHandler: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Decorate the request with whatever the backend needs to accept it.
    async fn initialize(&self, request: RequestBuilder) -> Result<RequestBuilder>;

    /// Switch the authenticated session to another account.
    async fn change_account(&self, _account_id: &str, _agent: &HttpAgent) -> Result<()> {
        Err(Error::Unsupported("Changing account", self.name()))
    }
}

/// Leaves requests untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthenticationHandler;

#[async_trait]
impl AuthenticationHandler for NoAuthenticationHandler {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn initialize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(request)
    }
}

/// Adds an `Authorization: Basic` header.
#[derive(Clone)]
pub struct BasicAuthenticationHandler {
    header: String,
}

impl BasicAuthenticationHandler {
    pub fn new(username: &str, password: &str) -> Self {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
        Self {
            header: format!("Basic {}", credentials),
        }
    }
}

impl std::fmt::Debug for BasicAuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BasicAuthenticationHandler")
    }
}

#[async_trait]
impl AuthenticationHandler for BasicAuthenticationHandler {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn initialize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(request.header(reqwest::header::AUTHORIZATION, self.header.as_str()))
    }
}

/// Authentication scheme selected for a connection.
pub enum Auth {
    /// Username and password via Basic Auth headers
    Basic(String, String),
    /// Logz.io login handshake with session token
    Logzio,
    /// Don't use any authentication
    None,
}

impl Auth {
    /// Logz.io variants always use the handshake; vanilla uses Basic when
    /// both username and password are set.
    pub fn from_config(config: &Config) -> Self {
        let credentials = &config.credentials;
        if config.is_logzio() {
            Self::Logzio
        } else if credentials.has_basic() {
            Self::Basic(credentials.username.clone(), credentials.password.clone())
        } else {
            Self::None
        }
    }

    /// Build the handler for this scheme.
    pub fn into_handler(self, config: &Config) -> Result<Arc<dyn AuthenticationHandler>> {
        Ok(match self {
            Self::Basic(username, password) => {
                Arc::new(BasicAuthenticationHandler::new(&username, &password))
            }
            Self::Logzio => Arc::new(LogzioAuthenticationHandler::from_config(config)?),
            Self::None => Arc::new(NoAuthenticationHandler),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, KibanaType};

    #[test]
    fn test_auth_from_config() {
        let config = Config::new("http://localhost:5601", "6.0.0");
        assert!(matches!(Auth::from_config(&config), Auth::None));

        let config = config.with_credentials(Credentials {
            username: "elastic".to_string(),
            password: "changeme".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            Auth::from_config(&config),
            Auth::Basic(ref user, _) if user == "elastic"
        ));

        let config = config.with_type(KibanaType::Logzio);
        assert!(matches!(Auth::from_config(&config), Auth::Logzio));
    }

    #[test]
    fn test_username_alone_is_not_basic() {
        let config = Config::new("http://localhost:5601", "6.0.0").with_credentials(Credentials {
            username: "elastic".to_string(),
            ..Default::default()
        });
        assert!(matches!(Auth::from_config(&config), Auth::None));
    }

    #[test]
    fn test_basic_header_value() {
        let handler = BasicAuthenticationHandler::new("elastic", "changeme");
        assert_eq!(handler.header, "Basic ZWxhc3RpYzpjaGFuZ2VtZQ==");
    }

    #[tokio::test]
    async fn test_basic_header_applied() {
        let handler = BasicAuthenticationHandler::new("elastic", "changeme");
        let request = reqwest::Client::new().get("http://localhost:5601/api/status");
        let request = handler.initialize(request).await.unwrap().build().unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Basic ZWxhc3RpYzpjaGFuZ2VtZQ=="
        );
    }

    #[tokio::test]
    async fn test_change_account_unsupported() {
        let agent = HttpAgent::new(reqwest::Client::new(), Arc::new(NoAuthenticationHandler));
        let err = NoAuthenticationHandler
            .change_account("12345", &agent)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_, "none")));
    }
}
