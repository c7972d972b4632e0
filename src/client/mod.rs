//! Kibana API client and authentication.
//!
//! This module provides the [`KibanaClient`] for interacting with the Kibana API,
//! the HTTP transport it sends requests through, the authentication handlers
//! ([`NoAuthenticationHandler`], [`BasicAuthenticationHandler`],
//! [`LogzioAuthenticationHandler`]) and the per-capability version dispatch.

mod auth;
pub mod dispatch;
mod error;
mod kibana;
mod logzio;
mod transport;

pub use auth::{
    Auth, AuthenticationHandler, BasicAuthenticationHandler, NoAuthenticationHandler,
};
pub use dispatch::{VersionTable, parse_version, version_at_least};
pub use error::{Error, Result};
pub use kibana::KibanaClient;
pub use logzio::{
    LogzioAuthenticationHandler, OneTimeCode, SessionState, Totp, extract_csrf_token,
};
pub use transport::{AgentRequest, HttpAgent, KBN_VERSION, Response};
