//! Kibana client module
//!
//! Provides `KibanaClient`, the entry point that hands out one client per
//! capability, already matched to the configured backend version.

use super::auth::{Auth, AuthenticationHandler};
use super::error::Result;
use super::transport::{HttpAgent, Response};
use crate::config::Config;
use crate::kibana::dashboard::{self, DashboardClient};
use crate::kibana::index_pattern::{self, IndexPatternClient};
use crate::kibana::role::{self, RoleClient};
use crate::kibana::saved_objects::{self, SavedObjectsClient};
use crate::kibana::search::{self, SearchClient};
use crate::kibana::space::{self, SpaceClient};
use crate::kibana::visualization::{self, VisualizationClient};
use reqwest::Client;
use std::sync::Arc;

/// Kibana client for making API requests.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// authentication handler (and with it any cached session).
///
/// # Example
/// ```no_run
/// use kibana_provisioner::client::KibanaClient;
/// use kibana_provisioner::config::Config;
/// use kibana_provisioner::kibana::SavedObjectClient;
///
/// # async fn example() -> eyre::Result<()> {
/// let client = KibanaClient::try_new(Config::new("http://localhost:5601", "7.3.1"))?;
/// let searches = client.search().list().await?;
/// println!("{} saved searches", searches.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct KibanaClient {
    config: Arc<Config>,
    agent: HttpAgent,
}

impl KibanaClient {
    /// Create a client whose authentication handler is picked from the config.
    pub fn try_new(config: Config) -> Result<Self> {
        let handler = Auth::from_config(&config).into_handler(&config)?;
        Self::with_auth(config, handler)
    }

    /// Create a client with an explicit authentication handler.
    pub fn with_auth(config: Config, handler: Arc<dyn AuthenticationHandler>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("kbn-xsrf", reqwest::header::HeaderValue::from_static("true"));
        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        log::debug!(
            "Kibana client for {} ({} {}) using {} auth",
            config.kibana_base_uri,
            config.kibana_type,
            config.kibana_version,
            handler.name()
        );
        let agent = HttpAgent::new(client, handler).with_debug(config.debug);
        Ok(Self {
            config: Arc::new(config),
            agent,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn shared_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn agent(&self) -> &HttpAgent {
        &self.agent
    }

    /// Switch the authenticated session to another account.
    pub async fn change_account(&self, account_id: &str) -> Result<()> {
        self.agent.auth().change_account(account_id, &self.agent).await
    }

    /// Verify the connection and authentication to Kibana.
    pub async fn test_connection(&self) -> Result<Response> {
        let response = self
            .agent
            .get(self.config.api_path("/api/status"))
            .end()
            .await?;
        if !response.is_success() {
            return Err(response.error("Kibana status check failed"));
        }
        Ok(response)
    }

    pub fn search(&self) -> Box<dyn SearchClient> {
        search::CLIENTS.build(self)
    }

    pub fn visualization(&self) -> Box<dyn VisualizationClient> {
        visualization::CLIENTS.build(self)
    }

    pub fn dashboard(&self) -> Box<dyn DashboardClient> {
        dashboard::CLIENTS.build(self)
    }

    pub fn index_pattern(&self) -> Box<dyn IndexPatternClient> {
        index_pattern::CLIENTS.build(self)
    }

    pub fn saved_objects(&self) -> Box<dyn SavedObjectsClient> {
        saved_objects::CLIENTS.build(self)
    }

    pub fn role(&self) -> Box<dyn RoleClient> {
        role::CLIENTS.build(self)
    }

    pub fn space(&self) -> Box<dyn SpaceClient> {
        space::CLIENTS.build(self)
    }
}

impl std::fmt::Display for KibanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.config.kibana_base_uri, self.config.kibana_type, self.config.kibana_version
        )
    }
}
