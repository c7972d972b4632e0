//! Process-wide Kibana client
//!
//! The host may run its configure hook more than once. Only the first call
//! builds a client (and switches account when asked to); later calls get the
//! same client back.

use crate::client::KibanaClient;
use crate::config::Config;
use eyre::{Result, WrapErr};
use tokio::sync::OnceCell;

#[derive(Debug, Default)]
pub struct Provider {
    client: OnceCell<KibanaClient>,
}

impl Provider {
    pub const fn new() -> Self {
        Self {
            client: OnceCell::const_new(),
        }
    }

    /// Build the client from `config` unless one exists already.
    pub async fn configure(&self, config: Config) -> Result<&KibanaClient> {
        self.client
            .get_or_try_init(|| async move {
                let account_id = config.credentials.logzio_account_id.clone();
                let switch_account = config.is_logzio() && !account_id.is_empty();

                let client =
                    KibanaClient::try_new(config).wrap_err("failed to create kibana client")?;
                log::info!("Configured Kibana client for {}", client);

                if switch_account {
                    log::info!("Switching to account {}", account_id);
                    client
                        .change_account(&account_id)
                        .await
                        .wrap_err_with(|| format!("failed to switch to account {}", account_id))?;
                }
                Ok(client)
            })
            .await
    }

    pub fn client(&self) -> Result<&KibanaClient> {
        self.client
            .get()
            .ok_or_else(|| eyre::eyre!("kibana provider is not configured"))
    }

    pub fn is_configured(&self) -> bool {
        self.client.initialized()
    }

    /// Drop the client so the next `configure` builds a new one.
    pub fn reset(&mut self) -> Option<KibanaClient> {
        self.client.take()
    }
}
