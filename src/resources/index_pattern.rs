//! Index pattern resource

use super::{Resource, found};
use crate::client::KibanaClient;
use crate::kibana::{IndexPattern, IndexPatternAttributes, SavedObjectRequest};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPatternConfig {
    /// Falls back to the configured default index id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_field_name: String,
    /// Load the field list from the cluster after writing.
    #[serde(default)]
    pub refresh_fields: bool,
    /// Make this the default index pattern after writing.
    #[serde(default)]
    pub set_default: bool,
}

impl IndexPatternConfig {
    fn request(&self, client: &KibanaClient) -> SavedObjectRequest<IndexPatternAttributes> {
        let title = if self.title.is_empty() {
            client.config().default_index_id.clone()
        } else {
            self.title.clone()
        };
        SavedObjectRequest::new(IndexPatternAttributes::new(
            title,
            self.time_field_name.clone(),
        ))
    }

    /// The action flags are not stored in Kibana and read back as false.
    pub fn from_index_pattern(pattern: IndexPattern) -> Self {
        Self {
            title: pattern.attributes.title,
            time_field_name: pattern.attributes.time_field_name,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IndexPatternResource;

impl IndexPatternResource {
    async fn after_write(
        &self,
        client: &KibanaClient,
        id: &str,
        config: &IndexPatternConfig,
    ) -> Result<()> {
        let api = client.index_pattern();
        if config.refresh_fields {
            api.refresh_fields(id)
                .await
                .wrap_err_with(|| format!("failed to refresh fields of index pattern {}", id))?;
        }
        if config.set_default {
            api.set_default(id)
                .await
                .wrap_err_with(|| format!("failed to make {} the default index pattern", id))?;
        }
        Ok(())
    }
}

impl Resource for IndexPatternResource {
    const KIND: &'static str = "index-pattern";
    type Config = IndexPatternConfig;

    async fn create(&self, client: &KibanaClient, config: &IndexPatternConfig) -> Result<String> {
        let request = config.request(client);
        log::info!("Creating Kibana index pattern {}", request.attributes.title);
        let created = client
            .index_pattern()
            .create(&request)
            .await
            .wrap_err_with(|| {
                format!("failed to create index pattern {}", request.attributes.title)
            })?;
        self.after_write(client, &created.id, config).await?;
        Ok(created.id)
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<IndexPatternConfig>> {
        log::info!("Reading Kibana index pattern {}", id);
        let result = client.index_pattern().get_by_id(id).await;
        Ok(found(Self::KIND, id, result)?.map(IndexPatternConfig::from_index_pattern))
    }

    async fn update(
        &self,
        client: &KibanaClient,
        id: &str,
        config: &IndexPatternConfig,
    ) -> Result<()> {
        let api = client.index_pattern();
        let mut request = config.request(client);
        let current = api
            .get_by_id(id)
            .await
            .wrap_err_with(|| format!("failed to read index pattern {}", id))?;
        // The field list belongs to the title it was loaded for.
        if current.attributes.title == request.attributes.title {
            request.attributes.fields = current.attributes.fields;
        }

        log::info!("Updating Kibana index pattern {}", id);
        api.update(id, &request)
            .await
            .wrap_err_with(|| format!("failed to update index pattern {}", id))?;
        self.after_write(client, id, config).await
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana index pattern {}", id);
        client
            .index_pattern()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete index pattern {}", id))
    }
}
