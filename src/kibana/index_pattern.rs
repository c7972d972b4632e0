//! Index patterns
//!
//! Besides the saved object operations an index pattern can be made the
//! default one and can have its cached field list refreshed from the
//! cluster mapping.

use super::saved_object::{
    LegacyApi, ModernApi, SavedObject, SavedObjectClient, SavedObjectRequest, WireFormat,
};
use crate::client::{HttpAgent, KBN_VERSION, KibanaClient, Result, VersionTable};
use crate::config::{
    Config, DEFAULT_KIBANA_VERSION_553, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const INDEX_PATTERN_TYPE: &str = "index-pattern";

/// Meta fields requested alongside the mapped fields.
pub const META_FIELDS: &str = r#"["_source","_id","_type","_index","_score"]"#;

pub type IndexPattern = SavedObject<IndexPatternAttributes>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPatternAttributes {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_field_name: String,
    /// Encoded JSON array of field descriptors.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fields: String,
}

impl IndexPatternAttributes {
    pub fn new(title: impl Into<String>, time_field_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            time_field_name: time_field_name.into(),
            fields: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct FieldsForWildcard {
    #[serde(default)]
    fields: Vec<serde_json::Value>,
}

/// Native endpoints shared by both wire formats.
pub struct IndexPatternSettings {
    config: Arc<Config>,
    agent: HttpAgent,
}

impl IndexPatternSettings {
    fn new(client: &KibanaClient) -> Self {
        Self {
            config: client.shared_config(),
            agent: client.agent().clone(),
        }
    }

    pub async fn set_default(&self, id: &str) -> Result<()> {
        let response = self
            .agent
            .post(self.config.api_path("/api/kibana/settings/defaultIndex"))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(&serde_json::json!({ "value": id }))?
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error("Could not set default index pattern"));
        }
        log::info!("Default index pattern is now {}", id);
        Ok(())
    }

    /// Field descriptors for every index matching `pattern`, encoded as the
    /// JSON string an index pattern stores.
    pub async fn fields_for_wildcard(&self, pattern: &str) -> Result<String> {
        let response = self
            .agent
            .get(self.config.api_path("/api/index_patterns/_fields_for_wildcard"))
            .query(&[("pattern", pattern), ("meta_fields", META_FIELDS)])
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error(format!("Could not fetch fields for {}", pattern)));
        }

        let found: FieldsForWildcard =
            response.json("could not parse fields for wildcard response")?;
        log::debug!("{} fields match {}", found.fields.len(), pattern);
        serde_json::to_string(&found.fields).map_err(|e| {
            crate::client::Error::Precondition(format!("could not encode fields: {}", e))
        })
    }
}

#[async_trait]
pub trait IndexPatternClient: SavedObjectClient<IndexPatternAttributes> {
    fn settings(&self) -> &IndexPatternSettings;

    /// Make this index pattern the default one.
    async fn set_default(&self, id: &str) -> Result<()> {
        self.settings().set_default(id).await
    }

    /// Re-read the field list from the cluster and store it on the pattern.
    async fn refresh_fields(&self, id: &str) -> Result<IndexPattern> {
        let current = self.get_by_id(id).await?;
        let fields = self
            .settings()
            .fields_for_wildcard(&current.attributes.title)
            .await?;

        let attributes = IndexPatternAttributes {
            fields,
            ..current.attributes
        };
        self.update(id, &SavedObjectRequest::new(attributes)).await
    }
}

pub struct ModernIndexPatternClient {
    api: ModernApi<IndexPatternAttributes>,
    settings: IndexPatternSettings,
}

#[async_trait]
impl SavedObjectClient<IndexPatternAttributes> for ModernIndexPatternClient {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Modern
    }

    async fn create(
        &self,
        request: &SavedObjectRequest<IndexPatternAttributes>,
    ) -> Result<IndexPattern> {
        self.api.create(request).await
    }

    async fn get_by_id(&self, id: &str) -> Result<IndexPattern> {
        self.api.get_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<IndexPattern>> {
        self.api.list().await
    }

    async fn update(
        &self,
        id: &str,
        request: &SavedObjectRequest<IndexPatternAttributes>,
    ) -> Result<IndexPattern> {
        self.api.update(id, request).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.api.delete(id).await
    }
}

impl IndexPatternClient for ModernIndexPatternClient {
    fn settings(&self) -> &IndexPatternSettings {
        &self.settings
    }
}

/// Legacy index patterns are keyed by their title.
pub struct LegacyIndexPatternClient {
    api: LegacyApi<IndexPatternAttributes>,
    settings: IndexPatternSettings,
}

#[derive(Deserialize)]
struct LegacyCreateResult {
    #[serde(rename = "_id")]
    id: String,
}

#[async_trait]
impl SavedObjectClient<IndexPatternAttributes> for LegacyIndexPatternClient {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Legacy
    }

    async fn create(
        &self,
        request: &SavedObjectRequest<IndexPatternAttributes>,
    ) -> Result<IndexPattern> {
        let title = &request.attributes.title;
        let url = format!("{}/_create", self.api.document_url(title));
        let response = self.api.write_document(url, &request.attributes).await?;

        let id = if response.status == 409 {
            log::info!("Index pattern {} already exists", title);
            title.clone()
        } else if !response.is_success() {
            return Err(response.error("Could not create index-pattern"));
        } else {
            let created: LegacyCreateResult =
                response.json("could not parse fields from index pattern create response")?;
            created.id
        };
        self.api.get_by_id(&id).await
    }

    async fn get_by_id(&self, id: &str) -> Result<IndexPattern> {
        self.api.get_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<IndexPattern>> {
        self.api.list().await
    }

    async fn update(
        &self,
        id: &str,
        request: &SavedObjectRequest<IndexPatternAttributes>,
    ) -> Result<IndexPattern> {
        self.api.update(id, request).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.api.delete(id).await
    }
}

impl IndexPatternClient for LegacyIndexPatternClient {
    fn settings(&self) -> &IndexPatternSettings {
        &self.settings
    }
}

fn legacy(client: &KibanaClient) -> Box<dyn IndexPatternClient> {
    Box::new(LegacyIndexPatternClient {
        api: LegacyApi::new(client, INDEX_PATTERN_TYPE),
        settings: IndexPatternSettings::new(client),
    })
}

fn modern(client: &KibanaClient) -> Box<dyn IndexPatternClient> {
    Box::new(ModernIndexPatternClient {
        api: ModernApi::new(client, INDEX_PATTERN_TYPE),
        settings: IndexPatternSettings::new(client),
    })
}

pub static CLIENTS: VersionTable<dyn IndexPatternClient> = VersionTable {
    capability: INDEX_PATTERN_TYPE,
    entries: &[
        (DEFAULT_KIBANA_VERSION_553, legacy),
        (DEFAULT_KIBANA_VERSION_6, modern),
        (DEFAULT_KIBANA_VERSION_7, modern),
    ],
    latest: (DEFAULT_KIBANA_VERSION_7, modern),
};
