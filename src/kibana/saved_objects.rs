//! Saved object search by type
//!
//! Lists saved objects of any type with untyped attributes. Used by the
//! index data source to look up index patterns by title.

use super::saved_object::{ObjectVersion, SAVED_OBJECTS_PATH, SavedObject, WireFormat};
use crate::client::{HttpAgent, KBN_VERSION, KibanaClient, Result, VersionTable, version_at_least};
use crate::config::{
    Config, DEFAULT_KIBANA_VERSION_553, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_PER_PAGE: u32 = 20;

/// First version serving the `_find` endpoint.
pub const FIND_ENDPOINT_SINCE_VERSION: &str = "6.3.0";

pub type UntypedSavedObject = SavedObject<Map<String, Value>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedObjectQuery {
    pub object_type: String,
    pub fields: Vec<String>,
    pub per_page: u32,
}

impl SavedObjectQuery {
    pub fn builder() -> SavedObjectQueryBuilder {
        SavedObjectQueryBuilder::default()
    }
}

pub struct SavedObjectQueryBuilder {
    object_type: String,
    fields: Vec<String>,
    per_page: u32,
}

impl Default for SavedObjectQueryBuilder {
    fn default() -> Self {
        Self {
            object_type: String::new(),
            fields: Vec::new(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl SavedObjectQueryBuilder {
    pub fn with_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn build(self) -> SavedObjectQuery {
        SavedObjectQuery {
            object_type: self.object_type,
            fields: self.fields,
            per_page: self.per_page,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedObjectPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub saved_objects: Vec<UntypedSavedObject>,
}

#[async_trait]
pub trait SavedObjectsClient: Send + Sync {
    fn wire_format(&self) -> WireFormat;

    async fn get_by_type(&self, query: &SavedObjectQuery) -> Result<SavedObjectPage>;
}

pub struct ModernSavedObjectsClient {
    config: Arc<Config>,
    agent: HttpAgent,
}

impl ModernSavedObjectsClient {
    pub fn find_url(&self) -> String {
        if version_at_least(&self.config.kibana_version, FIND_ENDPOINT_SINCE_VERSION) {
            self.config
                .api_path(&format!("{}_find", SAVED_OBJECTS_PATH))
        } else {
            self.config.api_path(SAVED_OBJECTS_PATH)
        }
    }
}

#[async_trait]
impl SavedObjectsClient for ModernSavedObjectsClient {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Modern
    }

    async fn get_by_type(&self, query: &SavedObjectQuery) -> Result<SavedObjectPage> {
        let mut params = vec![("type", query.object_type.clone())];
        params.extend(query.fields.iter().map(|field| ("fields", field.clone())));
        params.push(("per_page", query.per_page.to_string()));

        let response = self
            .agent
            .get(self.find_url())
            .query(&params)
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error(format!(
                "Could not get saved objects of type {}",
                query.object_type
            )));
        }
        response.json("could not parse saved objects response")
    }
}

#[derive(Deserialize)]
struct LegacySearchResponse {
    hits: LegacyHits,
}

#[derive(Deserialize)]
struct LegacyHits {
    #[serde(default)]
    total: Value,
    #[serde(default)]
    hits: Vec<LegacyHit>,
}

#[derive(Deserialize)]
struct LegacyHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_type", default)]
    object_type: String,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

/// Version stored in a legacy document, `1` when the document has none.
fn legacy_version(source: &Map<String, Value>) -> ObjectVersion {
    match source.get("version") {
        Some(Value::Number(n)) => ObjectVersion::from(n.to_string().as_str()),
        Some(Value::String(s)) if !s.is_empty() => ObjectVersion::from(s.as_str()),
        _ => ObjectVersion::from(1),
    }
}

/// `hits.total` is a number on 5.x and `{"value": n}` on newer clusters.
fn legacy_total(total: &Value) -> u64 {
    match total {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::Object(o) => o.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

pub struct LegacySavedObjectsClient {
    config: Arc<Config>,
    agent: HttpAgent,
}

#[async_trait]
impl SavedObjectsClient for LegacySavedObjectsClient {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Legacy
    }

    async fn get_by_type(&self, query: &SavedObjectQuery) -> Result<SavedObjectPage> {
        let response = self
            .agent
            .post(
                self.config
                    .build_full_path(&format!("/{}/_search", query.object_type)),
            )
            .query(&[("size", query.per_page)])
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send_raw(r#"{"query":{"match_all":{}}}"#)
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error(format!(
                "Could not get saved objects of type {}",
                query.object_type
            )));
        }

        let found: LegacySearchResponse = response.json("could not parse saved objects response")?;
        let saved_objects = found
            .hits
            .hits
            .into_iter()
            .map(|hit| SavedObject {
                version: legacy_version(&hit.source),
                id: hit.id,
                object_type: hit.object_type,
                attributes: hit.source,
                references: Vec::new(),
            })
            .collect();

        Ok(SavedObjectPage {
            page: 1,
            per_page: query.per_page,
            total: legacy_total(&found.hits.total),
            saved_objects,
        })
    }
}

fn legacy(client: &KibanaClient) -> Box<dyn SavedObjectsClient> {
    Box::new(LegacySavedObjectsClient {
        config: client.shared_config(),
        agent: client.agent().clone(),
    })
}

fn modern(client: &KibanaClient) -> Box<dyn SavedObjectsClient> {
    Box::new(ModernSavedObjectsClient {
        config: client.shared_config(),
        agent: client.agent().clone(),
    })
}

pub static CLIENTS: VersionTable<dyn SavedObjectsClient> = VersionTable {
    capability: "saved objects",
    entries: &[
        (DEFAULT_KIBANA_VERSION_553, legacy),
        (DEFAULT_KIBANA_VERSION_6, modern),
        (DEFAULT_KIBANA_VERSION_7, modern),
    ],
    latest: (DEFAULT_KIBANA_VERSION_7, modern),
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder_defaults() {
        let query = SavedObjectQuery::builder().with_type("index-pattern").build();
        assert_eq!(query.per_page, DEFAULT_PER_PAGE);
        assert!(query.fields.is_empty());
    }

    #[test]
    fn test_legacy_version_defaults_to_one() {
        let source = json!({"title": "x"});
        assert_eq!(legacy_version(source.as_object().unwrap()).as_str(), "1");

        let source = json!({"title": "x", "version": 3});
        assert_eq!(legacy_version(source.as_object().unwrap()).as_str(), "3");
    }

    #[test]
    fn test_legacy_total_shapes() {
        assert_eq!(legacy_total(&json!(4)), 4);
        assert_eq!(legacy_total(&json!({"value": 7, "relation": "eq"})), 7);
        assert_eq!(legacy_total(&Value::Null), 0);
    }

    #[test]
    fn test_find_url_by_version() {
        let client =
            KibanaClient::try_new(Config::new("http://localhost:5601", "6.3.2")).unwrap();
        let modern = ModernSavedObjectsClient {
            config: client.shared_config(),
            agent: client.agent().clone(),
        };
        assert_eq!(
            modern.find_url(),
            "http://localhost:5601/api/saved_objects/_find"
        );

        let client =
            KibanaClient::try_new(Config::new("http://localhost:5601", "6.0.0")).unwrap();
        let older = ModernSavedObjectsClient {
            config: client.shared_config(),
            agent: client.agent().clone(),
        };
        assert_eq!(older.find_url(), "http://localhost:5601/api/saved_objects/");
    }

    #[test]
    fn test_page_parses() {
        let page: SavedObjectPage = serde_json::from_value(json!({
            "page": 1, "per_page": 20, "total": 1,
            "saved_objects": [{"id": "logstash-*", "type": "index-pattern", "version": 2,
                "attributes": {"title": "logstash-*"}}]
        }))
        .unwrap();
        assert_eq!(page.saved_objects.len(), 1);
        assert_eq!(page.saved_objects[0].attributes["title"], "logstash-*");
    }
}
