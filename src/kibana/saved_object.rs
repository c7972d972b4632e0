//! Saved object wire formats
//!
//! Searches, visualizations, dashboards and index patterns share one
//! envelope (`id`, `type`, `version`, `attributes`, `references`) and one set
//! of operations. Two wire formats implement those operations:
//!
//! - [`LegacyApi`]: raw documents written through the Elasticsearch proxy
//!   path (`{es_path}/{type}/{id}`), as used by 5.x
//! - [`ModernApi`]: the native saved objects API (`/api/saved_objects/...`)
//!
//! The per-kind modules only add the kind-specific attributes and builders.

use crate::client::{Error, HttpAgent, KBN_VERSION, KibanaClient, Response, Result};
use crate::config::Config;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

pub const SAVED_OBJECTS_PATH: &str = "/api/saved_objects/";
pub const FIND_PAGE_SIZE: u32 = 9999;

/// Attribute payloads that can travel in a saved object envelope.
pub trait Attributes: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Attributes for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Which wire format a client speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Legacy,
    Modern,
}

/// Opaque version marker. Older backends send an integer, newer ones a
/// string; both are accepted and kept as text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectVersion(String);

impl ObjectVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<i64> for ObjectVersion {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ObjectVersion {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Self::from(value),
            Raw::Text(value) => Self(value),
            Raw::Null(()) => Self::default(),
        })
    }
}

/// Kinds of saved object a reference may point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceType {
    Search,
    Visualization,
    #[serde(alias = "index")]
    IndexPattern,
    Dashboard,
    Tag,
    Lens,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Visualization => "visualization",
            Self::IndexPattern => "index-pattern",
            Self::Dashboard => "dashboard",
            Self::Tag => "tag",
            Self::Lens => "lens",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "search" => Ok(Self::Search),
            "visualization" => Ok(Self::Visualization),
            "index-pattern" | "index" => Ok(Self::IndexPattern),
            "dashboard" => Ok(Self::Dashboard),
            "tag" => Ok(Self::Tag),
            "lens" => Ok(Self::Lens),
            other => Err(Error::Precondition(format!(
                "unknown reference type '{}'",
                other
            ))),
        }
    }
}

/// Named pointer from one saved object to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    pub id: String,
}

impl Reference {
    pub fn new(name: impl Into<String>, reference_type: ReferenceType, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_type,
            id: id.into(),
        }
    }
}

/// Reject references whose type is not valid for the owning kind.
pub fn validate_references(
    kind: &str,
    references: &[Reference],
    allowed: &[ReferenceType],
) -> Result<()> {
    match references
        .iter()
        .find(|r| !allowed.contains(&r.reference_type))
    {
        Some(reference) => Err(Error::Precondition(format!(
            "{} references may not point at '{}' (reference '{}'), allowed: {}",
            kind,
            reference.reference_type,
            reference.name,
            allowed
                .iter()
                .map(ReferenceType::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        None => Ok(()),
    }
}

/// The `kibanaSavedObjectMeta` block carrying an encoded search source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KibanaSavedObjectMeta {
    #[serde(rename = "searchSourceJSON", default)]
    pub search_source_json: String,
}

impl KibanaSavedObjectMeta {
    pub fn new(search_source_json: impl Into<String>) -> Self {
        Self {
            search_source_json: search_source_json.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedObject<A> {
    pub id: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub version: ObjectVersion,
    pub attributes: A,
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// Body of a create or update call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedObjectRequest<A> {
    pub attributes: A,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

impl<A> SavedObjectRequest<A> {
    pub fn new(attributes: A) -> Self {
        Self {
            attributes,
            references: Vec::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }
}

#[async_trait]
pub trait SavedObjectClient<A: Attributes>: Send + Sync {
    fn wire_format(&self) -> WireFormat;

    async fn create(&self, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>>;

    async fn get_by_id(&self, id: &str) -> Result<SavedObject<A>>;

    /// Every object of this kind. Not available on the legacy format.
    async fn list(&self) -> Result<Vec<SavedObject<A>>>;

    async fn update(&self, id: &str, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Map a failed read to an error. A 404 is always not-found. The hosted
/// variant answers 400 or 500 for objects that do not exist, so on that
/// variant every 4xx/5xx counts as not-found too.
pub fn read_error(response: &Response, config: &Config, message: impl Into<String>) -> Error {
    if response.status == 404 || (config.is_logzio() && response.status >= 400) {
        response.not_found(message)
    } else {
        response.error(message)
    }
}

/// Map a failed delete to an error; only a real 404 is not-found.
pub fn delete_error(response: &Response, message: impl Into<String>) -> Error {
    if response.status == 404 {
        response.not_found(message)
    } else {
        response.error(message)
    }
}

#[derive(Deserialize)]
struct FindResponse<A> {
    saved_objects: Vec<SavedObject<A>>,
}

/// Client for the native saved objects API.
pub struct ModernApi<A> {
    config: Arc<Config>,
    agent: HttpAgent,
    object_type: &'static str,
    _attributes: PhantomData<fn() -> A>,
}

impl<A: Attributes> ModernApi<A> {
    pub fn new(client: &KibanaClient, object_type: &'static str) -> Self {
        Self {
            config: client.shared_config(),
            agent: client.agent().clone(),
            object_type,
            _attributes: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agent(&self) -> &HttpAgent {
        &self.agent
    }

    fn collection_url(&self) -> String {
        self.config
            .api_path(&format!("{}{}", SAVED_OBJECTS_PATH, self.object_type))
    }

    fn object_url(&self, id: &str) -> String {
        self.config
            .api_path(&format!("{}{}/{}", SAVED_OBJECTS_PATH, self.object_type, id))
    }

    async fn write(
        &self,
        url: String,
        request: &SavedObjectRequest<A>,
        action: &str,
    ) -> Result<SavedObject<A>> {
        let response = self
            .agent
            .post(url)
            .query(&[("overwrite", "true")])
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(request)?
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error(format!("Could not {} {}", action, self.object_type)));
        }

        response.json(&format!(
            "could not parse fields from {} {} response",
            action, self.object_type
        ))
    }
}

#[async_trait]
impl<A: Attributes> SavedObjectClient<A> for ModernApi<A> {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Modern
    }

    async fn create(&self, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>> {
        let created = self.write(self.collection_url(), request, "create").await?;
        log::debug!("Created {} {}", self.object_type, created.id);
        Ok(created)
    }

    async fn get_by_id(&self, id: &str) -> Result<SavedObject<A>> {
        let response = self
            .agent
            .get(self.object_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(read_error(
                &response,
                &self.config,
                format!("Could not fetch {}", self.object_type),
            ));
        }

        response.json(&format!(
            "could not parse fields from get {} response",
            self.object_type
        ))
    }

    async fn list(&self) -> Result<Vec<SavedObject<A>>> {
        let response = self
            .agent
            .get(self.config.api_path(&format!("{}_find", SAVED_OBJECTS_PATH)))
            .query(&[
                ("type", self.object_type.to_string()),
                ("per_page", FIND_PAGE_SIZE.to_string()),
            ])
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error(format!("Could not list {}", self.object_type)));
        }

        let found: FindResponse<A> = response.json(&format!(
            "could not parse fields from list {} response",
            self.object_type
        ))?;
        Ok(found.saved_objects)
    }

    async fn update(&self, id: &str, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>> {
        self.write(self.object_url(id), request, "update").await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .agent
            .delete(self.object_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(delete_error(
                &response,
                format!("Could not delete {}", self.object_type),
            ));
        }
        log::debug!("Deleted {} {}", self.object_type, id);
        Ok(())
    }
}

#[derive(Deserialize)]
struct LegacyWriteResult {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct LegacyDocument<A> {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_type", default)]
    object_type: String,
    #[serde(rename = "_version", default)]
    version: ObjectVersion,
    #[serde(rename = "_source")]
    source: A,
}

impl<A> From<LegacyDocument<A>> for SavedObject<A> {
    fn from(document: LegacyDocument<A>) -> Self {
        Self {
            id: document.id,
            object_type: document.object_type,
            version: document.version,
            attributes: document.source,
            references: Vec::new(),
        }
    }
}

/// Client writing raw documents through the Elasticsearch proxy path.
pub struct LegacyApi<A> {
    config: Arc<Config>,
    agent: HttpAgent,
    object_type: &'static str,
    _attributes: PhantomData<fn() -> A>,
}

impl<A: Attributes> LegacyApi<A> {
    pub fn new(client: &KibanaClient, object_type: &'static str) -> Self {
        Self {
            config: client.shared_config(),
            agent: client.agent().clone(),
            object_type,
            _attributes: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agent(&self) -> &HttpAgent {
        &self.agent
    }

    pub fn document_url(&self, id: &str) -> String {
        self.config
            .build_full_path(&format!("/{}/{}", self.object_type, id))
    }

    /// Write the bare attributes as a document at `url`.
    pub async fn write_document(&self, url: String, attributes: &A) -> Result<Response> {
        self.agent
            .post(url)
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(attributes)?
            .end()
            .await
    }

    async fn write(
        &self,
        id: &str,
        request: &SavedObjectRequest<A>,
        action: &str,
    ) -> Result<SavedObject<A>> {
        if !request.references.is_empty() {
            log::warn!(
                "Ignoring {} references on {} {}, not supported by Kibana {}",
                request.references.len(),
                self.object_type,
                id,
                self.config.kibana_version
            );
        }

        let response = self
            .write_document(self.document_url(id), &request.attributes)
            .await?;
        if !response.is_success() {
            return Err(response.error(format!("Could not {} {}", action, self.object_type)));
        }

        let written: LegacyWriteResult = response.json(&format!(
            "could not parse fields from {} {} response",
            action, self.object_type
        ))?;
        self.get_by_id(&written.id).await
    }
}

#[async_trait]
impl<A: Attributes> SavedObjectClient<A> for LegacyApi<A> {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Legacy
    }

    async fn create(&self, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>> {
        let id = uuid::Uuid::new_v4().to_string();
        let created = self.write(&id, request, "create").await?;
        log::debug!("Created {} {}", self.object_type, created.id);
        Ok(created)
    }

    async fn get_by_id(&self, id: &str) -> Result<SavedObject<A>> {
        let response = self
            .agent
            .get(self.document_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(read_error(
                &response,
                &self.config,
                format!("Could not fetch {}", self.object_type),
            ));
        }

        let document: LegacyDocument<A> = response.json(&format!(
            "could not parse fields from get {} response",
            self.object_type
        ))?;
        Ok(document.into())
    }

    async fn list(&self) -> Result<Vec<SavedObject<A>>> {
        Err(Error::NotImplemented("List"))
    }

    async fn update(&self, id: &str, request: &SavedObjectRequest<A>) -> Result<SavedObject<A>> {
        self.write(id, request, "update").await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .agent
            .delete(self.document_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if !response.is_success() {
            return Err(delete_error(
                &response,
                format!("Could not delete {}", self.object_type),
            ));
        }
        log::debug!("Deleted {} {}", self.object_type, id);
        Ok(())
    }
}
