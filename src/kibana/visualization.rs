//! Visualizations
//!
//! From 7.0.0 on a visualization no longer stores the id of its saved
//! search; it names a reference instead (`savedSearchRefName`), and the
//! reference list carries the id.

use super::saved_object::{
    KibanaSavedObjectMeta, LegacyApi, ModernApi, Reference, ReferenceType, SavedObject,
    SavedObjectClient, SavedObjectRequest, validate_references,
};
use crate::client::{KibanaClient, Result, VersionTable, version_at_least};
use crate::config::{DEFAULT_KIBANA_VERSION_553, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7};
use serde::{Deserialize, Serialize};

pub const VISUALIZATION_TYPE: &str = "visualization";

/// Name of the implicit reference to the saved search.
pub const SAVED_SEARCH_REF_NAME: &str = "search_1";

/// First version that links saved searches through references.
pub const REFERENCES_SINCE_VERSION: &str = "7.0.0";

pub const VISUALIZATION_REFERENCE_TYPES: &[ReferenceType] =
    &[ReferenceType::Search, ReferenceType::IndexPattern];

pub type Visualization = SavedObject<VisualizationAttributes>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationAttributes {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "visState", default)]
    pub visualization_state: String,
    #[serde(rename = "uiStateJSON", default, skip_serializing_if = "String::is_empty")]
    pub ui_state_json: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub saved_search_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub saved_search_ref_name: String,
    #[serde(default)]
    pub kibana_saved_object_meta: KibanaSavedObjectMeta,
}

impl VisualizationAttributes {
    /// Id of the linked saved search, whichever way it is stored.
    pub fn linked_search_id<'a>(&'a self, references: &'a [Reference]) -> Option<&'a str> {
        if !self.saved_search_id.is_empty() {
            return Some(&self.saved_search_id);
        }
        if self.saved_search_ref_name.is_empty() {
            return None;
        }
        references
            .iter()
            .find(|r| r.name == self.saved_search_ref_name)
            .map(|r| r.id.as_str())
    }
}

#[derive(Default)]
pub struct VisualizationRequestBuilder {
    title: String,
    description: String,
    visualization_state: String,
    ui_state_json: String,
    saved_search_id: String,
    kibana_saved_object_meta: KibanaSavedObjectMeta,
    references: Vec<Reference>,
}

impl VisualizationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_visualization_state(mut self, visualization_state: impl Into<String>) -> Self {
        self.visualization_state = visualization_state.into();
        self
    }

    pub fn with_ui_state_json(mut self, ui_state_json: impl Into<String>) -> Self {
        self.ui_state_json = ui_state_json.into();
        self
    }

    pub fn with_saved_search_id(mut self, saved_search_id: impl Into<String>) -> Self {
        self.saved_search_id = saved_search_id.into();
        self
    }

    pub fn with_kibana_saved_object_meta(mut self, meta: KibanaSavedObjectMeta) -> Self {
        self.kibana_saved_object_meta = meta;
        self
    }

    /// Explicit references replace the implicit saved search reference.
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    /// Build the request for a backend running `version`.
    pub fn build(self, version: &str) -> Result<SavedObjectRequest<VisualizationAttributes>> {
        let mut attributes = VisualizationAttributes {
            title: self.title,
            description: self.description,
            version: 1,
            visualization_state: self.visualization_state,
            ui_state_json: self.ui_state_json,
            saved_search_id: String::new(),
            saved_search_ref_name: String::new(),
            kibana_saved_object_meta: self.kibana_saved_object_meta,
        };

        if !version_at_least(version, REFERENCES_SINCE_VERSION) {
            attributes.saved_search_id = self.saved_search_id;
            return Ok(SavedObjectRequest::new(attributes));
        }

        let references = if !self.references.is_empty() {
            validate_references(
                VISUALIZATION_TYPE,
                &self.references,
                VISUALIZATION_REFERENCE_TYPES,
            )?;
            self.references
        } else if !self.saved_search_id.is_empty() {
            attributes.saved_search_ref_name = SAVED_SEARCH_REF_NAME.to_string();
            vec![Reference::new(
                SAVED_SEARCH_REF_NAME,
                ReferenceType::Search,
                self.saved_search_id,
            )]
        } else {
            // No saved search: a `search_1` reference would point at nothing.
            Vec::new()
        };

        Ok(SavedObjectRequest::new(attributes).with_references(references))
    }
}

pub trait VisualizationClient: SavedObjectClient<VisualizationAttributes> {}

impl VisualizationClient for ModernApi<VisualizationAttributes> {}

impl VisualizationClient for LegacyApi<VisualizationAttributes> {}

fn legacy(client: &KibanaClient) -> Box<dyn VisualizationClient> {
    Box::new(LegacyApi::<VisualizationAttributes>::new(
        client,
        VISUALIZATION_TYPE,
    ))
}

fn modern(client: &KibanaClient) -> Box<dyn VisualizationClient> {
    Box::new(ModernApi::<VisualizationAttributes>::new(
        client,
        VISUALIZATION_TYPE,
    ))
}

pub static CLIENTS: VersionTable<dyn VisualizationClient> = VersionTable {
    capability: VISUALIZATION_TYPE,
    entries: &[
        (DEFAULT_KIBANA_VERSION_553, legacy),
        (DEFAULT_KIBANA_VERSION_6, modern),
        (DEFAULT_KIBANA_VERSION_7, modern),
    ],
    latest: (DEFAULT_KIBANA_VERSION_7, modern),
};
