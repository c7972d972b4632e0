//! Dashboards

use super::saved_object::{
    KibanaSavedObjectMeta, LegacyApi, ModernApi, Reference, ReferenceType, SavedObject,
    SavedObjectClient, SavedObjectRequest, validate_references,
};
use crate::client::{KibanaClient, Result, VersionTable};
use crate::config::{DEFAULT_KIBANA_VERSION_553, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7};
use serde::{Deserialize, Serialize};

pub const DASHBOARD_TYPE: &str = "dashboard";

pub const DASHBOARD_REFERENCE_TYPES: &[ReferenceType] = &[
    ReferenceType::Search,
    ReferenceType::Visualization,
    ReferenceType::IndexPattern,
    ReferenceType::Tag,
    ReferenceType::Lens,
];

pub type Dashboard = SavedObject<DashboardAttributes>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardAttributes {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "panelsJSON", default)]
    pub panels_json: String,
    #[serde(rename = "optionsJSON", default)]
    pub options_json: String,
    #[serde(rename = "uiStateJSON", default, skip_serializing_if = "String::is_empty")]
    pub ui_state_json: String,
    #[serde(rename = "timeRestore", default)]
    pub time_restore: bool,
    #[serde(rename = "kibanaSavedObjectMeta", default)]
    pub kibana_saved_object_meta: KibanaSavedObjectMeta,
}

#[derive(Default)]
pub struct DashboardRequestBuilder {
    title: String,
    description: String,
    panels_json: String,
    options_json: String,
    ui_state_json: String,
    time_restore: bool,
    kibana_saved_object_meta: KibanaSavedObjectMeta,
    references: Vec<Reference>,
}

impl DashboardRequestBuilder {
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

    pub fn with_panels_json(mut self, panels_json: impl Into<String>) -> Self {
        self.panels_json = panels_json.into();
        self
    }

    pub fn with_options_json(mut self, options_json: impl Into<String>) -> Self {
        self.options_json = options_json.into();
        self
    }

    pub fn with_ui_state_json(mut self, ui_state_json: impl Into<String>) -> Self {
        self.ui_state_json = ui_state_json.into();
        self
    }

    pub fn with_time_restore(mut self, time_restore: bool) -> Self {
        self.time_restore = time_restore;
        self
    }

    pub fn with_kibana_saved_object_meta(mut self, meta: KibanaSavedObjectMeta) -> Self {
        self.kibana_saved_object_meta = meta;
        self
    }

    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    pub fn build(self) -> Result<SavedObjectRequest<DashboardAttributes>> {
        validate_references(DASHBOARD_TYPE, &self.references, DASHBOARD_REFERENCE_TYPES)?;
        let attributes = DashboardAttributes {
            title: self.title,
            description: self.description,
            version: 1,
            panels_json: self.panels_json,
            options_json: self.options_json,
            ui_state_json: self.ui_state_json,
            time_restore: self.time_restore,
            kibana_saved_object_meta: self.kibana_saved_object_meta,
        };
        Ok(SavedObjectRequest::new(attributes).with_references(self.references))
    }
}

pub trait DashboardClient: SavedObjectClient<DashboardAttributes> {}

impl DashboardClient for ModernApi<DashboardAttributes> {}

impl DashboardClient for LegacyApi<DashboardAttributes> {}

fn legacy(client: &KibanaClient) -> Box<dyn DashboardClient> {
    Box::new(LegacyApi::<DashboardAttributes>::new(client, DASHBOARD_TYPE))
}

fn modern(client: &KibanaClient) -> Box<dyn DashboardClient> {
    Box::new(ModernApi::<DashboardAttributes>::new(client, DASHBOARD_TYPE))
}

pub static CLIENTS: VersionTable<dyn DashboardClient> = VersionTable {
    capability: DASHBOARD_TYPE,
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
    fn test_build_request() {
        let request = DashboardRequestBuilder::new()
            .with_title("Overview")
            .with_panels_json(r#"[{"id":"vis-1","type":"visualization","panelIndex":1}]"#)
            .with_options_json(r#"{"darkTheme":false}"#)
            .with_time_restore(true)
            .with_kibana_saved_object_meta(KibanaSavedObjectMeta::new(
                r#"{"filter":[],"query":{"query":"","language":"lucene"}}"#,
            ))
            .with_references(vec![Reference::new(
                "panel_0",
                ReferenceType::Visualization,
                "vis-1",
            )])
            .build()
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["attributes"]["title"], "Overview");
        assert_eq!(value["attributes"]["version"], 1);
        assert_eq!(value["attributes"]["timeRestore"], true);
        assert!(value["attributes"].get("uiStateJSON").is_none());
        assert_eq!(
            value["references"],
            json!([{"name": "panel_0", "type": "visualization", "id": "vis-1"}])
        );
    }

    #[test]
    fn test_nested_dashboard_reference_rejected() {
        let result = DashboardRequestBuilder::new()
            .with_references(vec![Reference::new("ref", ReferenceType::Dashboard, "other")])
            .build();
        assert!(result.is_err());

        let result = DashboardRequestBuilder::new()
            .with_references(vec![Reference::new("tag-ref", ReferenceType::Tag, "t1")])
            .build();
        assert!(result.is_ok());
    }
}
