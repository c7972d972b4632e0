//! Dashboard resource

use super::hash::HashedSet;
use super::{Resource, found, normalize_json, reference_list};
use crate::client::KibanaClient;
use crate::kibana::{
    Dashboard, DashboardAttributes, DashboardRequestBuilder, KibanaSavedObjectMeta, Reference,
    SavedObjectRequest,
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub panels_json: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub options_json: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ui_state_json: String,
    #[serde(default)]
    pub time_restore: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search_source_json: String,
    #[serde(default, skip_serializing_if = "HashedSet::is_empty")]
    pub references: HashedSet<Reference>,
}

pub fn build_request(
    config: &DashboardConfig,
) -> crate::client::Result<SavedObjectRequest<DashboardAttributes>> {
    let mut builder = DashboardRequestBuilder::new()
        .with_title(config.name.clone())
        .with_description(config.description.clone())
        .with_panels_json(config.panels_json.clone())
        .with_options_json(config.options_json.clone())
        .with_ui_state_json(config.ui_state_json.clone())
        .with_time_restore(config.time_restore)
        .with_references(reference_list(&config.references));

    if !config.search_source_json.is_empty() {
        builder = builder.with_kibana_saved_object_meta(KibanaSavedObjectMeta::new(
            config.search_source_json.clone(),
        ));
    }

    builder.build()
}

pub fn from_dashboard(dashboard: &Dashboard) -> DashboardConfig {
    let attributes = &dashboard.attributes;
    DashboardConfig {
        name: attributes.title.clone(),
        description: attributes.description.clone(),
        panels_json: normalize_json(&attributes.panels_json),
        options_json: normalize_json(&attributes.options_json),
        ui_state_json: normalize_json(&attributes.ui_state_json),
        time_restore: attributes.time_restore,
        search_source_json: normalize_json(&attributes.kibana_saved_object_meta.search_source_json),
        references: dashboard.references.iter().cloned().collect(),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DashboardResource;

impl Resource for DashboardResource {
    const KIND: &'static str = "dashboard";
    type Config = DashboardConfig;

    async fn create(&self, client: &KibanaClient, config: &DashboardConfig) -> Result<String> {
        let request = build_request(config)
            .wrap_err_with(|| format!("failed to build kibana dashboard {}", config.name))?;
        log::info!("Creating Kibana dashboard {}", config.name);
        let created = client
            .dashboard()
            .create(&request)
            .await
            .wrap_err_with(|| format!("failed to create kibana saved dashboard {}", config.name))?;
        Ok(created.id)
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<DashboardConfig>> {
        log::info!("Reading Kibana dashboard {}", id);
        let result = client.dashboard().get_by_id(id).await;
        Ok(found(Self::KIND, id, result)?.map(|d| from_dashboard(&d)))
    }

    async fn update(&self, client: &KibanaClient, id: &str, config: &DashboardConfig) -> Result<()> {
        let request = build_request(config)
            .wrap_err_with(|| format!("failed to build kibana dashboard {}", config.name))?;
        log::info!("Updating Kibana dashboard {}", id);
        client
            .dashboard()
            .update(id, &request)
            .await
            .wrap_err_with(|| format!("failed to update kibana saved dashboard {}", id))?;
        Ok(())
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana dashboard {}", id);
        client
            .dashboard()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete kibana dashboard {}", id))
    }
}
