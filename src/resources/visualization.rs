//! Visualization resource

use super::hash::HashedSet;
use super::{Resource, found, normalize_json, reference_list};
use crate::client::KibanaClient;
use crate::kibana::{
    KibanaSavedObjectMeta, Reference, SavedObjectRequest, Visualization, VisualizationAttributes,
    VisualizationRequestBuilder,
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub saved_search_id: String,
    pub visualization_state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ui_state_json: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search_source_json: String,
    #[serde(default, skip_serializing_if = "HashedSet::is_empty")]
    pub references: HashedSet<Reference>,
}

pub fn build_request(
    config: &VisualizationConfig,
    version: &str,
) -> crate::client::Result<SavedObjectRequest<VisualizationAttributes>> {
    let mut builder = VisualizationRequestBuilder::new()
        .with_title(config.name.clone())
        .with_description(config.description.clone())
        .with_visualization_state(config.visualization_state.clone())
        .with_ui_state_json(config.ui_state_json.clone())
        .with_saved_search_id(config.saved_search_id.clone())
        .with_references(reference_list(&config.references));

    if !config.search_source_json.is_empty() {
        builder = builder.with_kibana_saved_object_meta(KibanaSavedObjectMeta::new(
            config.search_source_json.clone(),
        ));
    }

    builder.build(version)
}

/// The implicit saved search reference is folded back into
/// `saved_search_id` so it does not show up as a declared reference.
pub fn from_visualization(visualization: &Visualization) -> VisualizationConfig {
    let attributes = &visualization.attributes;
    let saved_search_id = attributes
        .linked_search_id(&visualization.references)
        .unwrap_or_default()
        .to_string();

    let references = visualization
        .references
        .iter()
        .filter(|r| {
            attributes.saved_search_ref_name.is_empty() || r.name != attributes.saved_search_ref_name
        })
        .cloned()
        .collect();

    VisualizationConfig {
        name: attributes.title.clone(),
        description: attributes.description.clone(),
        saved_search_id,
        visualization_state: normalize_json(&attributes.visualization_state),
        ui_state_json: normalize_json(&attributes.ui_state_json),
        search_source_json: normalize_json(&attributes.kibana_saved_object_meta.search_source_json),
        references,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VisualizationResource;

impl Resource for VisualizationResource {
    const KIND: &'static str = "visualization";
    type Config = VisualizationConfig;

    async fn create(&self, client: &KibanaClient, config: &VisualizationConfig) -> Result<String> {
        let request = build_request(config, &client.config().kibana_version)
            .wrap_err_with(|| format!("failed to build kibana visualization {}", config.name))?;
        log::info!("Creating Kibana visualization {}", config.name);
        let created = client
            .visualization()
            .create(&request)
            .await
            .wrap_err_with(|| format!("failed to create kibana visualization {}", config.name))?;
        Ok(created.id)
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<VisualizationConfig>> {
        log::info!("Reading Kibana visualization {}", id);
        let result = client.visualization().get_by_id(id).await;
        Ok(found(Self::KIND, id, result)?.map(|v| from_visualization(&v)))
    }

    async fn update(
        &self,
        client: &KibanaClient,
        id: &str,
        config: &VisualizationConfig,
    ) -> Result<()> {
        let request = build_request(config, &client.config().kibana_version)
            .wrap_err_with(|| format!("failed to build kibana visualization {}", config.name))?;
        log::info!("Updating Kibana visualization {}", id);
        client
            .visualization()
            .update(id, &request)
            .await
            .wrap_err_with(|| format!("failed to update kibana visualization {}", id))?;
        Ok(())
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana visualization {}", id);
        client
            .visualization()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete kibana visualization {}", id))
    }
}
