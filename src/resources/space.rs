//! Space resource

use super::{Resource, found};
use crate::client::KibanaClient;
use crate::kibana::Space;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// `name` is the space id; `title` is what Kibana displays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub initials: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_features: Vec<String>,
}

impl SpaceConfig {
    pub fn to_space(&self) -> Space {
        Space {
            id: self.name.clone(),
            name: self.title.clone(),
            description: self.description.clone(),
            color: self.color.clone(),
            initials: self.initials.clone(),
            image_url: self.image_url.clone(),
            disabled_features: self.disabled_features.clone(),
        }
    }

    pub fn from_space(space: Space) -> Self {
        Self {
            name: space.id,
            title: space.name,
            description: space.description,
            color: space.color,
            initials: space.initials,
            image_url: space.image_url,
            disabled_features: space.disabled_features,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SpaceResource;

impl Resource for SpaceResource {
    const KIND: &'static str = "space";
    type Config = SpaceConfig;

    async fn create(&self, client: &KibanaClient, config: &SpaceConfig) -> Result<String> {
        log::info!("Creating Kibana space {}", config.name);
        client
            .space()
            .create(&config.to_space())
            .await
            .wrap_err_with(|| format!("failed to create kibana space {}", config.name))?;
        Ok(config.name.clone())
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<SpaceConfig>> {
        log::info!("Reading Kibana space {}", id);
        let result = client.space().get_by_id(id).await;
        Ok(found(Self::KIND, id, result)?.map(SpaceConfig::from_space))
    }

    async fn update(&self, client: &KibanaClient, id: &str, config: &SpaceConfig) -> Result<()> {
        let space = Space {
            id: id.to_string(),
            ..config.to_space()
        };
        log::info!("Updating Kibana space {}", id);
        client
            .space()
            .update(&space)
            .await
            .wrap_err_with(|| format!("failed to update kibana space {}", id))
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana space {}", id);
        client
            .space()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete kibana space {}", id))
    }
}
