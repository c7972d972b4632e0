//! Security role resource
//!
//! Roles are keyed by name, so the id handed back by `create` is the name.

use super::hash::{ContentHash, HashedSet};
use super::{Resource, found};
use crate::client::KibanaClient;
use crate::kibana::{Role, RoleElasticsearch, RoleIndex, RoleKibana};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch: Option<ElasticsearchConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kibana: Vec<KibanaPrivilegeConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    #[serde(default)]
    pub cluster: Vec<String>,
    #[serde(default)]
    pub indices: Vec<IndexPrivilegeConfig>,
    #[serde(default)]
    pub run_as: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexPrivilegeConfig {
    pub names: Vec<String>,
    pub privileges: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KibanaPrivilegeConfig {
    #[serde(default)]
    pub base: Vec<String>,
    pub spaces: Vec<String>,
    #[serde(default, skip_serializing_if = "HashedSet::is_empty")]
    pub feature: HashedSet<FeatureConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub privileges: Vec<String>,
}

/// A feature appears at most once per privilege block.
impl ContentHash for FeatureConfig {
    fn content_key(&self) -> String {
        self.name.clone()
    }
}

impl RoleConfig {
    pub fn to_role(&self) -> Role {
        let elasticsearch = self
            .elasticsearch
            .as_ref()
            .map(|es| RoleElasticsearch {
                cluster: es.cluster.clone(),
                indices: es
                    .indices
                    .iter()
                    .map(|i| RoleIndex {
                        names: i.names.clone(),
                        privileges: i.privileges.clone(),
                        extra: Map::new(),
                    })
                    .collect(),
                run_as: es.run_as.clone(),
            })
            .unwrap_or_default();

        let kibana = self
            .kibana
            .iter()
            .map(|k| RoleKibana {
                base: k.base.clone(),
                feature: k
                    .feature
                    .iter()
                    .map(|f| (f.name.clone(), f.privileges.clone()))
                    .collect(),
                spaces: k.spaces.clone(),
            })
            .collect();

        Role {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            elasticsearch,
            kibana,
            ..Default::default()
        }
    }

    pub fn from_role(role: &Role) -> Self {
        let es = &role.elasticsearch;
        let elasticsearch = (!es.cluster.is_empty() || !es.indices.is_empty() || !es.run_as.is_empty())
            .then(|| ElasticsearchConfig {
                cluster: es.cluster.clone(),
                indices: es
                    .indices
                    .iter()
                    .map(|i| IndexPrivilegeConfig {
                        names: i.names.clone(),
                        privileges: i.privileges.clone(),
                    })
                    .collect(),
                run_as: es.run_as.clone(),
            });

        let kibana = role
            .kibana
            .iter()
            .map(|k| KibanaPrivilegeConfig {
                base: k.base.clone(),
                spaces: k.spaces.clone(),
                feature: k
                    .feature
                    .iter()
                    .map(|(name, privileges)| FeatureConfig {
                        name: name.clone(),
                        privileges: privileges.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: role.name.clone(),
            metadata: role.metadata.clone(),
            elasticsearch,
            kibana,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RoleResource;

impl Resource for RoleResource {
    const KIND: &'static str = "role";
    type Config = RoleConfig;

    async fn create(&self, client: &KibanaClient, config: &RoleConfig) -> Result<String> {
        log::info!("Creating Kibana role {}", config.name);
        client
            .role()
            .create_or_update(&config.to_role())
            .await
            .wrap_err_with(|| format!("failed to create kibana role {}", config.name))?;
        Ok(config.name.clone())
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<RoleConfig>> {
        log::info!("Reading Kibana role {}", id);
        let result = client.role().get_by_id(id).await;
        Ok(found(Self::KIND, id, result)?.map(|r| RoleConfig::from_role(&r)))
    }

    async fn update(&self, client: &KibanaClient, id: &str, config: &RoleConfig) -> Result<()> {
        // Renaming a role is a new role; the tracked id wins.
        let role = Role {
            name: id.to_string(),
            ..config.to_role()
        };
        log::info!("Updating Kibana role {}", id);
        client
            .role()
            .create_or_update(&role)
            .await
            .wrap_err_with(|| format!("failed to update kibana role {}", id))
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana role {}", id);
        client
            .role()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete kibana role {}", id))
    }
}
