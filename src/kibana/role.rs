//! Security roles (`/api/security/role`)

use crate::client::{Error, HttpAgent, KBN_VERSION, KibanaClient, Result, VersionTable};
use crate::config::{Config, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const ROLE_PATH: &str = "/api/security/role/";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Part of the url, never of the body.
    #[serde(default, skip_serializing)]
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub transient_metadata: Map<String, Value>,
    #[serde(default)]
    pub elasticsearch: RoleElasticsearch,
    #[serde(default)]
    pub kibana: Vec<RoleKibana>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleElasticsearch {
    #[serde(default)]
    pub cluster: Vec<String>,
    #[serde(default)]
    pub indices: Vec<RoleIndex>,
    #[serde(default)]
    pub run_as: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleIndex {
    pub names: Vec<String>,
    pub privileges: Vec<String>,
    /// `field_security`, `query` and anything else passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kibana privileges granted in a set of spaces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleKibana {
    #[serde(default)]
    pub base: Vec<String>,
    #[serde(default)]
    pub feature: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub spaces: Vec<String>,
}

impl Role {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Precondition("A role needs a name".to_string()));
        }
        if let Some(position) = self.kibana.iter().position(|k| k.spaces.is_empty()) {
            return Err(Error::Precondition(format!(
                "Kibana privilege block {} of role {} must name at least one space",
                position, self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
pub trait RoleClient: Send + Sync {
    async fn create_or_update(&self, role: &Role) -> Result<()>;

    async fn get_by_id(&self, name: &str) -> Result<Role>;

    async fn delete(&self, name: &str) -> Result<()>;
}

pub struct DefaultRoleClient {
    config: Arc<Config>,
    agent: HttpAgent,
}

impl DefaultRoleClient {
    fn role_url(&self, name: &str) -> String {
        self.config.api_path(&format!("{}{}", ROLE_PATH, name))
    }
}

#[async_trait]
impl RoleClient for DefaultRoleClient {
    async fn create_or_update(&self, role: &Role) -> Result<()> {
        role.validate()?;
        let response = self
            .agent
            .put(self.role_url(&role.name))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(role)?
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error("Could not create role"));
        }
        log::debug!("Saved role {}", role.name);
        Ok(())
    }

    async fn get_by_id(&self, name: &str) -> Result<Role> {
        let response = self
            .agent
            .get(self.role_url(name))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if response.status == 404 {
            return Err(response.not_found("Could not fetch role"));
        }
        if !response.is_success() {
            return Err(response.error("Could not fetch role"));
        }

        let mut role: Role = response.json("could not parse fields from get role response")?;
        if role.name.is_empty() {
            role.name = name.to_string();
        }
        Ok(role)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let response = self
            .agent
            .delete(self.role_url(name))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if response.status == 404 {
            return Err(response.not_found("Could not delete role"));
        }
        if !response.is_success() {
            return Err(response.error("Could not delete role"));
        }
        Ok(())
    }
}

fn default_client(client: &KibanaClient) -> Box<dyn RoleClient> {
    Box::new(DefaultRoleClient {
        config: client.shared_config(),
        agent: client.agent().clone(),
    })
}

pub static CLIENTS: VersionTable<dyn RoleClient> = VersionTable {
    capability: "role",
    entries: &[
        (DEFAULT_KIBANA_VERSION_6, default_client),
        (DEFAULT_KIBANA_VERSION_7, default_client),
    ],
    latest: (DEFAULT_KIBANA_VERSION_7, default_client),
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role() -> Role {
        Role {
            name: "log_reader".to_string(),
            elasticsearch: RoleElasticsearch {
                cluster: vec!["monitor".to_string()],
                indices: vec![RoleIndex {
                    names: vec!["logstash-*".to_string()],
                    privileges: vec!["read".to_string()],
                    extra: Map::new(),
                }],
                run_as: vec![],
            },
            kibana: vec![RoleKibana {
                base: vec![],
                feature: BTreeMap::from([(
                    "discover".to_string(),
                    vec!["read".to_string()],
                )]),
                spaces: vec!["default".to_string()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_name_not_in_body() {
        let value = serde_json::to_value(role()).unwrap();
        assert!(value.get("name").is_none());
        assert!(value.get("transient_metadata").is_none());
        assert_eq!(value["metadata"], json!({}));
        assert_eq!(value["kibana"][0]["feature"]["discover"], json!(["read"]));
        assert_eq!(
            value["elasticsearch"]["indices"][0],
            json!({"names": ["logstash-*"], "privileges": ["read"]})
        );
    }

    #[test]
    fn test_parse_keeps_index_extras() {
        let role: Role = serde_json::from_value(json!({
            "name": "log_reader",
            "metadata": {},
            "transient_metadata": {"enabled": true},
            "elasticsearch": {
                "cluster": [],
                "indices": [{"names": ["a"], "privileges": ["read"], "allow_restricted_indices": false}],
                "run_as": []
            },
            "kibana": [{"base": ["all"], "feature": {}, "spaces": ["*"]}]
        }))
        .unwrap();
        assert_eq!(role.name, "log_reader");
        assert_eq!(
            role.elasticsearch.indices[0].extra["allow_restricted_indices"],
            json!(false)
        );
        assert_eq!(role.kibana[0].base, vec!["all"]);
    }

    #[test]
    fn test_validate() {
        assert!(role().validate().is_ok());

        let mut missing_space = role();
        missing_space.kibana[0].spaces.clear();
        assert!(missing_space.validate().is_err());

        let unnamed = Role::default();
        assert!(unnamed.validate().is_err());
    }
}
