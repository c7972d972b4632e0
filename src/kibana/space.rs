//! Spaces (`/api/spaces/space`)

use crate::client::{Error, HttpAgent, KBN_VERSION, KibanaClient, Result, VersionTable};
use crate::config::{Config, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SPACE_PATH: &str = "/api/spaces/space";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: String,
    pub name: String,
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

#[async_trait]
pub trait SpaceClient: Send + Sync {
    async fn create(&self, space: &Space) -> Result<()>;

    async fn update(&self, space: &Space) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Space>;

    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct DefaultSpaceClient {
    config: Arc<Config>,
    agent: HttpAgent,
}

impl DefaultSpaceClient {
    fn space_url(&self, id: &str) -> String {
        self.config.api_path(&format!("{}/{}", SPACE_PATH, id))
    }
}

fn require_id(space: &Space) -> Result<()> {
    if space.id.is_empty() {
        return Err(Error::Precondition("A space needs an id".to_string()));
    }
    Ok(())
}

#[async_trait]
impl SpaceClient for DefaultSpaceClient {
    async fn create(&self, space: &Space) -> Result<()> {
        require_id(space)?;
        let response = self
            .agent
            .post(self.config.api_path(SPACE_PATH))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(space)?
            .end()
            .await?;

        if !response.is_success() {
            return Err(response.error("Could not create space"));
        }
        log::debug!("Created space {}", space.id);
        Ok(())
    }

    async fn update(&self, space: &Space) -> Result<()> {
        require_id(space)?;
        let response = self
            .agent
            .put(self.space_url(&space.id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .send(space)?
            .end()
            .await?;

        if response.status == 404 {
            return Err(response.not_found("Could not update space"));
        }
        if !response.is_success() {
            return Err(response.error("Could not update space"));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Space> {
        let response = self
            .agent
            .get(self.space_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if response.status == 404 {
            return Err(response.not_found("Could not fetch space"));
        }
        if !response.is_success() {
            return Err(response.error("Could not fetch space"));
        }
        response.json("could not parse fields from get space response")
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .agent
            .delete(self.space_url(id))
            .set(KBN_VERSION, self.config.kibana_version.as_str())
            .end()
            .await?;

        if response.status == 404 {
            return Err(response.not_found("Could not delete space"));
        }
        if !response.is_success() {
            return Err(response.error("Could not delete space"));
        }
        Ok(())
    }
}

fn default_client(client: &KibanaClient) -> Box<dyn SpaceClient> {
    Box::new(DefaultSpaceClient {
        config: client.shared_config(),
        agent: client.agent().clone(),
    })
}

pub static CLIENTS: VersionTable<dyn SpaceClient> = VersionTable {
    capability: "space",
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

    #[test]
    fn test_optional_fields_omitted() {
        let space = Space {
            id: "marketing".to_string(),
            name: "Marketing".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&space).unwrap(),
            json!({"id": "marketing", "name": "Marketing"})
        );
    }

    #[test]
    fn test_camel_case_fields() {
        let space: Space = serde_json::from_value(json!({
            "id": "ops", "name": "Ops", "imageUrl": "data:image/png;base64,AAAA",
            "disabledFeatures": ["canvas"], "_reserved": false
        }))
        .unwrap();
        assert_eq!(space.image_url, "data:image/png;base64,AAAA");
        assert_eq!(space.disabled_features, vec!["canvas"]);
    }

    #[test]
    fn test_require_id() {
        assert!(require_id(&Space::default()).is_err());
    }
}
