//! CLI helper functions

use crate::{
    client::KibanaClient,
    config::Config,
    resources::{
        DashboardResource, HashedSet, IndexFilter, IndexPatternData, IndexPatternResource,
        Provider, Resource, RoleResource, SearchResource, SpaceResource, VisualizationResource,
        read_index,
    },
};
use clap::ValueEnum;
use eyre::{Context, Result};
use std::path::Path;

/// Kinds of object the CLI can manage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    Search,
    Visualization,
    Dashboard,
    IndexPattern,
    Role,
    Space,
}

/// Build a client from the environment, switching account when configured.
///
/// See [`Config::from_env`] for the recognised variables. `debug` forces
/// response body logging on.
pub async fn load_kibana_client(provider: &Provider, debug: bool) -> Result<&KibanaClient> {
    let mut config = Config::from_env();
    config.debug |= debug;
    provider.configure(config).await
}

/// Parse a YAML configuration file.
pub fn load_config_file<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

async fn create_with<R: Resource>(
    resource: R,
    client: &KibanaClient,
    path: &Path,
) -> Result<String> {
    let config: R::Config = load_config_file(path)?;
    resource.create(client, &config).await
}

async fn read_with<R: Resource>(
    resource: R,
    client: &KibanaClient,
    id: &str,
) -> Result<Option<String>> {
    match resource.read(client, id).await? {
        Some(config) => Ok(Some(serde_yaml::to_string(&config)?)),
        None => Ok(None),
    }
}

async fn update_with<R: Resource>(
    resource: R,
    client: &KibanaClient,
    id: &str,
    path: &Path,
) -> Result<()> {
    let config: R::Config = load_config_file(path)?;
    resource.update(client, id, &config).await
}

/// Create the object described by the YAML file and return its id.
pub async fn create(client: &KibanaClient, kind: ResourceKind, path: &Path) -> Result<String> {
    match kind {
        ResourceKind::Search => create_with(SearchResource, client, path).await,
        ResourceKind::Visualization => create_with(VisualizationResource, client, path).await,
        ResourceKind::Dashboard => create_with(DashboardResource, client, path).await,
        ResourceKind::IndexPattern => create_with(IndexPatternResource, client, path).await,
        ResourceKind::Role => create_with(RoleResource, client, path).await,
        ResourceKind::Space => create_with(SpaceResource, client, path).await,
    }
}

/// Current configuration of an object as YAML, `None` when it does not exist.
pub async fn read(client: &KibanaClient, kind: ResourceKind, id: &str) -> Result<Option<String>> {
    match kind {
        ResourceKind::Search => read_with(SearchResource, client, id).await,
        ResourceKind::Visualization => read_with(VisualizationResource, client, id).await,
        ResourceKind::Dashboard => read_with(DashboardResource, client, id).await,
        ResourceKind::IndexPattern => read_with(IndexPatternResource, client, id).await,
        ResourceKind::Role => read_with(RoleResource, client, id).await,
        ResourceKind::Space => read_with(SpaceResource, client, id).await,
    }
}

pub async fn update(client: &KibanaClient, kind: ResourceKind, id: &str, path: &Path) -> Result<()> {
    match kind {
        ResourceKind::Search => update_with(SearchResource, client, id, path).await,
        ResourceKind::Visualization => update_with(VisualizationResource, client, id, path).await,
        ResourceKind::Dashboard => update_with(DashboardResource, client, id, path).await,
        ResourceKind::IndexPattern => update_with(IndexPatternResource, client, id, path).await,
        ResourceKind::Role => update_with(RoleResource, client, id, path).await,
        ResourceKind::Space => update_with(SpaceResource, client, id, path).await,
    }
}

pub async fn delete(client: &KibanaClient, kind: ResourceKind, id: &str) -> Result<()> {
    match kind {
        ResourceKind::Search => SearchResource.delete(client, id).await,
        ResourceKind::Visualization => VisualizationResource.delete(client, id).await,
        ResourceKind::Dashboard => DashboardResource.delete(client, id).await,
        ResourceKind::IndexPattern => IndexPatternResource.delete(client, id).await,
        ResourceKind::Role => RoleResource.delete(client, id).await,
        ResourceKind::Space => SpaceResource.delete(client, id).await,
    }
}

/// Parse `name=value1,value2` into an index filter.
pub fn parse_index_filter(arg: &str) -> Result<IndexFilter> {
    let (name, values) = arg
        .split_once('=')
        .ok_or_else(|| eyre::eyre!("Invalid filter '{}', expected name=value[,value...]", arg))?;
    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect();
    if name.trim().is_empty() || values.is_empty() {
        eyre::bail!("Invalid filter '{}', expected name=value[,value...]", arg);
    }
    Ok(IndexFilter {
        name: name.trim().to_string(),
        values,
    })
}

/// Resolve `name=values` filters to an index pattern.
pub async fn find_index(client: &KibanaClient, filters: &[String]) -> Result<IndexPatternData> {
    let filters = filters
        .iter()
        .map(|f| parse_index_filter(f))
        .collect::<Result<HashedSet<_>>>()?;
    read_index(client, &filters).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::SearchConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_index_filter() {
        let filter = parse_index_filter("title=logstash-*, metrics-*").unwrap();
        assert_eq!(filter.name, "title");
        assert_eq!(filter.values, vec!["logstash-*", "metrics-*"]);

        assert!(parse_index_filter("title").is_err());
        assert!(parse_index_filter("title=").is_err());
        assert!(parse_index_filter("=x").is_err());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name: Errors\ndisplay_columns: [message]\nsearch:\n  index: idx-1\n  query: 'level:error'"
        )
        .unwrap();

        let config: SearchConfig = load_config_file(file.path()).unwrap();
        assert_eq!(config.name, "Errors");
        assert_eq!(config.search.unwrap().query.as_deref(), Some("level:error"));
    }

    #[test]
    fn test_load_config_file_missing() {
        let result: Result<SearchConfig> = load_config_file("/nonexistent/search.yml");
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }
}
