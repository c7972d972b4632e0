//! Saved search resource

use super::hash::{ContentHash, HashedSet};
use super::{Resource, found, reference_list};
use crate::client::{Error, KibanaClient};
use crate::kibana::search::{
    FilterClause, FilterMeta, MatchParams, Search, SearchClient, SearchFilter,
    SearchRequestBuilder, SortOrder,
};
use crate::kibana::{Reference, SavedObjectRequest, SearchAttributes};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub display_columns: Vec<String>,
    #[serde(default)]
    pub sort_by_columns: Vec<String>,
    #[serde(default)]
    pub sort_ascending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchBlock>,
    #[serde(default, skip_serializing_if = "HashedSet::is_empty")]
    pub references: HashedSet<Reference>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchBlock {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
    /// Name of the reference holding the index, instead of a literal id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index_ref_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "HashedSet::is_empty")]
    pub filters: HashedSet<FilterConfig>,
}

/// A filter holds exactly one of `match` and `exists`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_query: Option<MatchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub field_name: String,
    pub query: String,
    #[serde(rename = "type")]
    pub match_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub index: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    #[serde(rename = "type")]
    pub meta_type: String,
    pub key: String,
    pub value: String,
    pub params: ParamsConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsConfig {
    pub query: String,
    #[serde(rename = "type")]
    pub match_type: String,
}

impl ContentHash for MatchConfig {
    fn content_key(&self) -> String {
        format!("{}-{}-{}", self.field_name, self.query, self.match_type)
    }
}

impl ContentHash for ParamsConfig {
    fn content_key(&self) -> String {
        format!("{}-{}", self.query, self.match_type)
    }
}

impl ContentHash for MetaConfig {
    fn content_key(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}-{}-{}-{}",
            self.index,
            self.negate,
            self.disabled,
            self.alias,
            self.meta_type,
            self.key,
            self.value,
            self.params.content_key()
        )
    }
}

impl ContentHash for FilterConfig {
    fn content_key(&self) -> String {
        format!(
            "match:{};exists:{};meta:{}",
            self.match_query
                .as_ref()
                .map(ContentHash::content_key)
                .unwrap_or_default(),
            self.exists.as_deref().unwrap_or_default(),
            self.meta
                .as_ref()
                .map(ContentHash::content_key)
                .unwrap_or_default()
        )
    }
}

impl FilterConfig {
    pub fn to_filter(&self) -> crate::client::Result<SearchFilter> {
        let filter = match (&self.match_query, &self.exists) {
            (Some(m), None) => SearchFilter::matching(
                m.field_name.clone(),
                MatchParams::new(m.query.clone(), m.match_type.clone()),
            ),
            (None, Some(field)) => SearchFilter::exists(field.clone()),
            _ => {
                return Err(Error::Precondition(
                    "a search filter needs exactly one of 'match' or 'exists'".to_string(),
                ));
            }
        };

        Ok(match &self.meta {
            Some(meta) => filter.with_meta(FilterMeta {
                index: meta.index.clone(),
                negate: meta.negate,
                disabled: meta.disabled,
                alias: (!meta.alias.is_empty()).then(|| meta.alias.clone()),
                meta_type: meta.meta_type.clone(),
                key: meta.key.clone(),
                value: meta.value.clone(),
                params: Some(MatchParams::new(
                    meta.params.query.clone(),
                    meta.params.match_type.clone(),
                )),
            }),
            None => filter,
        })
    }

    pub fn from_filter(filter: &SearchFilter) -> Self {
        let (match_query, exists) = match &filter.clause {
            FilterClause::Match { field, params } => (
                Some(MatchConfig {
                    field_name: field.clone(),
                    query: params.query.clone(),
                    match_type: params.match_type.clone(),
                }),
                None,
            ),
            FilterClause::Exists { field } => (None, Some(field.clone())),
        };

        let meta = filter.meta.as_ref().map(|meta| {
            let params = meta.params.clone().unwrap_or_default();
            MetaConfig {
                index: meta.index.clone(),
                negate: meta.negate,
                disabled: meta.disabled,
                alias: meta.alias.clone().unwrap_or_default(),
                meta_type: meta.meta_type.clone(),
                key: meta.key.clone(),
                value: meta.value.clone(),
                params: ParamsConfig {
                    query: params.query,
                    match_type: params.match_type,
                },
            }
        });

        Self {
            match_query,
            exists,
            meta,
        }
    }
}

/// Build the create/update request for `config` with the given client's
/// query dialect.
pub fn build_request(
    client: &dyn SearchClient,
    config: &SearchConfig,
) -> crate::client::Result<SavedObjectRequest<SearchAttributes>> {
    let mut source = client.new_search_source();
    if let Some(block) = &config.search {
        if !block.index.is_empty() {
            source = source.with_index_id(block.index.clone());
        }
        if !block.index_ref_name.is_empty() {
            source = source.with_index_ref_name(block.index_ref_name.clone());
        }
        if let Some(query) = &block.query {
            source = source.with_query(query.clone());
        }
        for filter in block.filters.iter() {
            source = source.with_filter(filter.to_filter()?);
        }
    }

    let order = if config.sort_ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };

    SearchRequestBuilder::new()
        .with_title(config.name.clone())
        .with_description(config.description.clone())
        .with_display_columns(config.display_columns.clone())
        .with_sort_columns(config.sort_by_columns.clone(), order)
        .with_search_source(source.build()?)
        .with_references(reference_list(&config.references))
        .build()
}

/// Map a stored search back to its configuration.
pub fn from_search(search: &Search) -> crate::client::Result<SearchConfig> {
    let attributes = &search.attributes;
    let source = attributes.search_source()?;

    let (sort_by_columns, sort_ascending) = match attributes.sort.split_last() {
        Some((order, columns)) => (columns.to_vec(), order.eq_ignore_ascii_case("asc")),
        None => (Vec::new(), false),
    };

    let search_block = SearchBlock {
        index: source.index_id.clone().unwrap_or_default(),
        index_ref_name: source.index_ref_name.clone().unwrap_or_default(),
        query: source
            .query
            .as_ref()
            .map(|q| q.text().to_string())
            .filter(|q| !q.is_empty()),
        filters: source.filter.iter().map(FilterConfig::from_filter).collect(),
    };

    Ok(SearchConfig {
        name: attributes.title.clone(),
        description: attributes.description.clone(),
        display_columns: attributes.columns.clone(),
        sort_by_columns,
        sort_ascending,
        search: Some(search_block),
        references: search.references.iter().cloned().collect(),
    })
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SearchResource;

impl Resource for SearchResource {
    const KIND: &'static str = "search";
    type Config = SearchConfig;

    async fn create(&self, client: &KibanaClient, config: &SearchConfig) -> Result<String> {
        let api = client.search();
        let request = build_request(api.as_ref(), config)
            .wrap_err_with(|| format!("failed to build kibana search {}", config.name))?;
        log::info!("Creating Kibana search {}", config.name);
        let created = api
            .create(&request)
            .await
            .wrap_err_with(|| format!("failed to create kibana saved search {}", config.name))?;
        Ok(created.id)
    }

    async fn read(&self, client: &KibanaClient, id: &str) -> Result<Option<SearchConfig>> {
        log::info!("Reading Kibana search {}", id);
        let Some(search) = found(Self::KIND, id, client.search().get_by_id(id).await)? else {
            return Ok(None);
        };
        Ok(Some(from_search(&search)?))
    }

    async fn update(&self, client: &KibanaClient, id: &str, config: &SearchConfig) -> Result<()> {
        let api = client.search();
        let request = build_request(api.as_ref(), config)
            .wrap_err_with(|| format!("failed to build kibana search {}", config.name))?;
        log::info!("Updating Kibana search {}", id);
        api.update(id, &request)
            .await
            .wrap_err_with(|| format!("failed to update kibana saved search {}", id))?;
        Ok(())
    }

    async fn delete(&self, client: &KibanaClient, id: &str) -> Result<()> {
        log::info!("Deleting Kibana search {}", id);
        client
            .search()
            .delete(id)
            .await
            .wrap_err_with(|| format!("could not delete kibana search {}", id))
    }
}
