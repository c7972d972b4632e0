//! Saved searches
//!
//! A search stores its index, query and filters as an encoded JSON string
//! (`kibanaSavedObjectMeta.searchSourceJSON`). [`SearchSource`] is the typed
//! form of that string; the builders here produce it and the request body.

use super::saved_object::{
    KibanaSavedObjectMeta, LegacyApi, ModernApi, Reference, ReferenceType, SavedObject,
    SavedObjectClient, SavedObjectRequest, validate_references,
};
use crate::client::{Error, KibanaClient, Result, VersionTable};
use crate::config::{DEFAULT_KIBANA_VERSION_553, DEFAULT_KIBANA_VERSION_6, DEFAULT_KIBANA_VERSION_7};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEARCH_TYPE: &str = "search";

/// Reference types a search may carry.
pub const SEARCH_REFERENCE_TYPES: &[ReferenceType] = &[ReferenceType::IndexPattern];

pub type Search = SavedObject<SearchAttributes>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchAttributes {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hits: i64,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "kibanaSavedObjectMeta", default)]
    pub kibana_saved_object_meta: KibanaSavedObjectMeta,
}

impl SearchAttributes {
    pub fn search_source(&self) -> Result<SearchSource> {
        SearchSource::parse(&self.kibana_saved_object_meta.search_source_json)
    }
}

/// Query dialect accepted by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryDialect {
    /// `{"query": "...", "language": "lucene"}`
    Lucene,
    /// `{"query_string": {"query": "...", "analyze_wildcard": true}}`
    QueryString,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryString {
    pub query: String,
    #[serde(default)]
    pub analyze_wildcard: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchQuery {
    QueryString { query_string: QueryString },
    Language { query: String, language: String },
}

impl SearchQuery {
    pub fn new(dialect: QueryDialect, query: impl Into<String>) -> Self {
        match dialect {
            QueryDialect::Lucene => Self::Language {
                query: query.into(),
                language: "lucene".to_string(),
            },
            QueryDialect::QueryString => Self::QueryString {
                query_string: QueryString {
                    query: query.into(),
                    analyze_wildcard: true,
                },
            },
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::QueryString { query_string } => &query_string.query,
            Self::Language { query, .. } => query,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchParams {
    pub query: String,
    #[serde(rename = "type")]
    pub match_type: String,
}

impl MatchParams {
    pub fn new(query: impl Into<String>, match_type: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            match_type: match_type.into(),
        }
    }
}

/// Display annotation attached to a filter pill.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMeta {
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub meta_type: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<MatchParams>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterClause {
    Match { field: String, params: MatchParams },
    Exists { field: String },
}

/// One filter: a match or an exists clause, with an optional annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub struct SearchFilter {
    pub clause: FilterClause,
    pub meta: Option<FilterMeta>,
}

impl SearchFilter {
    pub fn matching(field: impl Into<String>, params: MatchParams) -> Self {
        Self {
            clause: FilterClause::Match {
                field: field.into(),
                params,
            },
            meta: None,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            clause: FilterClause::Exists {
                field: field.into(),
            },
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: FilterMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn field(&self) -> &str {
        match &self.clause {
            FilterClause::Match { field, .. } | FilterClause::Exists { field } => field,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<RawMatchQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exists: Option<RawExists>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<FilterMeta>,
}

#[derive(Serialize, Deserialize)]
struct RawMatchQuery {
    #[serde(rename = "match")]
    matches: BTreeMap<String, MatchParams>,
}

#[derive(Serialize, Deserialize)]
struct RawExists {
    field: String,
}

impl TryFrom<RawFilter> for SearchFilter {
    type Error = String;

    fn try_from(raw: RawFilter) -> std::result::Result<Self, Self::Error> {
        let clause = match (raw.query, raw.exists) {
            (Some(query), None) => {
                let mut matches = query.matches.into_iter();
                match (matches.next(), matches.next()) {
                    (Some((field, params)), None) => FilterClause::Match { field, params },
                    _ => return Err("a match filter must name exactly one field".to_string()),
                }
            }
            (None, Some(exists)) => FilterClause::Exists {
                field: exists.field,
            },
            _ => {
                return Err(
                    "a filter must hold exactly one of a match query or an exists clause"
                        .to_string(),
                );
            }
        };
        Ok(Self {
            clause,
            meta: raw.meta,
        })
    }
}

impl From<SearchFilter> for RawFilter {
    fn from(filter: SearchFilter) -> Self {
        let (query, exists) = match filter.clause {
            FilterClause::Match { field, params } => (
                Some(RawMatchQuery {
                    matches: BTreeMap::from([(field, params)]),
                }),
                None,
            ),
            FilterClause::Exists { field } => (None, Some(RawExists { field })),
        };
        Self {
            query,
            exists,
            meta: filter.meta,
        }
    }
}

/// Typed form of `searchSourceJSON`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSource {
    #[serde(rename = "index", default, skip_serializing_if = "Option::is_none")]
    pub index_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_ref_name: Option<String>,
    #[serde(default)]
    pub highlight_all: bool,
    #[serde(default)]
    pub version: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<SearchQuery>,
    #[serde(default)]
    pub filter: Vec<SearchFilter>,
}

impl SearchSource {
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| Error::decode("could not parse searchSourceJSON", json, e))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Precondition(format!("could not encode search source: {}", e)))
    }
}

pub struct SearchSourceBuilder {
    dialect: QueryDialect,
    index_id: Option<String>,
    index_ref_name: Option<String>,
    highlight_all: bool,
    query: Option<String>,
    filters: Vec<SearchFilter>,
}

impl SearchSourceBuilder {
    pub fn new(dialect: QueryDialect) -> Self {
        Self {
            dialect,
            index_id: None,
            index_ref_name: None,
            highlight_all: false,
            query: None,
            filters: Vec::new(),
        }
    }

    pub fn with_index_id(mut self, index_id: impl Into<String>) -> Self {
        self.index_id = Some(index_id.into());
        self
    }

    /// Point at the index through a named entry of the references list.
    pub fn with_index_ref_name(mut self, ref_name: impl Into<String>) -> Self {
        self.index_ref_name = Some(ref_name.into());
        self
    }

    pub fn with_highlight_all(mut self, highlight_all: bool) -> Self {
        self.highlight_all = highlight_all;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn build(self) -> Result<SearchSource> {
        let index_id = self.index_id.filter(|id| !id.is_empty());
        let index_ref_name = self.index_ref_name.filter(|name| !name.is_empty());
        if index_id.is_none() && index_ref_name.is_none() {
            return Err(Error::Precondition(
                "Index id is required to create a discover search source".to_string(),
            ));
        }

        Ok(SearchSource {
            index_id,
            index_ref_name,
            highlight_all: self.highlight_all,
            version: true,
            query: self.query.map(|q| SearchQuery::new(self.dialect, q)),
            filter: self.filters,
        })
    }
}

#[derive(Default)]
pub struct SearchRequestBuilder {
    title: String,
    description: String,
    display_columns: Vec<String>,
    sort_columns: Vec<String>,
    search_source: Option<SearchSource>,
    references: Vec<Reference>,
}

impl SearchRequestBuilder {
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

    pub fn with_display_columns(mut self, columns: Vec<String>) -> Self {
        self.display_columns = columns;
        self
    }

    /// Sort columns followed by the direction. No columns means no sort.
    pub fn with_sort_columns(mut self, columns: Vec<String>, order: SortOrder) -> Self {
        self.sort_columns = columns;
        if !self.sort_columns.is_empty() {
            self.sort_columns.push(order.as_str().to_string());
        }
        self
    }

    pub fn with_search_source(mut self, search_source: SearchSource) -> Self {
        self.search_source = Some(search_source);
        self
    }

    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    pub fn build(self) -> Result<SavedObjectRequest<SearchAttributes>> {
        let search_source = self.search_source.ok_or_else(|| {
            Error::Precondition("A search source is required to create a search".to_string())
        })?;
        validate_references(SEARCH_TYPE, &self.references, SEARCH_REFERENCE_TYPES)?;

        let attributes = SearchAttributes {
            title: self.title,
            description: self.description,
            hits: 0,
            columns: self.display_columns,
            sort: self.sort_columns,
            version: 1,
            kibana_saved_object_meta: KibanaSavedObjectMeta::new(search_source.to_json()?),
        };
        Ok(SavedObjectRequest::new(attributes).with_references(self.references))
    }
}

pub trait SearchClient: SavedObjectClient<SearchAttributes> {
    /// A search source builder speaking this client's query dialect.
    fn new_search_source(&self) -> SearchSourceBuilder;
}

impl SearchClient for ModernApi<SearchAttributes> {
    fn new_search_source(&self) -> SearchSourceBuilder {
        SearchSourceBuilder::new(QueryDialect::Lucene)
    }
}

impl SearchClient for LegacyApi<SearchAttributes> {
    fn new_search_source(&self) -> SearchSourceBuilder {
        SearchSourceBuilder::new(QueryDialect::QueryString)
    }
}

fn legacy(client: &KibanaClient) -> Box<dyn SearchClient> {
    Box::new(LegacyApi::<SearchAttributes>::new(client, SEARCH_TYPE))
}

fn modern(client: &KibanaClient) -> Box<dyn SearchClient> {
    Box::new(ModernApi::<SearchAttributes>::new(client, SEARCH_TYPE))
}

pub static CLIENTS: VersionTable<dyn SearchClient> = VersionTable {
    capability: SEARCH_TYPE,
    entries: &[
        (DEFAULT_KIBANA_VERSION_553, legacy),
        (DEFAULT_KIBANA_VERSION_6, modern),
        (DEFAULT_KIBANA_VERSION_7, modern),
    ],
    latest: (DEFAULT_KIBANA_VERSION_7, modern),
};
