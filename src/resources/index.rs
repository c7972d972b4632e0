//! Index pattern lookup
//!
//! Resolves a set of title filters to the id of an existing index pattern so
//! other resources can point at it without hard-coding backend ids.

use super::hash::{ContentHash, HashedSet};
use crate::client::{Error, KibanaClient};
use crate::kibana::index_pattern::INDEX_PATTERN_TYPE;
use crate::kibana::saved_objects::UntypedSavedObject;
use crate::kibana::SavedObjectQuery;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LOOKUP_PAGE_SIZE: u32 = 100;

/// Passes when the pattern title equals one of `values`. `name` only labels
/// the filter; every filter compares the title.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl ContentHash for IndexFilter {
    fn content_key(&self) -> String {
        format!("{}-{}", self.name, self.values.join(","))
    }
}

impl std::fmt::Display for IndexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in [{}]", self.name, self.values.join(", "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPatternData {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_field_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fields: String,
}

fn attribute(object: &UntypedSavedObject, name: &str) -> String {
    match object.attributes.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Every filter must be satisfied.
pub fn matches_filters(object: &UntypedSavedObject, filters: &HashedSet<IndexFilter>) -> bool {
    let title = object.attributes.get("title").and_then(Value::as_str);
    filters
        .iter()
        .all(|filter| title.is_some_and(|t| filter.values.iter().any(|v| v == t)))
}

/// First index pattern matching all of `filters`.
pub async fn read_index(
    client: &KibanaClient,
    filters: &HashedSet<IndexFilter>,
) -> Result<IndexPatternData> {
    if filters.is_empty() {
        return Err(Error::Precondition("No filter provided".to_string()).into());
    }
    log::info!("Reading kibana indexes");

    let query = SavedObjectQuery::builder()
        .with_type(INDEX_PATTERN_TYPE)
        .with_fields(vec![
            "title".to_string(),
            "timeFieldName".to_string(),
            "fields".to_string(),
        ])
        .with_per_page(LOOKUP_PAGE_SIZE)
        .build();

    let page = client
        .saved_objects()
        .get_by_type(&query)
        .await
        .wrap_err("failed to list index patterns")?;

    let Some(object) = page
        .saved_objects
        .iter()
        .find(|object| matches_filters(object, filters))
    else {
        let described: Vec<String> = filters.iter().map(ToString::to_string).collect();
        eyre::bail!(
            "unable to locate a saved index matching the provided filter: {}",
            described.join("; ")
        );
    };

    log::debug!("Index filter resolved to {}", object.id);
    Ok(IndexPatternData {
        id: object.id.clone(),
        title: attribute(object, "title"),
        time_field_name: attribute(object, "timeFieldName"),
        fields: attribute(object, "fields"),
    })
}
