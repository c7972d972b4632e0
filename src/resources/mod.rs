//! Declarative resources
//!
//! Each resource maps a flat, user-facing configuration (as written in a
//! YAML file) to the nested request of its Kibana client and back. Reading
//! an object that no longer exists yields `Ok(None)` so callers can forget
//! the id they were tracking.

pub mod dashboard;
pub mod hash;
pub mod index;
pub mod index_pattern;
pub mod provider;
pub mod role;
pub mod search;
pub mod space;
pub mod visualization;

pub use dashboard::{DashboardConfig, DashboardResource};
pub use hash::{ContentHash, HashedSet};
pub use index::{IndexFilter, IndexPatternData, read_index};
pub use index_pattern::{IndexPatternConfig, IndexPatternResource};
pub use provider::Provider;
pub use role::{RoleConfig, RoleResource};
pub use search::{SearchConfig, SearchResource};
pub use space::{SpaceConfig, SpaceResource};
pub use visualization::{VisualizationConfig, VisualizationResource};

use crate::client::{self, KibanaClient};
use crate::kibana::Reference;
use eyre::{Report, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;

/// Create, read, update and delete one kind of Kibana object from its
/// declarative configuration.
pub trait Resource {
    /// Kind name used in logs and on the command line.
    const KIND: &'static str;

    type Config: Serialize + DeserializeOwned + Send + Sync;

    /// Create the object and return its id.
    fn create(
        &self,
        client: &KibanaClient,
        config: &Self::Config,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Current configuration of the object, `None` when it is gone.
    fn read(
        &self,
        client: &KibanaClient,
        id: &str,
    ) -> impl Future<Output = Result<Option<Self::Config>>> + Send;

    fn update(
        &self,
        client: &KibanaClient,
        id: &str,
        config: &Self::Config,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, client: &KibanaClient, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Turn a not-found read into `None`, wrapping any other error.
pub(crate) fn found<T>(kind: &str, id: &str, result: client::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            log::warn!("Removing {} {} because it's gone", kind, id);
            Ok(None)
        }
        Err(e) => Err(Report::new(e).wrap_err(format!("failed to read {} {}", kind, id))),
    }
}

/// Whether an error chain bottoms out in a not-found client error.
pub fn is_not_found(report: &Report) -> bool {
    report
        .downcast_ref::<client::Error>()
        .is_some_and(client::Error::is_not_found)
}

/// Re-encode a JSON string with sorted keys and no whitespace so the same
/// document always reads back identically. Invalid JSON is returned as is.
pub fn normalize_json(json: &str) -> String {
    if json.trim().is_empty() {
        return String::new();
    }
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(value) => value.to_string(),
        Err(_) => json.to_string(),
    }
}

impl ContentHash for Reference {
    fn content_key(&self) -> String {
        format!("{}-{}-{}", self.name, self.reference_type, self.id)
    }
}

/// References as a plain list in hash order.
pub(crate) fn reference_list(references: &HashedSet<Reference>) -> Vec<Reference> {
    references.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kibana::ReferenceType;

    #[test]
    fn test_normalize_json() {
        assert_eq!(
            normalize_json("{ \"b\": 1,\n  \"a\": [1, 2] }"),
            r#"{"a":[1,2],"b":1}"#
        );
        assert_eq!(normalize_json("not json"), "not json");
        assert_eq!(normalize_json("  "), "");
    }

    #[test]
    fn test_found_maps_not_found_to_none() {
        let err = client::Error::NotFound {
            url: "http://localhost:5601/api/saved_objects/search/x".to_string(),
            status: 404,
            body: String::new(),
            message: "Could not fetch search".to_string(),
        };
        assert!(found::<()>("search", "x", Err(err)).unwrap().is_none());
        assert_eq!(found("search", "x", Ok(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_found_wraps_other_errors() {
        let err = client::Error::Api {
            method: "GET".to_string(),
            url: "http://localhost:5601".to_string(),
            status: 400,
            body: String::new(),
            message: "Could not fetch search".to_string(),
        };
        let report = found::<()>("search", "x", Err(err)).unwrap_err();
        assert!(!is_not_found(&report));
        assert!(report.to_string().contains("failed to read search x"));
    }

    #[test]
    fn test_is_not_found_through_context() {
        let report = Report::new(client::Error::NotFound {
            url: String::new(),
            status: 404,
            body: String::new(),
            message: "gone".to_string(),
        })
        .wrap_err("while updating");
        assert!(is_not_found(&report));
    }

    #[test]
    fn test_reference_content_key() {
        let a = Reference::new("search_1", ReferenceType::Search, "abc");
        let b = Reference::new("search_1", ReferenceType::Search, "abd");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
