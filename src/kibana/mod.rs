//! Kibana API implementations
//!
//! One submodule per capability. Each defines the typed payloads, the
//! client trait, its concrete implementations for the legacy and modern wire
//! formats, and the version table that picks between them.

pub mod dashboard;
pub mod index_pattern;
pub mod role;
pub mod saved_object;
pub mod saved_objects;
pub mod search;
pub mod space;
pub mod visualization;

pub use dashboard::{Dashboard, DashboardAttributes, DashboardClient, DashboardRequestBuilder};
pub use index_pattern::{IndexPattern, IndexPatternAttributes, IndexPatternClient};
pub use role::{Role, RoleClient, RoleElasticsearch, RoleIndex, RoleKibana};
pub use saved_object::{
    KibanaSavedObjectMeta, ObjectVersion, Reference, ReferenceType, SavedObject,
    SavedObjectClient, SavedObjectRequest, WireFormat,
};
pub use saved_objects::{SavedObjectPage, SavedObjectQuery, SavedObjectsClient};
pub use search::{
    FilterClause, FilterMeta, MatchParams, Search, SearchAttributes, SearchClient, SearchFilter,
    SearchRequestBuilder, SearchSource, SearchSourceBuilder, SortOrder,
};
pub use space::{Space, SpaceClient};
pub use visualization::{
    Visualization, VisualizationAttributes, VisualizationClient, VisualizationRequestBuilder,
};
