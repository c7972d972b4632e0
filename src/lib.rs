//! Kibana Provisioner
//!
//! Declarative create, read, update and delete of Kibana saved objects,
//! spaces and roles across legacy and modern Kibana APIs, for self-hosted
//! Kibana and Logz.io.

pub mod cli;
pub mod client;
pub mod config;
pub mod kibana;
pub mod resources;

// Re-exports for convenience
pub use client::{Auth, Error, KibanaClient};
pub use config::{Config, KibanaType};
pub use resources::{Provider, Resource};
