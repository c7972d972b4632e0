//! Version dispatch
//!
//! Each capability (search, visualization, ...) has a [`VersionTable`]
//! mapping backend version strings to a constructor for the concrete client.
//! An exact version match wins; anything else gets the newest known entry.

use super::kibana::KibanaClient;
use semver::Version;

/// Builds the concrete client for one capability.
pub type Constructor<C> = fn(&KibanaClient) -> Box<C>;

pub struct VersionTable<C: ?Sized + 'static> {
    pub capability: &'static str,
    pub entries: &'static [(&'static str, Constructor<C>)],
    pub latest: (&'static str, Constructor<C>),
}

impl<C: ?Sized + 'static> VersionTable<C> {
    /// The version whose constructor will be used for `version`.
    pub fn resolved_version(&self, version: &str) -> &'static str {
        self.lookup(version).0
    }

    pub fn resolve(&self, version: &str) -> Constructor<C> {
        self.lookup(version).1
    }

    pub fn build(&self, client: &KibanaClient) -> Box<C> {
        self.resolve(&client.config().kibana_version)(client)
    }

    pub fn known_versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(version, _)| *version)
    }

    fn lookup(&self, version: &str) -> (&'static str, Constructor<C>) {
        match self.entries.iter().find(|(known, _)| *known == version) {
            Some(&(known, constructor)) => (known, constructor),
            None => {
                log::debug!(
                    "No {} client registered for version '{}', using {}",
                    self.capability,
                    version,
                    self.latest.0
                );
                self.latest
            }
        }
    }
}

/// Parse a backend version, padding missing minor/patch components.
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    let core = trimmed
        .split(|c| c == '-' || c == '+')
        .next()
        .unwrap_or(trimmed);
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&parts[..3].join(".")).ok()
}

/// Whether `version` is at least `minimum`. Unparseable versions count as
/// newer than anything, matching the dispatch fallback.
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Some(version), Some(minimum)) => version >= minimum,
        _ => true,
    }
}
