//! Connection configuration
//!
//! [`Config`] is built once (usually from the environment) and then shared
//! read-only by every resource client and the authentication handler.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_ELASTIC_SEARCH_PATH: &str = "ELASTIC_SEARCH_PATH";
pub const ENV_KIBANA_URI: &str = "KIBANA_URI";
pub const ENV_KIBANA_USERNAME: &str = "KIBANA_USERNAME";
pub const ENV_KIBANA_PASSWORD: &str = "KIBANA_PASSWORD";
pub const ENV_KIBANA_VERSION: &str = "ELK_VERSION";
pub const ENV_KIBANA_INDEX_ID: &str = "KIBANA_INDEX_ID";
pub const ENV_KIBANA_TYPE: &str = "KIBANA_TYPE";
pub const ENV_KIBANA_DEBUG: &str = "KIBANA_DEBUG";
pub const ENV_KIBANA_INSECURE: &str = "KIBANA_INSECURE";
pub const ENV_LOGZ_CLIENT_ID: &str = "LOGZ_CLIENT_ID";
pub const ENV_LOGZ_MFA_SECRET: &str = "LOGZ_MFA_SECRET";
pub const ENV_LOGZ_ACCOUNT_ID: &str = "LOGZ_ACCOUNT_ID";
pub const ENV_LOGZ_AUTH0_URI: &str = "LOGZ_AUTH0_URI";

pub const DEFAULT_KIBANA_URI: &str = "http://localhost:5601";
pub const DEFAULT_ELASTIC_SEARCH_PATH: &str = "/es_admin/.kibana";
pub const DEFAULT_KIBANA_VERSION_553: &str = "5.5.3";
pub const DEFAULT_KIBANA_VERSION_6: &str = "6.0.0";
pub const DEFAULT_KIBANA_VERSION_7: &str = "7.3.1";
pub const DEFAULT_LOGZIO_VERSION: &str = "6.3.2";
pub const DEFAULT_KIBANA_VERSION: &str = DEFAULT_KIBANA_VERSION_6;
pub const DEFAULT_KIBANA_INDEX_ID: &str = "logstash-*";
pub const DEFAULT_KIBANA_INDEX_ID_LOGZIO: &str = "[logzioCustomerIndex]YYMMDD";
pub const DEFAULT_AUTH0_URI: &str = "https://logzio.auth0.com";

/// Product variant of the Kibana being managed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KibanaType {
    /// Self-hosted Kibana
    #[default]
    #[serde(rename = "KibanaTypeVanilla")]
    Vanilla,
    /// Logz.io hosted Kibana with its own login flow
    #[serde(rename = "KibanaTypeLogzio")]
    Logzio,
}

impl KibanaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vanilla => "KibanaTypeVanilla",
            Self::Logzio => "KibanaTypeLogzio",
        }
    }
}

impl std::fmt::Display for KibanaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KibanaType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kibanatypevanilla" | "vanilla" => Ok(Self::Vanilla),
            "kibanatypelogzio" | "logzio" | "logz.io" => Ok(Self::Logzio),
            _ => Err(()),
        }
    }
}

/// Credentials for whichever authentication handler the variant needs.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub logzio_client_id: String,
    pub logzio_mfa_secret: String,
    pub logzio_account_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("logzio_client_id", &self.logzio_client_id)
            .field("logzio_mfa_secret", &"***")
            .field("logzio_account_id", &self.logzio_account_id)
            .finish()
    }
}

impl Credentials {
    pub fn has_basic(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn has_mfa(&self) -> bool {
        !self.logzio_mfa_secret.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub kibana_base_uri: String,
    pub kibana_version: String,
    pub kibana_type: KibanaType,
    pub elastic_search_path: String,
    pub default_index_id: String,
    pub debug: bool,
    pub insecure: bool,
    pub auth0_uri: String,
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kibana_base_uri: DEFAULT_KIBANA_URI.to_string(),
            kibana_version: DEFAULT_KIBANA_VERSION.to_string(),
            kibana_type: KibanaType::Vanilla,
            elastic_search_path: DEFAULT_ELASTIC_SEARCH_PATH.to_string(),
            default_index_id: DEFAULT_KIBANA_INDEX_ID.to_string(),
            debug: false,
            insecure: false,
            auth0_uri: DEFAULT_AUTH0_URI.to_string(),
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    /// A vanilla config pointing at `base_uri` with the given backend version.
    pub fn new(base_uri: impl AsRef<str>, version: impl Into<String>) -> Self {
        Self {
            kibana_base_uri: base_uri.as_ref().trim_end_matches('/').to_string(),
            kibana_version: version.into(),
            ..Self::default()
        }
    }

    /// Switch the variant, adjusting the default index id to match.
    pub fn with_type(mut self, kibana_type: KibanaType) -> Self {
        if self.default_index_id == default_index_for(self.kibana_type) {
            self.default_index_id = default_index_for(kibana_type).to_string();
        }
        self.kibana_type = kibana_type;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_ELASTIC_SEARCH_PATH) {
            config.elastic_search_path = value;
        }
        if let Some(value) = get(ENV_KIBANA_URI) {
            config.kibana_base_uri = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = get(ENV_KIBANA_VERSION) {
            config.kibana_version = value;
        }
        if let Some(value) = get(ENV_KIBANA_TYPE) {
            match value.parse() {
                Ok(kibana_type) => config.kibana_type = kibana_type,
                Err(()) => log::warn!(
                    "Unknown {} '{}', using {}",
                    ENV_KIBANA_TYPE,
                    value,
                    config.kibana_type
                ),
            }
        }
        config.default_index_id = get(ENV_KIBANA_INDEX_ID)
            .unwrap_or_else(|| default_index_for(config.kibana_type).to_string());
        config.debug = get(ENV_KIBANA_DEBUG).is_some();
        config.insecure = get(ENV_KIBANA_INSECURE)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        if let Some(value) = get(ENV_LOGZ_AUTH0_URI) {
            config.auth0_uri = value.trim_end_matches('/').to_string();
        }

        config.credentials = Credentials {
            username: get(ENV_KIBANA_USERNAME).unwrap_or_default(),
            password: get(ENV_KIBANA_PASSWORD).unwrap_or_default(),
            logzio_client_id: get(ENV_LOGZ_CLIENT_ID).unwrap_or_default(),
            logzio_mfa_secret: get(ENV_LOGZ_MFA_SECRET).unwrap_or_default(),
            logzio_account_id: get(ENV_LOGZ_ACCOUNT_ID).unwrap_or_default(),
        };

        config
    }

    /// Full url of a document behind the Elasticsearch proxy path.
    pub fn build_full_path(&self, suffix: &str) -> String {
        format!(
            "{}{}{}",
            self.kibana_base_uri, self.elastic_search_path, suffix
        )
    }

    /// Full url of a native Kibana API path.
    pub fn api_path(&self, suffix: &str) -> String {
        format!("{}{}", self.kibana_base_uri, suffix)
    }

    pub fn is_logzio(&self) -> bool {
        self.kibana_type == KibanaType::Logzio
    }
}

fn default_index_for(kibana_type: KibanaType) -> &'static str {
    match kibana_type {
        KibanaType::Vanilla => DEFAULT_KIBANA_INDEX_ID,
        KibanaType::Logzio => DEFAULT_KIBANA_INDEX_ID_LOGZIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.kibana_base_uri, DEFAULT_KIBANA_URI);
        assert_eq!(config.kibana_version, DEFAULT_KIBANA_VERSION);
        assert_eq!(config.kibana_type, KibanaType::Vanilla);
        assert_eq!(config.elastic_search_path, DEFAULT_ELASTIC_SEARCH_PATH);
        assert_eq!(config.default_index_id, DEFAULT_KIBANA_INDEX_ID);
        assert!(!config.debug);
        assert!(!config.insecure);
    }

    #[test]
    fn test_logzio_default_index() {
        let config = Config::from_lookup(lookup(&[(ENV_KIBANA_TYPE, "KibanaTypeLogzio")]));
        assert_eq!(config.kibana_type, KibanaType::Logzio);
        assert_eq!(config.default_index_id, DEFAULT_KIBANA_INDEX_ID_LOGZIO);
    }

    #[test]
    fn test_uri_trailing_slash_trimmed() {
        let config = Config::from_lookup(lookup(&[
            (ENV_KIBANA_URI, "http://kibana:5601/"),
            (ENV_KIBANA_DEBUG, "1"),
            (ENV_KIBANA_INSECURE, "true"),
        ]));
        assert_eq!(config.kibana_base_uri, "http://kibana:5601");
        assert!(config.debug);
        assert!(config.insecure);
        assert_eq!(
            config.build_full_path("/search/abc"),
            "http://kibana:5601/es_admin/.kibana/search/abc"
        );
    }

    #[test]
    fn test_unknown_type_keeps_vanilla() {
        let config = Config::from_lookup(lookup(&[(ENV_KIBANA_TYPE, "splunk")]));
        assert_eq!(config.kibana_type, KibanaType::Vanilla);
    }

    #[test]
    fn test_with_type_moves_default_index() {
        let config = Config::new("http://localhost:5601", "6.3.2").with_type(KibanaType::Logzio);
        assert_eq!(config.default_index_id, DEFAULT_KIBANA_INDEX_ID_LOGZIO);
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let credentials = Credentials {
            username: "elastic".to_string(),
            password: "changeme".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("elastic"));
        assert!(!printed.contains("changeme"));
        assert!(credentials.has_basic());
        assert!(!credentials.has_mfa());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env() {
        unsafe {
            std::env::set_var(ENV_KIBANA_VERSION, "5.5.3");
            std::env::set_var(ENV_KIBANA_USERNAME, "elastic");
        }

        let config = Config::from_env();
        assert_eq!(config.kibana_version, "5.5.3");
        assert_eq!(config.credentials.username, "elastic");

        unsafe {
            std::env::remove_var(ENV_KIBANA_VERSION);
            std::env::remove_var(ENV_KIBANA_USERNAME);
        }
    }
}
