//! Configuration for Bucket Relay

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::matcher::{PathMatcher, DEFAULT_CSV_PATTERN};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

impl RelayConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Configuration(format!("Failed to read config {}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Where two variable names are accepted
    /// the first one wins.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(addr) = get(&["RELAY_BIND_ADDRESS"]) {
            config.server.bind_address = addr;
        }
        if let Some(port) = get(&["PORT", "RELAY_PORT"]) {
            match port.parse() {
                Ok(p) => config.server.port = p,
                Err(_) => warn!("Ignoring invalid port {:?}", port),
            }
        }
        if let Some(level) = get(&["RELAY_LOG_LEVEL"]) {
            config.logging.level = level;
        }
        if let Some(format) = get(&["RELAY_LOG_FORMAT"]) {
            config.logging.format = format;
        }

        if let Some(project) = get(&["PROJECT_ID"]) {
            config.routing.project_id = project;
        }
        if let Some(topic) = get(&["TOPIC_NAME", "PUBLISH_TOPIC_NAME"]) {
            config.routing.topic_name = topic;
        }
        if let Some(pattern) = get(&["CSV_PATTERN_REGEX"]) {
            config.routing.csv_pattern = pattern;
        }

        if let Some(secret) = get(&["SA_CREDENTIALS_SECRET_NAME"]) {
            config.credentials.secret_name = secret;
        }
        if let Some(target) = get(&["IMPERSONATE_SA", "PUBLISH_SA"]) {
            config.credentials.impersonate_service_account = target;
        }
        if let Some(scopes) = get(&["TARGET_SCOPES"]) {
            let scopes = parse_scopes(&scopes);
            if !scopes.is_empty() {
                config.credentials.target_scopes = scopes;
            }
        }

        config
    }

    /// Check that every value needed to route and publish is present
    pub fn validate(&self) -> crate::Result<()> {
        self.routing.validate()?;
        self.credentials.validate()?;
        Ok(())
    }
}

/// Split a comma-separated scope list
pub fn parse_scopes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn require(value: &str, name: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::Error::Configuration(format!(
            "Missing required value: {}",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Where matching objects are announced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub project_id: String,
    /// Short topic name or a full `projects/{p}/topics/{t}` path
    pub topic_name: String,
    /// Object path pattern with 1 to 3 capture groups
    pub csv_pattern: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            topic_name: String::new(),
            csv_pattern: DEFAULT_CSV_PATTERN.to_string(),
        }
    }
}

impl RoutingConfig {
    /// Fully qualified topic path
    pub fn topic_path(&self) -> String {
        if self.topic_name.starts_with("projects/") {
            self.topic_name.clone()
        } else {
            format!("projects/{}/topics/{}", self.project_id, self.topic_name)
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require(&self.project_id, "PROJECT_ID")?;
        require(&self.topic_name, "TOPIC_NAME or PUBLISH_TOPIC_NAME")?;
        PathMatcher::new(&self.csv_pattern)?;
        Ok(())
    }
}

/// Delegated publishing identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Secret holding the base service-account key
    pub secret_name: String,
    /// Service account to impersonate when publishing
    pub impersonate_service_account: String,
    pub target_scopes: Vec<String>,
    pub token_lifetime_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            secret_name: String::new(),
            impersonate_service_account: String::new(),
            target_scopes: vec![crate::types::CLOUD_PLATFORM_SCOPE.to_string()],
            token_lifetime_secs: crate::DELEGATED_TOKEN_LIFETIME_SECS,
        }
    }
}

impl CredentialsConfig {
    /// Secret version resource name for the given project.
    ///
    /// Accepts a bare secret name, a secret path or a full version path.
    pub fn secret_version_name(&self, project_id: &str) -> String {
        let name = self.secret_name.trim_end_matches('/');
        if name.starts_with("projects/") {
            if name.contains("/versions/") {
                name.to_string()
            } else {
                format!("{}/versions/latest", name)
            }
        } else {
            format!("projects/{}/secrets/{}/versions/latest", project_id, name)
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require(&self.secret_name, "SA_CREDENTIALS_SECRET_NAME")?;
        require(&self.impersonate_service_account, "IMPERSONATE_SA or PUBLISH_SA")?;
        if self.target_scopes.is_empty() {
            return Err(crate::Error::Configuration(
                "TARGET_SCOPES must name at least one scope".into(),
            ));
        }
        if self.token_lifetime_secs == 0 {
            return Err(crate::Error::Configuration(
                "token_lifetime_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Google API base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub pubsub: String,
    pub secret_manager: String,
    pub iam_credentials: String,
    /// Compute metadata server used for the runtime's ambient identity
    pub metadata: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            pubsub: "https://pubsub.googleapis.com".to_string(),
            secret_manager: "https://secretmanager.googleapis.com".to_string(),
            iam_credentials: "https://iamcredentials.googleapis.com".to_string(),
            metadata: "http://metadata.google.internal".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PROJECT_ID", "acep-ingest"),
            ("TOPIC_NAME", "csv-arrivals"),
            ("SA_CREDENTIALS_SECRET_NAME", "loader-key"),
            ("IMPERSONATE_SA", "publisher@acep-ingest.iam.gserviceaccount.com"),
            (
                "TARGET_SCOPES",
                "https://www.googleapis.com/auth/pubsub, https://www.googleapis.com/auth/cloud-platform",
            ),
        ]
    }

    #[test]
    fn test_from_lookup_reads_all_values() {
        let mut env = full_env();
        env.push(("PORT", "9090"));
        env.push(("RELAY_LOG_FORMAT", "json"));
        let config = RelayConfig::from_lookup(lookup_from(&env));

        assert_eq!(config.routing.project_id, "acep-ingest");
        assert_eq!(config.routing.topic_name, "csv-arrivals");
        assert_eq!(config.routing.csv_pattern, DEFAULT_CSV_PATTERN);
        assert_eq!(config.credentials.secret_name, "loader-key");
        assert_eq!(
            config.credentials.target_scopes,
            vec![
                "https://www.googleapis.com/auth/pubsub".to_string(),
                "https://www.googleapis.com/auth/cloud-platform".to_string(),
            ]
        );
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alternate_variable_names() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("PUBLISH_TOPIC_NAME", "alt-topic"),
            ("PUBLISH_SA", "alt@p.iam.gserviceaccount.com"),
        ]));
        assert_eq!(config.routing.topic_name, "alt-topic");
        assert_eq!(
            config.credentials.impersonate_service_account,
            "alt@p.iam.gserviceaccount.com"
        );

        let config = RelayConfig::from_lookup(lookup_from(&[
            ("TOPIC_NAME", ""),
            ("PUBLISH_TOPIC_NAME", "fallback"),
        ]));
        assert_eq!(config.routing.topic_name, "fallback");
    }

    #[test]
    fn test_missing_values_fail_validation() {
        let env: Vec<_> = full_env()
            .into_iter()
            .filter(|(k, _)| *k != "SA_CREDENTIALS_SECRET_NAME")
            .collect();
        let config = RelayConfig::from_lookup(lookup_from(&env));

        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "ConfigurationError");
        assert!(err.to_string().contains("SA_CREDENTIALS_SECRET_NAME"));

        let config = RelayConfig::from_lookup(lookup_from(&[]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_pattern_fails_validation() {
        let mut env = full_env();
        env.push(("CSV_PATTERN_REGEX", r"^\d{4}/\d{2}/[\w-]+\.csv$"));
        let config = RelayConfig::from_lookup(lookup_from(&env));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn test_empty_scopes_fail_validation() {
        let mut env = full_env();
        env.retain(|(k, _)| *k != "TARGET_SCOPES");
        env.push(("TARGET_SCOPES", " , "));
        let mut config = RelayConfig::from_lookup(lookup_from(&env));
        // Blank list leaves the default scope in place
        assert_eq!(config.credentials.target_scopes.len(), 1);

        config.credentials.target_scopes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_topic_path() {
        let mut routing = RoutingConfig {
            project_id: "p1".into(),
            topic_name: "t1".into(),
            ..Default::default()
        };
        assert_eq!(routing.topic_path(), "projects/p1/topics/t1");

        routing.topic_name = "projects/other/topics/t2".into();
        assert_eq!(routing.topic_path(), "projects/other/topics/t2");
    }

    #[test]
    fn test_secret_version_name() {
        let mut creds = CredentialsConfig {
            secret_name: "loader-key".into(),
            ..Default::default()
        };
        assert_eq!(
            creds.secret_version_name("p1"),
            "projects/p1/secrets/loader-key/versions/latest"
        );

        creds.secret_name = "projects/p2/secrets/loader-key".into();
        assert_eq!(
            creds.secret_version_name("p1"),
            "projects/p2/secrets/loader-key/versions/latest"
        );

        creds.secret_name = "projects/p2/secrets/loader-key/versions/3".into();
        assert_eq!(
            creds.secret_version_name("p1"),
            "projects/p2/secrets/loader-key/versions/3"
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_address = "127.0.0.1"
port = 7070
metrics_enabled = false

[routing]
project_id = "acep-ingest"
topic_name = "csv-arrivals"
csv_pattern = '^(\w+)/(\w+)\.csv$'

[credentials]
secret_name = "loader-key"
impersonate_service_account = "publisher@acep-ingest.iam.gserviceaccount.com"
target_scopes = ["https://www.googleapis.com/auth/pubsub"]
token_lifetime_secs = 600
"#
        )
        .unwrap();

        let config = RelayConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 7070);
        assert!(!config.server.metrics_enabled);
        assert_eq!(config.routing.csv_pattern, r"^(\w+)/(\w+)\.csv$");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.endpoints.pubsub, "https://pubsub.googleapis.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let err = RelayConfig::from_file("/nonexistent/relay.toml").unwrap_err();
        assert_eq!(err.code(), "ConfigurationError");
    }
}
