use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Listening port (default: 4000)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    /// Answer service endpoint every query is forwarded to
    #[serde(default = "default_downstream_url")]
    pub url: String,
    /// Upper bound on a single downstream call
    #[serde(default = "default_downstream_timeout")]
    pub timeout_secs: u64,
}

fn default_downstream_url() -> String {
    "http://127.0.0.1:8468/".to_string()
}

fn default_downstream_timeout() -> u64 {
    30
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: default_downstream_url(),
            timeout_secs: default_downstream_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` matches any origin
    #[serde(default = "default_origins", deserialize_with = "string_or_list")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_methods", deserialize_with = "string_or_list")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_headers", deserialize_with = "string_or_list")]
    pub allowed_headers: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    vec!["POST".to_string()]
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
        }
    }
}

/// Accepts either a list or a single comma-separated string, so
/// `ASKER_CORS__ALLOWED_ORIGINS=https://a.example,https://b.example` works.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::One(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        Raw::Many(v) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Relay endpoint the `ask` command talks to
    #[serde(default = "default_client_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

fn default_client_endpoint() -> String {
    "http://127.0.0.1:4000/api/data".to_string()
}

fn default_client_timeout() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_client_endpoint(),
            timeout_secs: default_client_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("downstream.timeout_secs", default_downstream_timeout() as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ASKER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // ASKER_SERVER__PORT, ASKER_DOWNSTREAM__URL, ASKER_CORS__ALLOWED_ORIGINS, ...
            .add_source(
                Environment::with_prefix("ASKER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for a relay in front of `downstream_url` with defaults elsewhere
    pub fn with_downstream(downstream_url: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            downstream: DownstreamConfig {
                url: downstream_url.to_string(),
                timeout_secs: default_downstream_timeout(),
            },
            cors: CorsConfig::default(),
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.downstream.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "downstream.url must use http or https, got scheme `{}`",
                url.scheme()
            )),
            Err(e) => errors.push(format!("downstream.url is not a valid URL: {e}")),
        }

        if self.downstream.timeout_secs == 0 {
            errors.push("downstream.timeout_secs must be positive".to_string());
        }

        if self.cors.allowed_origins.is_empty() {
            errors.push("cors.allowed_origins must list at least one origin (or `*`)".to_string());
        }

        if self.cors.allowed_methods.is_empty() {
            errors.push("cors.allowed_methods must not be empty".to_string());
        }

        if self.client.timeout_secs == 0 {
            errors.push("client.timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
