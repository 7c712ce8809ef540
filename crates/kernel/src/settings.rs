use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load `base.toml` and `<environment>.toml` from `config_dir`, then
    /// apply `BOOKSHELF__SECTION__KEY` environment overrides.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    /// Unset means no server-side timeout; the proxy waits for upstream.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    #[serde(default = "ProxySettings::default_upstream_origin")]
    pub upstream_origin: String,
    #[serde(default = "ProxySettings::default_prefix")]
    pub prefix: String,
    /// When set, only these inbound headers are forwarded upstream.
    #[serde(default)]
    pub allowed_headers: Option<Vec<String>>,
}

impl ProxySettings {
    fn default_upstream_origin() -> String {
        "http://127.0.0.1:8080".to_string()
    }

    fn default_prefix() -> String {
        "api".to_string()
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            upstream_origin: Self::default_upstream_origin(),
            prefix: Self::default_prefix(),
            allowed_headers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "ClientSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "ClientSettings::default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "ClientSettings::default_search_page_size")]
    pub search_page_size: u32,
    #[serde(default = "ClientSettings::default_list_page_size")]
    pub list_page_size: u32,
}

impl ClientSettings {
    fn default_base_url() -> String {
        "http://127.0.0.1:3000/api".to_string()
    }

    fn default_state_dir() -> PathBuf {
        PathBuf::from(".bookshelf")
    }

    fn default_search_page_size() -> u32 {
        28
    }

    fn default_list_page_size() -> u32 {
        12
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            state_dir: Self::default_state_dir(),
            search_page_size: Self::default_search_page_size(),
            list_page_size: Self::default_list_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "ImageSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "ImageSettings::default_model")]
    pub model: String,
    #[serde(default = "ImageSettings::default_size")]
    pub size: String,
}

impl ImageSettings {
    fn default_endpoint() -> String {
        "https://api.openai.com/v1/images/generations".to_string()
    }

    fn default_model() -> String {
        "dall-e-3".to_string()
    }

    fn default_size() -> String {
        "1024x1792".to_string()
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            model: Self::default_model(),
            size: Self::default_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiSettings {
    #[serde(default = "UiSettings::default_toast_duration_ms")]
    pub toast_duration_ms: u64,
}

impl UiSettings {
    fn default_toast_duration_ms() -> u64 {
        3000
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            toast_duration_ms: Self::default_toast_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
