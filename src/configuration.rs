use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub qdrant: QdrantSettings,
    pub generative_ai: GenerativeAiSettings,
    pub scraper: ScraperSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    // Determines if we demand the connection to be encrypted or not
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            // Try an encrypted connection, fallback to unencrypted if it fails
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        let mut options = self.without_db().database(&self.database_name);
        // Lowers sqlx logs from INFO to TRACE level.
        options.log_statements(tracing::log::LevelFilter::Trace);
        options
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub grpc_port: u16,
    /// One collection holds every user's vector records, scoped by an
    /// owner-id payload filter on each query.
    pub collection: String,
    pub collection_distance: String,
    pub collection_vector_size: u64,
}

impl QdrantSettings {
    pub fn get_grpc_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.grpc_port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerativeAiSettings {
    pub api_key: Secret<String>,
    pub base_url: String,
    /// Model used for text embeddings
    pub embedding_model: String,
    /// Model used for answer generation and chunk summarization
    pub generation_model: String,
    /// Character size of the chunks sent to the summarizer
    pub summary_chunk_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperSettings {
    /// Realistic client identity, some sites serve empty shells to unknown agents
    pub user_agent: String,
    /// Generous budget to tolerate slow or defensive sites
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub navigation_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub jwt_expire_in_s: i64,
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `local.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_APPLICATION__PORT=5001` would set `Settings.application.port`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Detects the running environment.
    // Default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // Adds in settings from environment variables (with a prefix of APP and '__' as separator)
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
