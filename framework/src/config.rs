use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub use config::ConfigError;

use crate::mail::{MailerConfig, SmtpTls};

pub trait EnvConfig: Sized {
    fn from_env() -> Result<Self, ConfigError>;
    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError>;
}

impl<D> EnvConfig for D
where
    D: DeserializeOwned,
{
    fn from_env() -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }
}

/// Process-wide settings, read once at startup.
///
/// `EMAIL_ADDRESS` and `EMAIL_PASSWORD` are required; every other field has a
/// default. A `.env` file in the working directory is honoured by
/// [`AppConfig::load`].
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Mail account identifier, also used as the sender address.
    pub email_address: String,
    /// Mail account secret.
    pub email_password: String,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_tls: SmtpTls,
    /// Connection timeout in seconds.
    #[serde(default = "default_smtp_timeout")]
    pub smtp_timeout: u64,

    /// `redis://...` for the external broker, or `memory` for an in-process queue.
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    #[serde(default = "default_broker_timeout_ms")]
    pub broker_timeout_ms: u64,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
}

impl AppConfig {
    /// Load `.env` (if present) and then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: Some(self.email_address.clone()),
            password: Some(self.email_password.clone()),
            from: self.email_address.clone(),
            tls: self.smtp_tls,
            timeout: self.smtp_timeout,
        }
    }

    pub fn broker_timeout(&self) -> Duration {
        Duration::from_millis(self.broker_timeout_ms)
    }
}

// Credentials stay out of debug output.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("email_address", &self.email_address)
            .field("email_password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_tls", &self.smtp_tls)
            .field("smtp_timeout", &self.smtp_timeout)
            .field("broker_url", &self.broker_url)
            .field("broker_timeout_ms", &self.broker_timeout_ms)
            .field("queue_name", &self.queue_name)
            .field("log_path", &self.log_path)
            .field("port", &self.port)
            .field("worker_concurrency", &self.worker_concurrency)
            .finish()
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u64 {
    10
}

fn default_broker_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_broker_timeout_ms() -> u64 {
    2000
}

fn default_queue_name() -> String {
    "default".to_string()
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/log/messaging_system.log")
}

fn default_port() -> u16 {
    8000
}

fn default_worker_concurrency() -> usize {
    4
}
