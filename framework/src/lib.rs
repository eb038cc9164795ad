pub mod config;
pub mod error;
pub mod jobs;
pub mod log_sink;
pub mod mail;
pub mod routes;
pub mod serve;

pub use crate::config::{AppConfig, EnvConfig};
pub use crate::log_sink::LogSink;
pub use crate::serve::{serve, shutdown_signal};
