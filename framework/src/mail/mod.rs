//! Outbound mail over SMTP and the background job that sends it.
//!
//! This module is a thin layer over [lettre](https://lettre.rs):
//!
//! ```ignore
//! let mailer = SmtpMailer::from_config(config.mailer_config())?;
//! mailer.send(&Email::fixed_notice(&config.email_address, "user@example.com")?).await?;
//!
//! // or in the background
//! enqueue(&queue, SendEmailJob::<WorkerContext>::new("user@example.com")).await?;
//! ```

mod job;
mod mailer;
mod message;

pub use job::{HasLogSink, HasMailer, SendEmailJob, WorkerContext};
pub use mailer::{Mailer, MailerConfig, SmtpMailer, SmtpTls};
pub use message::{Email, EmailBuilder, NOTICE_BODY, NOTICE_SUBJECT};

use thiserror::Error;

/// Any failure while building or submitting a message. Callers treat every
/// variant as "mail submission failed".
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
