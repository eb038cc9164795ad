//! Background job that sends the fixed notification to one address.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Email, Mailer, SmtpMailer};
use crate::jobs::{Job, JobResult};
use crate::log_sink::LogSink;

/// Application state that provides a mailer and the sender address.
pub trait HasMailer: Send + Sync + 'static {
    type Mailer: Mailer;
    fn mailer(&self) -> &Self::Mailer;
    fn sender(&self) -> &str;
}

/// Application state that provides the shared [`LogSink`].
pub trait HasLogSink: Send + Sync + 'static {
    fn log_sink(&self) -> &LogSink;
}

/// Context handed to the worker in production.
#[derive(Clone)]
pub struct WorkerContext {
    pub mailer: SmtpMailer,
    pub sender: String,
    pub sink: LogSink,
}

impl HasMailer for WorkerContext {
    type Mailer = SmtpMailer;

    fn mailer(&self) -> &SmtpMailer {
        &self.mailer
    }

    fn sender(&self) -> &str {
        &self.sender
    }
}

impl HasLogSink for WorkerContext {
    fn log_sink(&self) -> &LogSink {
        &self.sink
    }
}

/// Send the fixed notification to `to`.
///
/// One attempt only. Either way exactly one entry lands in the log sink:
/// `Email sent to <to>` or `Failed to send email to <to>. Error: <detail>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendEmailJob<S = WorkerContext> {
    pub to: String,
    #[serde(skip)]
    _marker: std::marker::PhantomData<S>,
}

impl<S> SendEmailJob<S> {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S: HasMailer + HasLogSink> Job for SendEmailJob<S> {
    const JOB_TYPE: &'static str = "courier::send_email";
    type Context = S;

    async fn perform(self, ctx: &Self::Context) -> JobResult {
        let outcome = match Email::fixed_notice(ctx.sender(), &self.to) {
            Ok(email) => ctx.mailer().send(&email).await,
            Err(e) => Err(e),
        };

        let sink = ctx.log_sink();
        match outcome {
            Ok(()) => {
                if let Err(e) = sink.info(format!("Email sent to {}", self.to)).await {
                    tracing::error!(error = %e, path = %sink.path().display(), "failed to write log sink");
                }
                Ok(())
            }
            Err(err) => {
                let line = format!("Failed to send email to {}. Error: {}", self.to, err);
                if let Err(e) = sink.error(line).await {
                    tracing::error!(error = %e, path = %sink.path().display(), "failed to write log sink");
                }
                Err(err.into())
            }
        }
    }
}
