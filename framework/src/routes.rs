//! HTTP front end.
//!
//! | Request | Effect | Body |
//! |---|---|---|
//! | `GET /?sendmail=<addr>` | enqueue a [`SendEmailJob`] | `Email sending task queued for <addr>` |
//! | `GET /?talktome=<any>` | append the current time to the log sink | `Current time logged.` |
//! | `GET /` | nothing | `No action specified.` |
//! | `GET /logs` | read the log sink | the file, as `text/plain` |
//!
//! `sendmail` wins over `talktome` when both are given. Empty values count as
//! absent and the first occurrence of a repeated parameter is used.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::jobs::{enqueue, Broker};
use crate::log_sink::LogSink;
use crate::mail::{SendEmailJob, WorkerContext};

type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct Context {
    pub queue: Broker,
    pub sink: LogSink,
}

pub fn router(ctx: Context) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/logs", get(logs))
        .with_state(ctx)
}

/// Value of the first `name` parameter, unless it is empty.
fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

async fn index(
    State(ctx): State<Context>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<String> {
    if let Some(to) = param(&params, "sendmail") {
        return send_mail(&ctx, to).await;
    }

    if param(&params, "talktome").is_some() {
        let now = OffsetDateTime::now_utc();
        let now = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
        trace_append_error(&ctx.sink, ctx.sink.info(format!("Current time logged: {now}")).await);
        return Ok("Current time logged.".to_string());
    }

    Ok("No action specified.".to_string())
}

async fn send_mail(ctx: &Context, to: &str) -> Result<String> {
    match enqueue(&ctx.queue, SendEmailJob::<WorkerContext>::new(to)).await {
        Ok(handle) => {
            tracing::info!(job_id = %handle.id, %to, "queued email job");
            Ok(format!("Email sending task queued for {to}"))
        }
        Err(source) => {
            let line = format!("Failed to queue email sending task for {to}. Error: {source}");
            trace_append_error(&ctx.sink, ctx.sink.error(line).await);
            Err(ApiError::Enqueue {
                to: to.to_string(),
                source,
            })
        }
    }
}

async fn logs(State(ctx): State<Context>) -> Result<impl IntoResponse> {
    let body = ctx.sink.read_all().await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

/// A failed append must not change the response.
fn trace_append_error(sink: &LogSink, result: std::io::Result<()>) {
    if let Err(e) = result {
        tracing::error!(error = %e, path = %sink.path().display(), "failed to write log sink");
    }
}
