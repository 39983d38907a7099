//! Request assembly.
//!
//! Turns the resolved configuration of a call plus its data into a
//! [`RequestDescriptor`] and starts it on the transport.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use declarest_http::{value_to_param, HttpResponse, HttpTransport, RequestDescriptor, TransportError};

use crate::config::MergedCallConfig;
use crate::error::ApiError;

/// Join `prefix` and `path` with exactly one `/` and collapse repeated
/// slashes. The `//` of a `scheme://` prefix is kept.
pub fn join_url(prefix: &str, path: &str) -> String {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    let path = path.strip_prefix('/').unwrap_or(path);
    collapse_slashes(&format!("{}/{}", prefix, path))
}

fn collapse_slashes(url: &str) -> String {
    lazy_static! {
        static ref SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap();
        static ref SLASHES: Regex = Regex::new(r"/{2,}").unwrap();
    }

    let authority_start = SCHEME.find(url).map(|m| m.end()).unwrap_or(0);
    let (scheme, rest) = url.split_at(authority_start);
    format!("{}{}", scheme, SLASHES.replace_all(rest, "/"))
}

/// Serialize `data` as `key=value` pairs joined by `&`. `null` entries are
/// dropped.
///
/// Keys and values are form-urlencoded, so a space is written as `+`
/// rather than `%20`.
pub fn build_query(data: &Map<String, Value>) -> String {
    data.iter()
        .map(|(key, value)| {
            if value.is_null() {
                String::new()
            } else {
                format!("{}={}", encode(key), encode(&value_to_param(value)))
            }
        })
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(component: &str) -> String {
    url::form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

/// Final URL of a call: prefix and path joined, plus the query string when
/// the method does not carry a body.
pub fn request_url(data: &Value, config: &MergedCallConfig) -> String {
    let mut url = join_url(&config.prefix, &config.path);

    if let Value::Object(fields) = data {
        if !fields.is_empty() && !config.method.carries_body() {
            let query = build_query(fields);
            if !query.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&query);
            }
        }
    }
    url
}

/// The descriptor handed to the transport. `config.path` must already be
/// resolved.
pub fn describe(data: Value, config: &MergedCallConfig) -> RequestDescriptor {
    RequestDescriptor {
        url: request_url(&data, config),
        method: config.method,
        response_type: config.return_type,
        content_type: config.content_type,
        data,
        headers: config.headers.clone(),
        options: config.options.clone(),
    }
}

/// A transport call that is already running.
///
/// Dropping it does not cancel the request.
#[derive(Debug)]
pub struct PendingRequest {
    handle: JoinHandle<Result<HttpResponse, TransportError>>,
}

impl Future for PendingRequest {
    type Output = Result<HttpResponse, TransportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(e)) => Poll::Ready(Err(TransportError::Aborted {
                message: e.to_string(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Build the request for `data` and start it on `transport`.
///
/// Must be called from within a tokio runtime; the request runs as its own
/// task and this returns immediately.
pub fn assemble(
    data: Value,
    config: &MergedCallConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<PendingRequest, ApiError> {
    let runtime = Handle::try_current().map_err(|_| ApiError::NoRuntime)?;
    let request = describe(data, config);
    log::trace!("assembled {} {}", request.method, request.url);

    let handle = runtime.spawn(async move { transport.send(request).await });
    Ok(PendingRequest { handle })
}
