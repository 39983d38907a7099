//! HTTP transport abstraction.
//!
//! The dispatch layer never talks to the network itself: it hands a
//! [`RequestDescriptor`] to an [`HttpTransport`] and awaits the outcome. Any
//! type implementing the trait is substitutable, which is how tests swap in
//! [`mock::MockTransport`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;
use crate::types::{value_to_param, ContentType, HttpResponse, RequestDescriptor, ResponseType};

/// Option key: per-request timeout in milliseconds.
pub const OPTION_TIMEOUT: &str = "timeout";

/// Option key: when `false`, non-2xx responses resolve instead of failing.
pub const OPTION_VALIDATE_STATUS: &str = "validate_status";

/// Trait for executing HTTP requests.
///
/// Implementations resolve with the response or fail with a
/// [`TransportError`]. A status outside 2xx counts as a failure unless the
/// request's options set `validate_status` to `false`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a request and return the response.
    async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse, TransportError>;
}

/// Production transport using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Option<Url>,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
        }
    }
}

impl ReqwestTransport {
    /// Create a new transport with the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(30))
    }

    /// Resolve relative request URLs against `base_url`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TransportError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.base_url = Some(base);
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn resolve_url(&self, url: &str) -> Result<Url, TransportError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                // The base always ends in '/', so joining a slash-less path
                // keeps any path segments the base carries.
                Some(base) => Ok(base.join(url.trim_start_matches('/'))?),
                None => Err(TransportError::InvalidUrl {
                    message: format!("relative URL `{}` without a base URL", url),
                }),
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let url = self.resolve_url(&request.url)?;
        let method: http::Method = request.method.into();
        log::debug!("{} {}", request.method, url);

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::try_from(name.as_str())?;
            let header_value = HeaderValue::try_from(value.as_str())?;
            headers.insert(header_name, header_value);
        }

        let mut req_builder = self.client.request(method, url).headers(headers);

        if let Some(timeout) = request.options.get(OPTION_TIMEOUT).and_then(Value::as_u64) {
            req_builder = req_builder.timeout(Duration::from_millis(timeout));
        }

        if request.has_body() {
            req_builder = match request.content_type {
                ContentType::Json => req_builder.json(&request.data),
                ContentType::FormUrlEncoded => req_builder.form(&form_fields(&request.data)),
                ContentType::TextPlain => {
                    let explicit = request
                        .headers
                        .keys()
                        .any(|k| k.eq_ignore_ascii_case("content-type"));
                    let builder = if explicit {
                        req_builder
                    } else {
                        req_builder.header(CONTENT_TYPE, ContentType::TextPlain.as_str())
                    };
                    builder.body(value_to_param(&request.data))
                }
                ContentType::MultipartFormData => {
                    let form = form_fields(&request.data).into_iter().fold(
                        reqwest::multipart::Form::new(),
                        |form, (name, value)| form.text(name, value),
                    );
                    req_builder.multipart(form)
                }
            };
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let bytes = response.bytes().await?;
        let (body, body_text) = parse_body(&bytes, request.response_type);

        let response = HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
            body_text,
        };

        check_status(response, &request)
    }
}

/// Reject non-2xx responses unless the request opted out.
pub fn check_status(
    response: HttpResponse,
    request: &RequestDescriptor,
) -> Result<HttpResponse, TransportError> {
    let validate = request
        .options
        .get(OPTION_VALIDATE_STATUS)
        .and_then(Value::as_bool)
        .unwrap_or(true);

    if validate && !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            response: Box::new(response),
        });
    }
    Ok(response)
}

fn parse_body(bytes: &[u8], response_type: ResponseType) -> (Value, Option<String>) {
    match response_type {
        ResponseType::ArrayBuffer => (
            Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            None,
        ),
        ResponseType::Text => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            (Value::String(text.clone()), Some(text))
        }
        ResponseType::Json => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if text.trim().is_empty() {
                return (Value::Null, Some(text));
            }
            // Bodies that are not JSON are still handed back, as a string.
            let body = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
            (body, Some(text))
        }
    }
}

fn form_fields(data: &Value) -> Vec<(String, String)> {
    match data {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), value_to_param(v)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Mock transport for testing.
///
/// Returns predefined responses based on request URL matching.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A mock transport that returns predefined responses.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        /// Responses keyed by request URL.
        responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
        /// Default response when no match found.
        default_response: Arc<Mutex<Option<HttpResponse>>>,
        /// Recorded requests for verification.
        recorded_requests: Arc<Mutex<Vec<RequestDescriptor>>>,
        /// Error message to fail every request with.
        failure: Arc<Mutex<Option<String>>>,
    }

    impl MockTransport {
        /// Create a new mock transport.
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a response for a specific URL.
        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            self.responses.lock().unwrap().insert(url.into(), response);
            self
        }

        /// Set a default response when no URL matches.
        pub fn with_default_response(self, response: HttpResponse) -> Self {
            *self.default_response.lock().unwrap() = Some(response);
            self
        }

        /// Configure to fail all requests with an error.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            *self.failure.lock().unwrap() = Some(message.into());
            self
        }

        /// Get all recorded requests.
        pub fn recorded_requests(&self) -> Vec<RequestDescriptor> {
            self.recorded_requests.lock().unwrap().clone()
        }

        /// The most recent request, if any.
        pub fn last_request(&self) -> Option<RequestDescriptor> {
            self.recorded_requests.lock().unwrap().last().cloned()
        }

        /// Clear recorded requests.
        pub fn clear_recorded(&self) {
            self.recorded_requests.lock().unwrap().clear();
        }

        /// Create a simple success response.
        pub fn success_response(body: Value) -> HttpResponse {
            let body_text = body.to_string();
            HttpResponse {
                status: 200,
                status_text: "OK".to_string(),
                headers: HashMap::new(),
                body,
                body_text: Some(body_text),
            }
        }

        /// Create a simple error response.
        pub fn error_response(status: u16, message: &str) -> HttpResponse {
            HttpResponse {
                status,
                status_text: message.to_string(),
                headers: HashMap::new(),
                body: serde_json::json!({"error": message}),
                body_text: Some(format!(r#"{{"error":"{}"}}"#, message)),
            }
        }

        /// Create a 404 Not Found response.
        pub fn not_found() -> HttpResponse {
            Self::error_response(404, "Not Found")
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse, TransportError> {
            self.recorded_requests.lock().unwrap().push(request.clone());

            if let Some(message) = self.failure.lock().unwrap().clone() {
                return Err(TransportError::Mock { message });
            }

            let matched = self.responses.lock().unwrap().get(&request.url).cloned();
            let response = matched
                .or_else(|| self.default_response.lock().unwrap().clone())
                .unwrap_or_else(Self::not_found);

            check_status(response, &request)
        }
    }
}
