use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// Header mapping sent with a request.
pub type Headers = HashMap<String, String>;

/// Opaque transport options, passed through to the transport verbatim.
pub type TransportOptions = serde_json::Map<String, serde_json::Value>;

/// HTTP method for requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl Method {
    /// Methods whose request data travels as the body rather than the query string.
    pub fn carries_body(self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(TransportError::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::PATCH => http::Method::PATCH,
            Method::HEAD => http::Method::HEAD,
            Method::OPTIONS => http::Method::OPTIONS,
        }
    }
}

/// Encoding of the request body
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/x-www-form-urlencoded")]
    FormUrlEncoded,
    #[serde(rename = "text/plain")]
    TextPlain,
    #[serde(rename = "multipart/form-data")]
    MultipartFormData,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::TextPlain => "text/plain",
            ContentType::MultipartFormData => "multipart/form-data",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Ignore parameters such as `; charset=utf-8`.
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Ok(ContentType::Json),
            "application/x-www-form-urlencoded" => Ok(ContentType::FormUrlEncoded),
            "text/plain" => Ok(ContentType::TextPlain),
            "multipart/form-data" => Ok(ContentType::MultipartFormData),
            _ => Err(TransportError::InvalidContentType {
                content_type: s.to_string(),
            }),
        }
    }
}

/// How the transport parses the response body
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    /// Raw bytes, exposed as an array of octets in the response body.
    ArrayBuffer,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::ArrayBuffer => "arraybuffer",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "arraybuffer" => Ok(ResponseType::ArrayBuffer),
            _ => Err(TransportError::InvalidResponseType {
                response_type: s.to_string(),
            }),
        }
    }
}

/// A normalized request, ready for a transport
///
/// `url` is either absolute or relative to the transport's base URL. For
/// body-carrying methods `data` is the body; for the others it has already
/// been folded into the query string and is informational only.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,

    #[serde(default)]
    pub method: Method,

    #[serde(default)]
    pub response_type: ResponseType,

    #[serde(default)]
    pub content_type: ContentType,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: Headers,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: TransportOptions,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Whether the body should be sent at all.
    pub fn has_body(&self) -> bool {
        self.method.carries_body() && !self.data.is_null()
    }
}

/// HTTP response from a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Status text (e.g., "OK", "Not Found")
    pub status_text: String,

    /// Response headers
    pub headers: Headers,

    /// Response body, shaped by the request's [`ResponseType`]
    pub body: serde_json::Value,

    /// Raw body as string (absent for binary responses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
}

impl HttpResponse {
    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Try to deserialize the body into a specific type
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Render a JSON value the way it appears inside a URL or form field.
///
/// Strings are emitted without quotes, `null` becomes the empty string,
/// arrays are comma-joined and objects fall back to their JSON text.
pub fn value_to_param(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_param)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_body_policy() {
        assert!(Method::POST.carries_body());
        assert!(Method::PUT.carries_body());
        assert!(Method::PATCH.carries_body());
        assert!(!Method::GET.carries_body());
        assert!(!Method::DELETE.carries_body());
        assert!(!Method::HEAD.carries_body());
        assert!(!Method::OPTIONS.carries_body());
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::PATCH);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn content_type_ignores_parameters() {
        assert_eq!(
            "application/json; charset=utf-8".parse::<ContentType>().unwrap(),
            ContentType::Json
        );
        assert_eq!(
            "multipart/form-data".parse::<ContentType>().unwrap(),
            ContentType::MultipartFormData
        );
    }

    #[test]
    fn content_type_serializes_as_mime() {
        let value = serde_json::to_value(ContentType::FormUrlEncoded).unwrap();
        assert_eq!(value, json!("application/x-www-form-urlencoded"));
    }

    #[test]
    fn response_type_defaults_to_json() {
        assert_eq!(ResponseType::default(), ResponseType::Json);
        assert_eq!("text".parse::<ResponseType>().unwrap(), ResponseType::Text);
    }

    #[test]
    fn descriptor_without_data_has_no_body() {
        let request = RequestDescriptor::post("/users");
        assert!(!request.has_body());

        let request = request.with_data(json!({"name": "Ada"}));
        assert!(request.has_body());

        let get = RequestDescriptor::get("/users").with_data(json!({"q": "x"}));
        assert!(!get.has_body());
    }

    #[test]
    fn value_rendering() {
        assert_eq!(value_to_param(&json!("abc")), "abc");
        assert_eq!(value_to_param(&json!(42)), "42");
        assert_eq!(value_to_param(&json!(true)), "true");
        assert_eq!(value_to_param(&json!(null)), "");
        assert_eq!(value_to_param(&json!([1, "b"])), "1,b");
        assert_eq!(value_to_param(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn response_status_classes() {
        let mut response = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            headers: Headers::new(),
            body: serde_json::Value::Null,
            body_text: None,
        };
        assert!(response.is_success());
        response.status = 404;
        assert!(response.is_client_error());
        response.status = 503;
        assert!(response.is_server_error());
    }
}
