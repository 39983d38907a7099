//! Per-method declarations.
//!
//! A [`MethodMetadata`] is what turns a name on an API definition into a
//! declared method: its positional parameters, the overrides it applies on
//! top of the instance options, an optional [`Fallback`] and an optional
//! post-processing handler.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use declarest_http::{ContentType, Headers, Method, ResponseType, TransportOptions};

use crate::error::ApiError;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Where a structured parameter's argument ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamRole {
    /// Only fills placeholders in the path template.
    #[default]
    Path,
    /// Also added to the request data under its key.
    Query,
    /// The whole argument becomes the request data.
    Body,
}

/// How a positional argument is named.
///
/// Descriptors are positionally aligned with call arguments: the n-th
/// descriptor names the n-th argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterDescriptor {
    /// A bare name, matched directly against placeholders.
    Name(String),
    /// One or more named sub-keys, each with a role.
    Mapping(BTreeMap<String, ParamRole>),
}

impl ParameterDescriptor {
    pub fn name(name: impl Into<String>) -> Self {
        ParameterDescriptor::Name(name.into())
    }

    pub fn mapping<K: Into<String>>(keys: impl IntoIterator<Item = (K, ParamRole)>) -> Self {
        ParameterDescriptor::Mapping(keys.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }

    pub fn query(key: impl Into<String>) -> Self {
        Self::mapping([(key.into(), ParamRole::Query)])
    }

    pub fn body(key: impl Into<String>) -> Self {
        Self::mapping([(key.into(), ParamRole::Body)])
    }

    /// True for a structured descriptor exposing `key`.
    pub fn has_key(&self, key: &str) -> bool {
        matches!(self, ParameterDescriptor::Mapping(keys) if keys.contains_key(key))
    }

    /// True for a bare descriptor equal to `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, ParameterDescriptor::Name(n) if n == name)
    }
}

impl From<&str> for ParameterDescriptor {
    fn from(name: &str) -> Self {
        ParameterDescriptor::Name(name.to_string())
    }
}

impl From<String> for ParameterDescriptor {
    fn from(name: String) -> Self {
        ParameterDescriptor::Name(name)
    }
}

/// Error recovery for a failed call.
///
/// Returning `Ok` resolves the call with that value, returning `Err` rejects
/// it with the new error.
#[derive(Clone)]
pub struct Fallback(Arc<dyn Fn(ApiError) -> BoxFuture<Result<Value, ApiError>> + Send + Sync>);

impl Fallback {
    pub fn new<F>(recover: F) -> Self
    where
        F: Fn(ApiError) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        Fallback(Arc::new(move |error| -> BoxFuture<Result<Value, ApiError>> {
            let outcome = recover(error);
            Box::pin(std::future::ready(outcome))
        }))
    }

    /// A fallback that recovers asynchronously, e.g. by asking another source.
    pub fn with_future<F, Fut>(recover: F) -> Self
    where
        F: Fn(ApiError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        Fallback(Arc::new(move |error| -> BoxFuture<Result<Value, ApiError>> {
            Box::pin(recover(error))
        }))
    }

    pub async fn recover(&self, error: ApiError) -> Result<Value, ApiError> {
        (self.0)(error).await
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fallback(..)")
    }
}

pub type Transform = Box<dyn FnOnce(Value) -> Result<Value, ApiError> + Send>;

/// What a method's handler wants done with the successful response.
pub enum PostProcess {
    /// Hand the response value back unchanged.
    None,
    /// Apply this function to the response value.
    Transform(Transform),
    /// Wait for this future, then apply the function it yields.
    Deferred(BoxFuture<Result<Transform, ApiError>>),
}

impl PostProcess {
    pub fn transform<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, ApiError> + Send + 'static,
    {
        PostProcess::Transform(Box::new(f))
    }

    /// Infallible variant of [`PostProcess::transform`].
    pub fn map<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Value + Send + 'static,
    {
        PostProcess::Transform(Box::new(move |value| Ok(f(value))))
    }

    pub fn deferred<Fut>(transform: Fut) -> Self
    where
        Fut: Future<Output = Result<Transform, ApiError>> + Send + 'static,
    {
        PostProcess::Deferred(Box::pin(transform))
    }

    pub async fn apply(self, value: Value) -> Result<Value, ApiError> {
        match self {
            PostProcess::None => Ok(value),
            PostProcess::Transform(transform) => transform(value),
            PostProcess::Deferred(pending) => {
                let transform = pending.await?;
                transform(value)
            }
        }
    }
}

impl fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostProcess::None => f.write_str("PostProcess::None"),
            PostProcess::Transform(_) => f.write_str("PostProcess::Transform(..)"),
            PostProcess::Deferred(_) => f.write_str("PostProcess::Deferred(..)"),
        }
    }
}

/// Runs at call time with the call's arguments and decides the post-processing.
pub type Handler = Arc<dyn Fn(&[Value]) -> PostProcess + Send + Sync>;

/// Declared configuration for one method.
///
/// Every `Option` left unset falls back to the instance options, then to the
/// process defaults.
#[derive(Clone, Default)]
pub struct MethodMetadata {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub path: Option<String>,
    pub prefix: Option<String>,
    pub method: Option<Method>,
    pub content_type: Option<ContentType>,
    pub return_type: Option<ResponseType>,
    pub headers: Option<Headers>,
    pub fallback: Option<Fallback>,
    pub options: Option<TransportOptions>,
    pub handler: Option<Handler>,
}

impl MethodMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Shorthand for a declaration with an HTTP method and a path template.
    pub fn route(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self::new(name).method(method).path(path)
    }

    pub fn param(mut self, parameter: impl Into<ParameterDescriptor>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn params<P: Into<ParameterDescriptor>>(mut self, parameters: impl IntoIterator<Item = P>) -> Self {
        self.parameters.extend(parameters.into_iter().map(Into::into));
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn return_type(mut self, return_type: ResponseType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options
            .get_or_insert_with(TransportOptions::new)
            .insert(key.into(), value);
        self
    }

    /// Attach the handler that post-processes this method's responses.
    pub fn post_process<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Value]) -> PostProcess + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("return_type", &self.return_type)
            .field("headers", &self.headers)
            .field("fallback", &self.fallback)
            .field("options", &self.options)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_deserializes_both_shapes() {
        let parsed: Vec<ParameterDescriptor> =
            serde_json::from_value(json!(["id", {"q": "query", "payload": "body"}])).unwrap();

        assert!(parsed[0].is_named("id"));
        assert!(parsed[1].has_key("q"));
        assert!(parsed[1].has_key("payload"));
        assert!(!parsed[1].is_named("q"));
    }

    #[test]
    fn builder_collects_overrides() {
        let meta = MethodMetadata::route("search", Method::GET, "/search")
            .param("term")
            .param(ParameterDescriptor::query("page"))
            .header("X-Trace", "1")
            .option("timeout", json!(500));

        assert_eq!(meta.method, Some(Method::GET));
        assert_eq!(meta.parameters.len(), 2);
        assert_eq!(meta.headers.unwrap().get("X-Trace").map(String::as_str), Some("1"));
        assert_eq!(meta.options.unwrap().get("timeout"), Some(&json!(500)));
    }

    #[tokio::test]
    async fn post_process_variants() {
        assert_eq!(PostProcess::None.apply(json!(1)).await.unwrap(), json!(1));

        let doubled = PostProcess::map(|v| json!(v.as_i64().unwrap_or_default() * 2));
        assert_eq!(doubled.apply(json!(21)).await.unwrap(), json!(42));

        let deferred = PostProcess::deferred(async {
            let transform: Transform = Box::new(|v| Ok(json!({"wrapped": v})));
            Ok::<_, ApiError>(transform)
        });
        assert_eq!(deferred.apply(json!(1)).await.unwrap(), json!({"wrapped": 1}));
    }

    #[tokio::test]
    async fn post_process_errors_propagate() {
        let failing = PostProcess::transform(|_| Err(ApiError::post_process("bad shape")));
        assert!(matches!(
            failing.apply(json!(null)).await,
            Err(ApiError::PostProcess { .. })
        ));

        let deferred = PostProcess::deferred(async { Err::<Transform, _>(ApiError::post_process("not ready")) });
        assert!(deferred.apply(json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn fallback_can_recover_or_reject() {
        let recovering = Fallback::new(|_| Ok(json!("cached")));
        let outcome = recovering.recover(ApiError::NoRuntime).await.unwrap();
        assert_eq!(outcome, json!("cached"));

        let rejecting = Fallback::with_future(|e| async move { Err::<Value, _>(ApiError::recovery(e.to_string())) });
        assert!(matches!(
            rejecting.recover(ApiError::NoRuntime).await,
            Err(ApiError::Recovery { .. })
        ));
    }
}
