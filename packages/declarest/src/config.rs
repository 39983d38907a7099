//! Configuration layering.
//!
//! Every call sees one [`MergedCallConfig`], built from three layers in
//! increasing priority: the context [`Defaults`], the API instance's
//! [`ApiOptions`] and the method's [`MethodMetadata`].

use serde::{Deserialize, Serialize};

use declarest_http::{ContentType, Headers, Method, ResponseType, TransportOptions};

use crate::defaults::Defaults;
use crate::metadata::{Fallback, MethodMetadata};

/// Options an API definition is constructed with.
///
/// Deserializable so applications can keep them in their own config files:
///
/// ```json
/// { "path": "/users", "prefix": "https://api.example.com", "contentType": "application/json" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiOptions {
    /// Base path of every method; `/` + the API name when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ResponseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<TransportOptions>,
}

impl ApiOptions {
    pub fn new() -> Self {
        Self::default()
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

    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options
            .get_or_insert_with(TransportOptions::new)
            .insert(key.into(), value);
        self
    }

    /// Fill every unset field from `fallback`. An empty `path` or `prefix`
    /// counts as unset.
    pub fn or(self, fallback: ApiOptions) -> ApiOptions {
        ApiOptions {
            path: non_empty(self.path).or(non_empty(fallback.path)),
            prefix: non_empty(self.prefix).or(non_empty(fallback.prefix)),
            method: self.method.or(fallback.method),
            content_type: self.content_type.or(fallback.content_type),
            return_type: self.return_type.or(fallback.return_type),
            headers: self.headers.or(fallback.headers),
            options: self.options.or(fallback.options),
        }
    }
}

/// `None` for an unset or empty string.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// The configuration one call is executed with. Nothing in here is unset,
/// apart from the optional fallback.
#[derive(Debug, Clone)]
pub struct MergedCallConfig {
    /// Base path of the API instance.
    pub base_path: String,
    /// The method's path template; the resolved path once assembled.
    pub path: String,
    pub prefix: String,
    pub method: Method,
    pub content_type: ContentType,
    pub return_type: ResponseType,
    pub fallback: Option<Fallback>,
    pub headers: Headers,
    pub options: TransportOptions,
}

impl MergedCallConfig {
    /// Layer `defaults < instance < method`.
    ///
    /// Scalars and headers are taken whole from the highest layer that sets
    /// them; an empty prefix is unset. Transport options start from the
    /// defaults and are overlaid key by key with the options of the highest
    /// other layer that sets any, so method options replace instance options.
    pub fn merge(
        defaults: &Defaults,
        base_path: &str,
        instance: &ApiOptions,
        method: &MethodMetadata,
    ) -> Self {
        let mut options = defaults.options.clone();
        if let Some(layer) = method.options.as_ref().or(instance.options.as_ref()) {
            options.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Self {
            base_path: base_path.to_string(),
            path: method.path.clone().unwrap_or_default(),
            prefix: non_empty(method.prefix.clone())
                .or_else(|| non_empty(instance.prefix.clone()))
                .unwrap_or_else(|| defaults.prefix.clone()),
            method: method.method.or(instance.method).unwrap_or(defaults.method),
            content_type: method
                .content_type
                .or(instance.content_type)
                .unwrap_or(defaults.content_type),
            return_type: method
                .return_type
                .or(instance.return_type)
                .unwrap_or(defaults.return_type),
            fallback: method.fallback.clone().or_else(|| defaults.fallback.clone()),
            headers: method
                .headers
                .clone()
                .or_else(|| instance.headers.clone())
                .unwrap_or_else(|| defaults.headers.clone()),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Defaults {
        let mut defaults = Defaults {
            prefix: "https://default.example.com".to_string(),
            ..Default::default()
        };
        defaults.headers.insert("X-Default".into(), "1".into());
        defaults.options.insert("timeout".into(), json!(1000));
        defaults.options.insert("validate_status".into(), json!(true));
        defaults
    }

    #[test]
    fn defaults_fill_everything_unset() {
        let merged = MergedCallConfig::merge(&defaults(), "/users", &ApiOptions::new(), &MethodMetadata::new("list"));

        assert_eq!(merged.base_path, "/users");
        assert_eq!(merged.path, "");
        assert_eq!(merged.prefix, "https://default.example.com");
        assert_eq!(merged.method, Method::GET);
        assert_eq!(merged.content_type, ContentType::Json);
        assert_eq!(merged.return_type, ResponseType::Json);
        assert!(merged.fallback.is_none());
        assert_eq!(merged.headers.get("X-Default").map(String::as_str), Some("1"));
        assert_eq!(merged.options.get("timeout"), Some(&json!(1000)));
    }

    #[test]
    fn method_beats_instance_beats_defaults() {
        let instance = ApiOptions::new()
            .prefix("https://instance.example.com")
            .method(Method::PUT)
            .content_type(ContentType::FormUrlEncoded)
            .header("X-Instance", "1");
        let method = MethodMetadata::new("create")
            .method(Method::POST)
            .path("/new");

        let merged = MergedCallConfig::merge(&defaults(), "/users", &instance, &method);

        assert_eq!(merged.prefix, "https://instance.example.com");
        assert_eq!(merged.method, Method::POST);
        assert_eq!(merged.content_type, ContentType::FormUrlEncoded);
        assert_eq!(merged.path, "/new");
        // Headers are replaced wholesale, not merged key-wise.
        assert!(merged.headers.contains_key("X-Instance"));
        assert!(!merged.headers.contains_key("X-Default"));
    }

    #[test]
    fn transport_options_overlay_defaults() {
        let instance = ApiOptions::new().option("timeout", json!(2000));

        let merged = MergedCallConfig::merge(&defaults(), "/", &instance, &MethodMetadata::new("m"));

        assert_eq!(merged.options.get("timeout"), Some(&json!(2000)));
        assert_eq!(merged.options.get("validate_status"), Some(&json!(true)));
    }

    #[test]
    fn method_options_replace_instance_options() {
        let instance = ApiOptions::new()
            .option("timeout", json!(2000))
            .option("retries", json!(3));
        let method = MethodMetadata::new("slow").option("validate_status", json!(false));

        let merged = MergedCallConfig::merge(&defaults(), "/", &instance, &method);

        assert_eq!(merged.options.get("timeout"), Some(&json!(1000)));
        assert_eq!(merged.options.get("validate_status"), Some(&json!(false)));
        assert!(!merged.options.contains_key("retries"));
    }

    #[test]
    fn empty_prefix_falls_through() {
        let instance = ApiOptions::new().prefix("");
        let method = MethodMetadata::new("m").prefix("");

        let merged = MergedCallConfig::merge(&defaults(), "/", &instance, &method);
        assert_eq!(merged.prefix, "https://default.example.com");

        let instance = ApiOptions::new().prefix("https://instance.example.com");
        let merged = MergedCallConfig::merge(&defaults(), "/", &instance, &method);
        assert_eq!(merged.prefix, "https://instance.example.com");
    }

    #[test]
    fn empty_path_and_prefix_are_unset_for_or() {
        let class = ApiOptions::new().path("/people").prefix("https://class.example.com");
        let resolved = ApiOptions::new().path("").prefix("").or(class);

        assert_eq!(resolved.path.as_deref(), Some("/people"));
        assert_eq!(resolved.prefix.as_deref(), Some("https://class.example.com"));

        let resolved = ApiOptions::new().path("").or(ApiOptions::new().path(""));
        assert!(resolved.path.is_none());
    }

    #[test]
    fn deserialized_empty_prefix_is_unset() {
        let instance: ApiOptions = serde_json::from_value(json!({"prefix": ""})).unwrap();
        let merged = MergedCallConfig::merge(&defaults(), "/", &instance, &MethodMetadata::new("m"));
        assert_eq!(merged.prefix, "https://default.example.com");
    }

    #[test]
    fn defaults_supply_the_fallback() {
        let mut defaults = defaults();
        defaults.fallback = Some(Fallback::new(|_| Ok(json!("default"))));

        let merged = MergedCallConfig::merge(&defaults, "/", &ApiOptions::new(), &MethodMetadata::new("m"));
        assert!(merged.fallback.is_some());
    }

    #[test]
    fn api_options_or_fills_gaps() {
        let class = ApiOptions::new().path("/people").prefix("https://class.example.com");
        let instance = ApiOptions::new().prefix("https://instance.example.com");

        let resolved = instance.or(class);
        assert_eq!(resolved.path.as_deref(), Some("/people"));
        assert_eq!(resolved.prefix.as_deref(), Some("https://instance.example.com"));
    }

    #[test]
    fn api_options_deserialize_camel_case() {
        let options: ApiOptions = serde_json::from_value(json!({
            "path": "/users",
            "contentType": "application/x-www-form-urlencoded",
            "returnType": "text",
            "method": "POST"
        }))
        .unwrap();

        assert_eq!(options.path.as_deref(), Some("/users"));
        assert_eq!(options.content_type, Some(ContentType::FormUrlEncoded));
        assert_eq!(options.return_type, Some(ResponseType::Text));
        assert_eq!(options.method, Some(Method::POST));
        assert!(options.prefix.is_none());
    }
}
