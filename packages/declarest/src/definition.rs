//! The contract an API definition implements.
//!
//! An API definition is a plain type that lists its declared methods and may
//! override any of the hooks the dispatcher consults while shaping a call.
//! Every hook has a neutral default, so the smallest definition is:
//!
//! ```ignore
//! struct Users;
//!
//! impl ApiDefinition for Users {
//!     fn methods() -> Vec<MethodMetadata> {
//!         vec![MethodMetadata::route("get", Method::GET, "/{id}").param("id")]
//!     }
//! }
//! ```
//!
//! Hooks receive the value computed so far plus a [`CallContext`] and return
//! the value to use, which is how e.g. an auth header is injected without
//! touching the dispatcher.

use serde_json::{Map, Value};

use declarest_http::{ContentType, Headers, HttpResponse, Method, ResponseType, TransportError};

use crate::config::{ApiOptions, MergedCallConfig};
use crate::error::ApiError;
use crate::metadata::{MethodMetadata, ParamRole, ParameterDescriptor};
use crate::placeholder::binding_position;

/// Everything a hook may look at while a call is being shaped.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Registered name of the API.
    pub api: &'a str,
    /// Name of the declared method being called.
    pub method_name: &'a str,
    pub parameters: &'a [ParameterDescriptor],
    pub args: &'a [Value],
    pub config: &'a MergedCallConfig,
}

impl<'a> CallContext<'a> {
    /// The argument bound to `name`, resolved the same way placeholders are.
    pub fn arg(&self, name: &str) -> Option<&'a Value> {
        binding_position(name, self.parameters).and_then(|position| self.args.get(position))
    }
}

pub trait ApiDefinition: Send + Sync + 'static {
    /// Class-level options, used where the instance options leave a gap.
    fn class_options() -> ApiOptions
    where
        Self: Sized,
    {
        ApiOptions::default()
    }

    /// The declared methods of this API.
    fn methods() -> Vec<MethodMetadata>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// The path template of the call, before placeholder substitution.
    fn path(&self, call: &CallContext<'_>) -> String {
        default_path(call.config)
    }

    fn prefix(&self, prefix: String, _call: &CallContext<'_>) -> String {
        prefix
    }

    fn method(&self, method: Method, _call: &CallContext<'_>) -> Method {
        method
    }

    fn content_type(&self, content_type: ContentType, _call: &CallContext<'_>) -> ContentType {
        content_type
    }

    fn return_type(&self, return_type: ResponseType, _call: &CallContext<'_>) -> ResponseType {
        return_type
    }

    fn headers(&self, headers: Headers, _call: &CallContext<'_>) -> Headers {
        headers
    }

    /// Body or query data of the call.
    fn data(&self, call: &CallContext<'_>) -> Value {
        default_data(call.parameters, call.args)
    }

    /// Map the transport outcome into what the caller sees.
    fn response(&self, outcome: Result<HttpResponse, TransportError>) -> Result<Value, ApiError> {
        let response = outcome?;
        Ok(serde_json::to_value(response)?)
    }
}

/// The instance base path joined with the method's path template.
pub fn default_path(config: &MergedCallConfig) -> String {
    if config.path.is_empty() {
        return config.base_path.clone();
    }
    format!(
        "{}/{}",
        config.base_path.trim_end_matches('/'),
        config.path.trim_start_matches('/')
    )
}

/// Request data from the roles of structured parameters.
///
/// `Query` keys become fields of a data object, a `Body` argument becomes the
/// data itself (and absorbs `Query` fields if it is an object). Without either
/// the data is `null`.
pub fn default_data(parameters: &[ParameterDescriptor], args: &[Value]) -> Value {
    let mut body = None;
    let mut fields = Map::new();

    for (position, parameter) in parameters.iter().enumerate() {
        let (ParameterDescriptor::Mapping(keys), Some(arg)) = (parameter, args.get(position)) else {
            continue;
        };
        for (key, role) in keys {
            match role {
                ParamRole::Path => {}
                ParamRole::Query => {
                    fields.insert(key.clone(), arg.clone());
                }
                ParamRole::Body => body = Some(arg.clone()),
            }
        }
    }

    match body {
        Some(Value::Object(mut object)) => {
            for (key, value) in fields {
                object.entry(key).or_insert(value);
            }
            Value::Object(object)
        }
        Some(other) => other,
        None if fields.is_empty() => Value::Null,
        None => Value::Object(fields),
    }
}
