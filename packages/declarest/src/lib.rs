//! # declarest
//!
//! Declarative HTTP API definitions.
//!
//! An API is declared as a type implementing [`ApiDefinition`] plus a list of
//! [`MethodMetadata`]. Building it through [`Api::builder`] registers a façade
//! whose declared methods turn into HTTP calls:
//!
//! ```ignore
//! use declarest::{args, Api, ApiDefinition, ApiOptions, Method, MethodMetadata, PostProcess};
//!
//! struct Users;
//!
//! impl ApiDefinition for Users {
//!     fn methods() -> Vec<MethodMetadata> {
//!         vec![
//!             MethodMetadata::route("get", Method::GET, "/{id}")
//!                 .param("id")
//!                 .post_process(|_| PostProcess::map(|response| response["body"].clone())),
//!         ]
//!     }
//! }
//!
//! let users = Api::builder("Users", Users)
//!     .options(ApiOptions::new().path("/users").prefix("https://api.example.com"))
//!     .build()?;
//!
//! // GET https://api.example.com/users/42
//! let user = users.call("get", args![42]).await?;
//! ```
//!
//! ## Call pipeline
//!
//! 1. Configuration is merged: [`Defaults`] < [`ApiOptions`] < [`MethodMetadata`].
//! 2. The definition's hooks compute path, prefix, method, content type,
//!    return type, headers and data.
//! 3. Placeholders (`{id}`, `${id}`, `#{id}`, `:{id}`) in the path are
//!    substituted from the arguments.
//! 4. The request is assembled and started on the context's transport.
//! 5. The `response` hook maps the outcome, a configured [`Fallback`] may
//!    recover from a failure, and the method's [`PostProcess`] transforms a
//!    success.

pub mod assemble;
pub mod config;
pub mod context;
pub mod defaults;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod placeholder;

pub use config::{ApiOptions, MergedCallConfig};
pub use context::Context;
pub use defaults::{set_defaults, Defaults};
pub use definition::{ApiDefinition, CallContext};
pub use dispatch::{Api, ApiBuilder, ApiCall, BoundMethod, Member};
pub use error::{ApiError, RegistryError};
pub use metadata::{
    Fallback, Handler, MethodMetadata, ParamRole, ParameterDescriptor, PostProcess, Transform,
};

// Re-export the transport side
pub use declarest_http::{
    ContentType, Headers, HttpResponse, HttpTransport, Method, ReqwestTransport,
    RequestDescriptor, ResponseType, TransportError, TransportOptions,
};

#[doc(hidden)]
pub use serde_json;

/// Build a positional argument list, converting each item with `json!`.
///
/// ```ignore
/// users.call("search", args!["rust", 2, null]).await?;
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:tt),* $(,)?) => {
        vec![$($crate::serde_json::json!($arg)),*]
    };
}
