//! Process-wide configuration defaults.
//!
//! These are the lowest layer of every call's configuration. Change them
//! once at startup through [`set_defaults`]; mutating them while calls are in
//! flight is unsupported.

use declarest_http::{ContentType, Headers, Method, ResponseType, TransportOptions};

use crate::context::Context;
use crate::metadata::Fallback;

/// Values used when neither the method nor the instance specifies one.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    pub prefix: String,
    pub method: Method,
    pub content_type: ContentType,
    pub return_type: ResponseType,
    pub fallback: Option<Fallback>,
    pub headers: Headers,
    pub options: TransportOptions,
}

/// Mutate the defaults of the process-wide [`Context`].
///
/// ```ignore
/// declarest::set_defaults(|defaults| {
///     defaults.prefix = "https://api.example.com/v2".to_string();
///     defaults.headers.insert("Accept".into(), "application/json".into());
/// });
/// ```
pub fn set_defaults<F>(mutate: F)
where
    F: FnOnce(&mut Defaults),
{
    Context::global().set_defaults(mutate);
}
