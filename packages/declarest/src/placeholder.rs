//! Placeholder substitution for path templates.
//!
//! A placeholder is `{name}`, optionally preceded by one of the sigils `$`,
//! `#` or `:` (`${id}`, `#{id}`, `:{id}`). Each one is replaced by the call
//! argument bound to `name` through the parameter descriptors. A placeholder
//! with no binding becomes the empty string; substituted values are never
//! scanned again.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

use declarest_http::value_to_param;

use crate::metadata::ParameterDescriptor;

/// Substitute every placeholder in `template` from `args`.
pub fn resolve(template: &str, parameters: &[ParameterDescriptor], args: &[Value]) -> String {
    lazy_static! {
        static ref PLACEHOLDER: Regex = Regex::new(r"[$#:]?\{(.+?)\}").unwrap();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match binding_position(name, parameters) {
                Some(position) => args.get(position).map(value_to_param).unwrap_or_default(),
                None => {
                    log::debug!("no binding for placeholder `{}` in `{}`", name, template);
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Position of the argument bound to `name`.
///
/// Structured descriptors win over bare names, so `[{"id": path}, "id"]`
/// binds `{id}` to the first argument even when a later bare name matches.
pub fn binding_position(name: &str, parameters: &[ParameterDescriptor]) -> Option<usize> {
    parameters
        .iter()
        .position(|p| p.has_key(name))
        .or_else(|| parameters.iter().position(|p| p.is_named(name)))
}
