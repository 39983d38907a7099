//! The dispatcher.
//!
//! [`Api`] wraps an [`ApiDefinition`]. At construction it indexes the
//! declared methods by name; calling one of them merges the configuration
//! layers, runs the definition's hooks, substitutes placeholders, starts the
//! request and returns one future for the whole pipeline:
//!
//! ```text
//! transport outcome -> response hook -> fallback (on error) -> post-processing (on success)
//! ```
//!
//! Anything that is not a declared method is reached through `Deref` on the
//! wrapped definition.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::assemble::{assemble, join_url};
use crate::config::{non_empty, ApiOptions, MergedCallConfig};
use crate::context::Context;
use crate::definition::{ApiDefinition, CallContext};
use crate::error::ApiError;
use crate::metadata::{BoxFuture, MethodMetadata, PostProcess};
use crate::placeholder;

/// The eventual result of a declared-method call.
pub type ApiCall = BoxFuture<Result<Value, ApiError>>;

/// Builds (or finds) the registered façade for an API definition.
pub struct ApiBuilder<D: ApiDefinition> {
    name: String,
    definition: D,
    options: ApiOptions,
    declared: Vec<MethodMetadata>,
    context: Option<Arc<Context>>,
}

impl<D: ApiDefinition> ApiBuilder<D> {
    /// Instance options; unset fields fall back to [`ApiDefinition::class_options`].
    pub fn options(mut self, options: ApiOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare a method in addition to [`ApiDefinition::methods`]. A name
    /// declared twice keeps the last declaration.
    pub fn declare(mut self, metadata: MethodMetadata) -> Self {
        self.declared.push(metadata);
        self
    }

    /// Register in `context` instead of the process-wide one.
    pub fn context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }

    /// The façade registered under this name.
    ///
    /// The first build for a name registers it; later builds return the same
    /// `Arc` and discard their definition and options.
    pub fn build(self) -> Result<Arc<Api<D>>, ApiError> {
        let context = self.context.unwrap_or_else(Context::global);
        let name = self.name;
        let definition = self.definition;
        let options = self.options;
        let declared = self.declared;

        let api = context.register_with(&name, || {
            Api::new(name.clone(), definition, options, declared, context.clone())
        })?;
        Ok(api)
    }
}

pub struct Api<D: ApiDefinition> {
    name: String,
    definition: Arc<D>,
    options: ApiOptions,
    base_path: String,
    methods: HashMap<String, Arc<MethodMetadata>>,
    context: Arc<Context>,
}

impl<D: ApiDefinition> fmt::Debug for Api<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("options", &self.options)
            .field("declared", &self.declared())
            .finish()
    }
}

impl<D: ApiDefinition> Api<D> {
    pub fn builder(name: impl Into<String>, definition: D) -> ApiBuilder<D> {
        ApiBuilder {
            name: name.into(),
            definition,
            options: ApiOptions::default(),
            declared: Vec::new(),
            context: None,
        }
    }

    fn new(
        name: String,
        definition: D,
        options: ApiOptions,
        declared: Vec<MethodMetadata>,
        context: Arc<Context>,
    ) -> Self {
        let options = options.or(D::class_options());
        let base_path = non_empty(options.path.clone()).unwrap_or_else(|| format!("/{}", name));

        let methods = D::methods()
            .into_iter()
            .chain(declared)
            .map(|metadata| (metadata.name.clone(), Arc::new(metadata)))
            .collect();

        Self {
            name,
            definition: Arc::new(definition),
            options,
            base_path,
            methods,
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Instance options, with class options filled in.
    pub fn options(&self) -> &ApiOptions {
        &self.options
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Names of the declared methods, sorted.
    pub fn declared(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn metadata(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.get(name).map(Arc::as_ref)
    }

    /// A callable for `name` if it is a declared method.
    pub fn method(&self, name: &str) -> Option<BoundMethod<'_, D>> {
        self.methods.get(name).map(|metadata| BoundMethod {
            api: self,
            metadata: metadata.clone(),
        })
    }

    /// Look `name` up: declared methods become callables, anything else is
    /// left to the wrapped definition.
    pub fn member(&self, name: &str) -> Member<'_, D> {
        match self.method(name) {
            Some(bound) => Member::Declared(bound),
            None => Member::Definition(&self.definition),
        }
    }

    /// Call the declared method `name` with positional `args`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> ApiCall {
        match self.methods.get(name) {
            Some(metadata) => self.dispatch(metadata, args),
            None => Box::pin(std::future::ready(Err(ApiError::UnknownMethod {
                api: self.name.clone(),
                method: name.to_string(),
            }))),
        }
    }

    fn dispatch(&self, metadata: &MethodMetadata, args: Vec<Value>) -> ApiCall {
        let defaults = self.context.defaults();
        let mut config = MergedCallConfig::merge(&defaults, &self.base_path, &self.options, metadata);
        let parameters = metadata.parameters.as_slice();

        let (path, prefix, method, content_type, return_type, headers, data) = {
            let call = CallContext {
                api: &self.name,
                method_name: &metadata.name,
                parameters,
                args: &args,
                config: &config,
            };
            let definition = &self.definition;
            (
                placeholder::resolve(&definition.path(&call), parameters, &args),
                definition.prefix(config.prefix.clone(), &call),
                definition.method(config.method, &call),
                definition.content_type(config.content_type, &call),
                definition.return_type(config.return_type, &call),
                definition.headers(config.headers.clone(), &call),
                definition.data(&call),
            )
        };
        config.path = path;
        config.prefix = prefix;
        config.method = method;
        config.content_type = content_type;
        config.return_type = return_type;
        config.headers = headers;

        log::debug!(
            "{}.{} -> {} {}",
            self.name,
            metadata.name,
            config.method,
            join_url(&config.prefix, &config.path)
        );

        let pending = match assemble(data, &config, self.context.transport()) {
            Ok(pending) => pending,
            Err(e) => return Box::pin(std::future::ready(Err(e))),
        };

        let post_process = metadata
            .handler
            .as_ref()
            .map(|handler| handler(args.as_slice()))
            .unwrap_or(PostProcess::None);
        let definition = self.definition.clone();
        let fallback = config.fallback;

        Box::pin(async move {
            let outcome = match (definition.response(pending.await), fallback) {
                (Err(error), Some(fallback)) => fallback.recover(error).await,
                (outcome, _) => outcome,
            };
            post_process.apply(outcome?).await
        })
    }
}

impl<D: ApiDefinition> Deref for Api<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.definition
    }
}

/// A declared method bound to its façade.
pub struct BoundMethod<'a, D: ApiDefinition> {
    api: &'a Api<D>,
    metadata: Arc<MethodMetadata>,
}

impl<D: ApiDefinition> BoundMethod<'_, D> {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    pub fn call(&self, args: Vec<Value>) -> ApiCall {
        self.api.dispatch(&self.metadata, args)
    }
}

/// Result of [`Api::member`].
pub enum Member<'a, D: ApiDefinition> {
    Declared(BoundMethod<'a, D>),
    Definition(&'a D),
}

impl<'a, D: ApiDefinition> Member<'a, D> {
    pub fn is_declared(&self) -> bool {
        matches!(self, Member::Declared(_))
    }

    pub fn into_method(self) -> Option<BoundMethod<'a, D>> {
        match self {
            Member::Declared(bound) => Some(bound),
            Member::Definition(_) => None,
        }
    }
}
