//! The context an API definition lives in.
//!
//! A [`Context`] owns the configuration defaults, the transport every call is
//! sent through, and the registry of constructed API façades. The process-wide
//! context ([`Context::global`]) is created on first use and lives until the
//! process exits; [`Context::reset`] is its teardown, for tests. Independent
//! contexts can be created freely, e.g. one per test with a mock transport.

use std::any::{type_name, Any};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use lazy_static::lazy_static;

use declarest_http::{HttpTransport, ReqwestTransport};

use crate::defaults::Defaults;
use crate::definition::ApiDefinition;
use crate::dispatch::Api;
use crate::error::RegistryError;

lazy_static! {
    static ref GLOBAL: Arc<Context> = Arc::new(Context::new());
}

struct Registered {
    type_name: &'static str,
    api: Arc<dyn Any + Send + Sync>,
}

pub struct Context {
    defaults: RwLock<Defaults>,
    transport: RwLock<Arc<dyn HttpTransport>>,
    registry: Mutex<HashMap<String, Registered>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("defaults", &self.defaults())
            .field("registered", &self.registered_names())
            .finish()
    }
}

impl Context {
    /// A context sending requests through a default [`ReqwestTransport`].
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::default())
    }

    pub fn with_transport(transport: impl HttpTransport + 'static) -> Self {
        Self {
            defaults: RwLock::new(Defaults::default()),
            transport: RwLock::new(Arc::new(transport)),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide context.
    pub fn global() -> Arc<Context> {
        GLOBAL.clone()
    }

    /// Snapshot of the current defaults.
    pub fn defaults(&self) -> Defaults {
        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_defaults<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Defaults),
    {
        let mut defaults = self
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        mutate(&mut defaults);
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_transport(&self, transport: impl HttpTransport + 'static) {
        *self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(transport);
    }

    /// The façade registered under `name`, if there is one of type `D`.
    pub fn lookup<D: ApiDefinition>(&self, name: &str) -> Result<Option<Arc<Api<D>>>, RegistryError> {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .get(name)
            .map(|entry| downcast::<D>(name, entry))
            .transpose()
    }

    /// Return the façade registered under `name`, building and registering it
    /// first if the name is new. `build` does not run for a known name.
    ///
    /// `build` runs without the registry lock held, so it may register other
    /// APIs. If another caller registers `name` meanwhile, that entry wins and
    /// the freshly built façade is dropped.
    pub(crate) fn register_with<D, F>(&self, name: &str, build: F) -> Result<Arc<Api<D>>, RegistryError>
    where
        D: ApiDefinition,
        F: FnOnce() -> Api<D>,
    {
        if let Some(api) = self.lookup::<D>(name)? {
            return Ok(api);
        }

        let api = Arc::new(build());

        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        match registry.entry(name.to_string()) {
            Entry::Occupied(entry) => downcast::<D>(name, entry.get()),
            Entry::Vacant(slot) => {
                log::debug!("registered API `{}` ({})", name, type_name::<D>());
                slot.insert(Registered {
                    type_name: type_name::<D>(),
                    api: api.clone(),
                });
                Ok(api)
            }
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Forget every registered façade. Façades already handed out keep working.
    pub fn clear_registry(&self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Restore the default configuration and empty the registry.
    pub fn reset(&self) {
        self.set_defaults(|defaults| *defaults = Defaults::default());
        self.clear_registry();
    }
}

fn downcast<D: ApiDefinition>(name: &str, entry: &Registered) -> Result<Arc<Api<D>>, RegistryError> {
    entry
        .api
        .clone()
        .downcast::<Api<D>>()
        .map_err(|_| RegistryError::TypeMismatch {
            name: name.to_string(),
            registered: entry.type_name,
            requested: type_name::<D>(),
        })
}
