//! # Service Registry
//!
//! A [`Service`] is an explicit registry of named methods. Each [`Method`] owns an
//! invocation strategy (an [`Invocable`]) that decides what calling it actually does:
//!
//! * a method registered with [`Service::register`] has no behavior until a client binds it;
//! * a method registered with [`Service::register_with`] runs its local handler until then.
//!
//! Binding a [`crate::Client`] attaches its RPC strategy to the service
//! ([`Service::attach`]): every existing method is rerouted, and every method registered later
//! is created already routed, so the order of registration and binding does not matter.
//!
//! A service has a single binding slot. Attaching again replaces the previous binding for all
//! methods, and the slot only holds a weak reference: once the owner of the strategy (the
//! client) is dropped, new methods are no longer routed through it.
//!
//! The fully qualified name sent on the wire (`namespace.method`, or just `method` when the
//! service has no namespace) is computed once at registration and never changes.
use crate::client::CallError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak},
};
use tracing::debug;

/// Errors that can occur when registering a method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("Method '{0}' is already registered")]
    DuplicateMethod(String),
    #[error("Invalid method name '{0}': names must be non-empty and contain no '.'")]
    InvalidName(String),
}

/// Something a method call can be routed to.
///
/// `name` is the fully qualified name of the method being invoked.
#[async_trait]
pub trait Invocable: Send + Sync {
    async fn invoke(&self, name: &str, params: Value) -> Result<Value, CallError>;
}

/// Wraps an async closure as an [`Invocable`], for methods with local behavior.
pub fn from_fn<F, Fut>(handler: F) -> Arc<dyn Invocable>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
{
    Arc::new(FnInvocable(handler))
}

struct FnInvocable<F>(F);

#[async_trait]
impl<F, Fut> Invocable for FnInvocable<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
{
    async fn invoke(&self, _name: &str, params: Value) -> Result<Value, CallError> {
        (self.0)(params).await
    }
}

/// Strategy of a method that was declared without a handler and is not bound yet.
struct Unbound;

#[async_trait]
impl Invocable for Unbound {
    async fn invoke(&self, name: &str, _params: Value) -> Result<Value, CallError> {
        Err(CallError::NotBound(name.to_string()))
    }
}

/// A single registered method.
pub struct Method {
    name: String,
    qualified_name: String,
    strategy: RwLock<Arc<dyn Invocable>>,
}

impl Method {
    /// The short name the method was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name used as the RPC method identifier on the wire.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Invokes the method with schema-less params.
    pub async fn call(&self, params: Value) -> Result<Value, CallError> {
        let strategy = self
            .strategy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        strategy.invoke(&self.qualified_name, params).await
    }

    /// Typed wrapper over [`Method::call`].
    pub async fn call_as<P, R>(&self, params: &P) -> Result<R, CallError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(CallError::Serialize)?;
        let value = self.call(params).await?;
        serde_json::from_value(value).map_err(CallError::Decode)
    }

    /// Replaces the invocation strategy. Calls already in flight keep the old one.
    pub fn use_strategy(&self, strategy: Arc<dyn Invocable>) {
        *self.strategy.write().unwrap_or_else(PoisonError::into_inner) = strategy;
    }
}

impl Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("qualified_name", &self.qualified_name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Registry {
    methods: BTreeMap<String, Arc<Method>>,
    binding: Option<Weak<dyn Invocable>>,
}

#[derive(Default)]
struct ServiceInner {
    namespace: Option<String>,
    registry: Mutex<Registry>,
}

/// A named set of callable methods.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Clone, Default)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    /// Creates a service without a namespace: methods go on the wire under their short name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose methods go on the wire as `namespace.method`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            inner: Arc::new(ServiceInner {
                namespace: (!namespace.is_empty()).then_some(namespace),
                registry: Mutex::default(),
            }),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    /// Declares a method without local behavior.
    ///
    /// Calling it before a client is bound fails with [`CallError::NotBound`].
    pub fn register(&self, name: impl Into<String>) -> Result<Arc<Method>, RegisterError> {
        self.insert(name.into(), Arc::new(Unbound))
    }

    /// Declares a method that runs `handler` until a client is bound.
    pub fn register_with(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn Invocable>,
    ) -> Result<Arc<Method>, RegisterError> {
        self.insert(name.into(), handler)
    }

    /// Looks up a method by its short name.
    pub fn method(&self, name: &str) -> Option<Arc<Method>> {
        self.registry().methods.get(name).cloned()
    }

    /// All registered methods, ordered by short name.
    pub fn methods(&self) -> Vec<Arc<Method>> {
        self.registry().methods.values().cloned().collect()
    }

    /// Invokes a method by its short name.
    pub async fn call(&self, name: &str, params: Value) -> Result<Value, CallError> {
        let method = self
            .method(name)
            .ok_or_else(|| CallError::MethodNotFound(name.to_string()))?;
        method.call(params).await
    }

    /// Routes every method, present and future, through `strategy`.
    ///
    /// Replaces any previous binding. Existing methods are rerouted under the registry lock,
    /// so a concurrent registration always ends up on the latest binding. The service keeps a
    /// weak reference only; methods registered after the caller drops `strategy` keep their
    /// own behavior.
    ///
    /// Returns the number of methods rerouted.
    pub fn attach(&self, strategy: &Arc<dyn Invocable>) -> usize {
        let mut registry = self.registry();
        registry.binding = Some(Arc::downgrade(strategy));
        for method in registry.methods.values() {
            method.use_strategy(Arc::clone(strategy));
        }
        registry.methods.len()
    }

    fn insert(
        &self,
        name: String,
        strategy: Arc<dyn Invocable>,
    ) -> Result<Arc<Method>, RegisterError> {
        if name.is_empty() || name.contains('.') {
            return Err(RegisterError::InvalidName(name));
        }

        let qualified_name = match self.namespace() {
            Some(namespace) => format!("{namespace}.{name}"),
            None => name.clone(),
        };

        let mut registry = self.registry();
        if registry.methods.contains_key(&name) {
            return Err(RegisterError::DuplicateMethod(name));
        }

        let strategy = match registry.binding.as_ref().and_then(Weak::upgrade) {
            Some(binding) => {
                debug!(method = %qualified_name, "Routing method registered after bind");
                binding
            }
            None => strategy,
        };

        let method = Arc::new(Method {
            name: name.clone(),
            qualified_name,
            strategy: RwLock::new(strategy),
        });
        registry.methods.insert(name, Arc::clone(&method));

        Ok(method)
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.registry().methods.keys().cloned().collect();
        f.debug_struct("Service")
            .field("namespace", &self.inner.namespace)
            .field("methods", &names)
            .finish()
    }
}
