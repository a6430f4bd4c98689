use crate::flags::ValidatedFlags;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("backend {0} is not registered")]
    NotRegistered(String),
    #[error("backend {name} failed to initialize: {reason}")]
    InitFailed { name: String, reason: String },
    #[error("failed to set engine flags: {0}")]
    Flags(String),
}

/// Creates a fresh instance of a backend. Errors describe why the current
/// environment cannot host it.
pub type BackendFactory = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// The inference engine's backend registry and environment flag store.
///
/// A backend has a *factory* once registered and becomes *live* the first
/// time it is instantiated (usually on activation).
pub trait BackendRegistry {
    fn is_factory_registered(&self, name: &str) -> bool;
    fn is_live(&self, name: &str) -> bool;
    fn factory(&self, name: &str) -> Option<BackendFactory>;
    /// Drop the backend's factory and any live instance.
    fn remove(&mut self, name: &str);
    fn register(&mut self, name: &str, factory: BackendFactory);
    /// Make `name` the engine's current backend, instantiating it if needed.
    fn activate(&mut self, name: &str) -> impl Future<Output = Result<(), RegistryError>> + Send;
    fn set_flags(&mut self, flags: &ValidatedFlags) -> Result<(), RegistryError>;
}
