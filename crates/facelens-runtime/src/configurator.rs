//! Backend switching with validated environment flags.
//!
//! Flag overrides are validated in full against the [`FlagTable`] before the
//! engine is touched. A `tfjs-*` backend is then reset (re-registered when
//! already live, so it comes back with a fresh context) and activated.

use crate::flags::{FlagTable, ValidatedFlags};
use crate::registry::{BackendRegistry, RegistryError};
use serde_json::{Map, Value};
use thiserror::Error;

/// Runtime family whose backends go through the reset path.
pub const TFJS_RUNTIME: &str = "tfjs";
/// Fallback when WebGPU is unavailable and no tfjs backend has been activated yet.
pub const DEFAULT_TFJS_BACKEND: &str = "tfjs-webgl";

const WEBGPU_BACKEND: &str = "webgpu";
const WEBGPU_UNSUPPORTED: &str = "webgpu backend is not registered. Your environment may not \
support WebGPU yet; use a WebGPU-enabled browser or build to test this backend.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid flag config: expected an object, got {0}")]
    InvalidArgument(String),
    #[error("{0} is not a tunable or valid environment flag")]
    UnknownFlag(String),
    #[error("{value} is not a valid value for flag {flag}")]
    InvalidFlagValue { flag: String, value: Value },
    #[error("{0} backend is not registered")]
    BackendNotRegistered(String),
    #[error(transparent)]
    Engine(#[from] RegistryError),
}

/// A `"<runtime>-<backend>"` identifier, e.g. `tfjs-webgl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendId {
    pub runtime: String,
    pub backend: Option<String>,
}

impl BackendId {
    /// Split on `-`; the backend is the second segment, anything after it is ignored.
    pub fn parse(id: &str) -> Self {
        let mut parts = id.split('-');
        let runtime = parts.next().unwrap_or_default().to_string();
        let backend = parts.next().map(str::to_string);
        Self { runtime, backend }
    }
}

/// Which backend is active and which tfjs backend last activated successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    active_backend: String,
    last_tfjs_backend: Option<String>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new(DEFAULT_TFJS_BACKEND)
    }
}

impl RuntimeState {
    pub fn new(active_backend: impl Into<String>) -> Self {
        Self {
            active_backend: active_backend.into(),
            last_tfjs_backend: None,
        }
    }

    pub fn active_backend(&self) -> &str {
        &self.active_backend
    }

    pub fn last_tfjs_backend(&self) -> Option<&str> {
        self.last_tfjs_backend.as_deref()
    }
}

/// Hooks for surfacing backend events to the user interface.
pub trait BackendUi {
    /// User-facing advisory, e.g. an unsupported backend was requested.
    fn alert(&self, message: &str);
    /// The active backend changed without the user picking it; re-render selectors.
    fn refresh_backend_options(&self, state: &RuntimeState);
}

/// [`BackendUi`] that only logs.
pub struct LogUi;

impl BackendUi for LogUi {
    fn alert(&self, message: &str) {
        tracing::info!(alert = %message, "user alert");
    }

    fn refresh_backend_options(&self, state: &RuntimeState) {
        tracing::info!(backend = state.active_backend(), "backend options refreshed");
    }
}

/// Applies flag overrides and switches backends on a [`BackendRegistry`].
///
/// Methods take `&mut self`, so concurrent switches must be serialized by
/// the owner.
pub struct Configurator<R> {
    registry: R,
    state: RuntimeState,
    table: FlagTable,
    ui: Box<dyn BackendUi + Send + Sync>,
}

impl<R: BackendRegistry> Configurator<R> {
    pub fn new(registry: R, state: RuntimeState) -> Self {
        Self {
            registry,
            state,
            table: FlagTable::builtin().clone(),
            ui: Box::new(LogUi),
        }
    }

    pub fn with_table(mut self, table: FlagTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_ui(mut self, ui: impl BackendUi + Send + Sync + 'static) -> Self {
        self.ui = Box::new(ui);
        self
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn table(&self) -> &FlagTable {
        &self.table
    }

    /// Validate and apply `flag_config`, then switch to `backend_id`.
    ///
    /// A missing or `null` config is a no-op: no flags change and no backend
    /// switch happens. Validation errors leave the engine untouched.
    pub async fn set_backend_and_env_flags(
        &mut self,
        flag_config: Option<&Value>,
        backend_id: &str,
    ) -> Result<(), ConfigError> {
        let flags = match flag_config {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Object(map)) => validate_flags(&self.table, map)?,
            Some(other) => return Err(ConfigError::InvalidArgument(value_kind(other).to_string())),
        };

        self.registry.set_flags(&flags)?;
        tracing::debug!(count = flags.len(), "engine flags applied");

        let id = BackendId::parse(backend_id);
        if id.runtime == TFJS_RUNTIME {
            self.reset_backend(id.backend.as_deref().unwrap_or_default()).await
        } else {
            tracing::info!(backend = backend_id, "non-tfjs runtime; flags applied without reset");
            self.state.active_backend = backend_id.to_string();
            Ok(())
        }
    }

    /// Reset and activate a tfjs backend by its short name (`webgl`, `wasm`, ...).
    ///
    /// An unregistered `webgpu` falls back to the last good tfjs backend and
    /// alerts the user instead of failing.
    pub async fn reset_backend(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.registry.is_factory_registered(name) {
            if name != WEBGPU_BACKEND {
                return Err(ConfigError::BackendNotRegistered(name.to_string()));
            }
            let fallback = self
                .state
                .last_tfjs_backend
                .clone()
                .unwrap_or_else(|| DEFAULT_TFJS_BACKEND.to_string());
            tracing::warn!(fallback = %fallback, "webgpu backend unavailable; falling back");
            self.ui.alert(WEBGPU_UNSUPPORTED);
            self.state.active_backend = fallback;
            self.ui.refresh_backend_options(&self.state);
            return Ok(());
        }

        if self.registry.is_live(name) {
            if let Some(factory) = self.registry.factory(name) {
                self.registry.remove(name);
                self.registry.register(name, factory);
                tracing::debug!(backend = name, "live backend re-registered");
            }
        }

        self.registry.activate(name).await?;

        let full = format!("{TFJS_RUNTIME}-{name}");
        tracing::info!(backend = %full, "backend activated");
        self.state.active_backend = full.clone();
        self.state.last_tfjs_backend = Some(full);
        Ok(())
    }
}

/// Check every key and value before anything is applied.
pub fn validate_flags(table: &FlagTable, config: &Map<String, Value>) -> Result<ValidatedFlags, ConfigError> {
    for (name, value) in config {
        let flag = table
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFlag(name.clone()))?;
        if !flag.allows(value) {
            return Err(ConfigError::InvalidFlagValue {
                flag: name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(ValidatedFlags(config.clone()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
