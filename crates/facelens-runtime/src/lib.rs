//! facelens-runtime — Inference backend configuration.
//!
//! Validates tunable engine flags against an embedded allow-list and
//! switches the active backend, resetting it to a fresh instance first.

pub mod configurator;
pub mod engine;
pub mod flags;
pub mod registry;

pub use configurator::{
    BackendId, BackendUi, ConfigError, Configurator, LogUi, RuntimeState, DEFAULT_TFJS_BACKEND,
    TFJS_RUNTIME,
};
pub use engine::Engine;
pub use flags::{FlagTable, TunableFlag, ValidatedFlags};
pub use registry::{BackendFactory, BackendRegistry, RegistryError};
