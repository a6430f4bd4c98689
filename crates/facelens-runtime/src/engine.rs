//! In-memory inference engine.
//!
//! Keeps the factory registry, live backend instances, the active backend
//! and the environment flag store. Each instantiation gets a new generation
//! number so callers can tell a reset backend from a reused one.

use crate::flags::ValidatedFlags;
use crate::registry::{BackendFactory, BackendRegistry, RegistryError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct Engine {
    factories: HashMap<String, BackendFactory>,
    /// Live instances: backend name → generation it was created in.
    instances: HashMap<String, u64>,
    active: Option<String>,
    env: BTreeMap<String, Value>,
    next_generation: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: HashMap::new(),
            active: None,
            env: BTreeMap::new(),
            next_generation: 1,
        }
    }

    /// Engine with an always-succeeding factory for each name.
    pub fn with_backends<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut engine = Self::new();
        for name in names {
            engine.register(name, Arc::new(|| Ok::<(), String>(())));
        }
        engine
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    pub fn flags(&self) -> &BTreeMap<String, Value> {
        &self.env
    }

    /// Generation of the live instance, if `name` is instantiated.
    pub fn instance_generation(&self, name: &str) -> Option<u64> {
        self.instances.get(name).copied()
    }

    /// Registered factory names, sorted.
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    fn instantiate(&mut self, name: &str) -> Result<(), RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        factory().map_err(|reason| RegistryError::InitFailed {
            name: name.to_string(),
            reason,
        })?;
        let generation = self.next_generation;
        self.next_generation += 1;
        self.instances.insert(name.to_string(), generation);
        tracing::debug!(backend = name, generation, "backend instantiated");
        Ok(())
    }
}

impl BackendRegistry for Engine {
    fn is_factory_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn is_live(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    fn factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).cloned()
    }

    fn remove(&mut self, name: &str) {
        self.factories.remove(name);
        if self.instances.remove(name).is_some() {
            tracing::debug!(backend = name, "backend instance disposed");
        }
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
    }

    fn register(&mut self, name: &str, factory: BackendFactory) {
        if self.factories.insert(name.to_string(), factory).is_some() {
            tracing::warn!(backend = name, "backend factory replaced");
        }
    }

    async fn activate(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.is_live(name) {
            self.instantiate(name)?;
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    fn set_flags(&mut self, flags: &ValidatedFlags) -> Result<(), RegistryError> {
        for (name, value) in flags.iter() {
            self.env.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn test_activate_instantiates_once() {
        let mut engine = Engine::with_backends(["cpu", "webgl"]);
        assert!(!engine.is_live("webgl"));

        engine.activate("webgl").await.unwrap();
        assert_eq!(engine.active(), Some("webgl"));
        let first = engine.instance_generation("webgl").unwrap();

        engine.activate("cpu").await.unwrap();
        engine.activate("webgl").await.unwrap();
        assert_eq!(engine.instance_generation("webgl"), Some(first));
    }

    #[tokio::test]
    async fn test_activate_unknown_backend() {
        let mut engine = Engine::with_backends(["cpu"]);
        let err = engine.activate("webgpu").await.unwrap_err();
        assert_eq!(err, RegistryError::NotRegistered("webgpu".into()));
        assert_eq!(engine.active(), None);
    }

    #[tokio::test]
    async fn test_factory_failure() {
        let mut engine = Engine::new();
        engine.register("webgl", Arc::new(|| Err::<(), String>("context lost".to_string())));
        let err = engine.activate("webgl").await.unwrap_err();
        assert!(matches!(err, RegistryError::InitFailed { ref reason, .. } if reason == "context lost"));
        assert!(!engine.is_live("webgl"));
    }

    #[tokio::test]
    async fn test_remove_then_register_forces_fresh_instance() {
        let mut engine = Engine::with_backends(["webgl"]);
        engine.activate("webgl").await.unwrap();
        let before = engine.instance_generation("webgl").unwrap();

        let factory = engine.factory("webgl").unwrap();
        engine.remove("webgl");
        assert!(!engine.is_factory_registered("webgl"));
        assert_eq!(engine.active(), None);
        engine.register("webgl", factory);
        engine.activate("webgl").await.unwrap();

        assert!(engine.instance_generation("webgl").unwrap() > before);
    }

    #[test]
    fn test_set_flags_merges() {
        let mut engine = Engine::new();
        let mut first = Map::new();
        first.insert("WEBGL_PACK".into(), json!(false));
        first.insert("WEBGL_VERSION".into(), json!(1));
        engine.set_flags(&ValidatedFlags(first)).unwrap();

        let mut second = Map::new();
        second.insert("WEBGL_VERSION".into(), json!(2));
        engine.set_flags(&ValidatedFlags(second)).unwrap();

        assert_eq!(engine.flag("WEBGL_PACK"), Some(&json!(false)));
        assert_eq!(engine.flag("WEBGL_VERSION"), Some(&json!(2)));
    }

    #[test]
    fn test_backend_names_sorted() {
        let engine = Engine::with_backends(["webgl", "cpu", "wasm"]);
        assert_eq!(engine.backend_names(), ["cpu", "wasm", "webgl"]);
    }
}
