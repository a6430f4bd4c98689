//! Tunable flag allow-list.
//!
//! Maps each tunable engine flag to its legal values and the backends it is
//! relevant to. The builtin table is embedded at compile time from
//! `contrib/flags.toml`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

const BUILTIN_FLAGS: &str = include_str!("../../../contrib/flags.toml");

static BUILTIN: OnceLock<FlagTable> = OnceLock::new();

#[derive(Error, Debug)]
pub enum FlagTableError {
    #[error("bad flag table TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("flag {0} declared more than once")]
    Duplicate(String),
    #[error("flag {0} has no legal values")]
    Empty(String),
}

/// One allow-listed flag.
#[derive(Debug, Clone, Deserialize)]
pub struct TunableFlag {
    pub name: String,
    pub values: Vec<Value>,
    #[serde(default)]
    pub backends: Vec<String>,
}

impl TunableFlag {
    pub fn allows(&self, value: &Value) -> bool {
        self.values.iter().any(|legal| same_value(legal, value))
    }
}

#[derive(Deserialize)]
struct FlagFile {
    #[serde(default)]
    flag: Vec<TunableFlag>,
}

/// Allow-listed flags in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: Vec<TunableFlag>,
}

/// A flag map whose keys and values have all been checked against a [`FlagTable`].
///
/// Only [`crate::configurator`] validation produces one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedFlags(pub(crate) Map<String, Value>);

impl ValidatedFlags {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FlagTable {
    pub fn from_toml(src: &str) -> Result<Self, FlagTableError> {
        let file: FlagFile = toml::from_str(src)?;
        let mut table = FlagTable::default();
        for flag in file.flag {
            if table.get(&flag.name).is_some() {
                return Err(FlagTableError::Duplicate(flag.name));
            }
            if flag.values.is_empty() {
                return Err(FlagTableError::Empty(flag.name));
            }
            table.flags.push(flag);
        }
        Ok(table)
    }

    /// The embedded table. Parsed once; a malformed embed yields an empty table.
    pub fn builtin() -> &'static FlagTable {
        BUILTIN.get_or_init(|| match FlagTable::from_toml(BUILTIN_FLAGS) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "builtin flag table failed to parse");
                FlagTable::default()
            }
        })
    }

    pub fn get(&self, name: &str) -> Option<&TunableFlag> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn flags(&self) -> &[TunableFlag] {
        &self.flags
    }

    /// Flags relevant to the given backend identifier (e.g. `tfjs-webgl`).
    pub fn for_backend<'a>(&'a self, backend_id: &'a str) -> impl Iterator<Item = &'a TunableFlag> {
        self.flags
            .iter()
            .filter(move |f| f.backends.iter().any(|b| b == backend_id))
    }
}

/// Legal-value comparison: numbers by value (so `1` matches `1.0`), everything else by equality.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
