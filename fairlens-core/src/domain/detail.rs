// fairlens-core/src/domain/detail.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque, stage- or rule-specific payload returned by the backend.
///
/// The core never interprets its content; it is carried through to the
/// report and the progress view as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Detail(Map<String, Value>);

impl Detail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Detail {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
