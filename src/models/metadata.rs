use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// Parsed tile metadata document (`metadata/<tile>.yml`).
///
/// Only `name` and `label` are interpreted; every other key is carried through
/// untouched. Key order is preserved so the re-serialized document lines up
/// with the original as closely as YAML allows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileMetadata(IndexMap<String, Value>);

impl TileMetadata {
    /// Parse a metadata document from raw archive bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_slice(raw)
    }

    /// Serialize the full document back to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }

    /// Get a top-level value rendered as text.
    ///
    /// Strings come back verbatim, other scalars as their YAML spelling and
    /// `null` as an empty string. Returns `None` if the key is absent.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(render_value)
    }

    /// Overwrite a top-level key with a string, keeping its position.
    pub fn set_text(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), Value::String(value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
