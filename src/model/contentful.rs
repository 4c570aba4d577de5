use serde::Deserialize;
use serde_json::{Map, Value};

/// One page of a collection listing.
#[derive(Debug, Deserialize, Clone)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Sys {
    pub id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentType {
    pub sys: Sys,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl ContentType {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn is_localized(&self, field_id: &str) -> bool {
        self.fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| f.localized)
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FieldDefinition {
    pub id: String,

    #[serde(default)]
    pub localized: bool,
}

/// An entry; `fields` maps field id to an object keyed by locale.
#[derive(Debug, Deserialize, Clone)]
pub struct Entry {
    pub sys: Sys,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Entry {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn localized_value(&self, field_id: &str, locale: &str) -> Option<&Value> {
        self.fields.get(field_id).and_then(|v| v.get(locale))
    }
}

/// Space and environment a scan runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocation {
    pub space_id: String,
    pub environment_id: String,
}

impl ContentLocation {
    pub fn new(space_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            environment_id: environment_id.into(),
        }
    }
}
