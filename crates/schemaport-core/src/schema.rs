use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::property::PropertyDef;

/// Typed view of a compiled dataset schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Namespace (Postgres schema) name.
    pub id: String,
    /// Default CRS code for geometry columns, e.g. `EPSG:28992`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

/// One entity class; becomes one table inside the dataset namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    /// Table name, unique within the dataset.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    pub schema: ClassSchema,
}

/// The JSON-Schema object describing a class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSchema {
    /// Property definitions in declaration order.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ClassDef {
    /// Classify every property, in declaration order.
    pub fn property_defs(&self) -> Result<Vec<PropertyDef>> {
        self.schema
            .properties
            .iter()
            .map(|(name, definition)| PropertyDef::classify(&self.id, name, definition))
            .collect()
    }
}

impl DatasetSchema {
    /// Find a class by its id.
    pub fn class(&self, id: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|class| class.id == id)
    }
}
