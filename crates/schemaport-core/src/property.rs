//! The closed set of property shapes a class may declare.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::naming::{strip_version_tag, table_name_from_uri};
use crate::types::{ColumnConstraint, SqlType};

/// Base of the shared definitions referenced by `$ref`, without version tag.
pub const DEFINITIONS_BASE: &str = "https://ams-schema.glitch.me/schema#/definitions/";
/// Base of the GeoJSON geometry schemas.
pub const GEOJSON_BASE: &str = "https://geojson.org/schema/";
/// Annotation naming the class a URI property points at.
pub const CLASS_ANNOTATION: &str = "ams.$ref.class";

/// Geometry flavours recognized through GeoJSON references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Any,
    Point,
    Polygon,
}

/// Exhaustive union of supported property shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
    Integer,
    Boolean,
    StringArray,
    JsonDocument,
    Text,
    DateTime,
    Date,
    Identifier,
    ClassRef,
    DatasetRef,
    Geometry(GeometryKind),
    Year,
    /// URI pointing at a row of `target` (`<dataset>.<class>`).
    ForeignKeyUri { target: String },
}

impl PropertyKind {
    /// Column type and constraint for this shape.
    pub fn column_type(&self) -> (SqlType, Option<ColumnConstraint>) {
        match self {
            PropertyKind::Number => (SqlType::DoublePrecision, None),
            PropertyKind::Integer | PropertyKind::Year => (SqlType::Integer, None),
            PropertyKind::Boolean => (SqlType::Boolean, None),
            PropertyKind::StringArray => (SqlType::TextArray, None),
            PropertyKind::JsonDocument => (SqlType::Jsonb, None),
            PropertyKind::Text | PropertyKind::ClassRef | PropertyKind::DatasetRef => {
                (SqlType::Text, None)
            }
            PropertyKind::DateTime => (SqlType::TimestampTz, None),
            PropertyKind::Date => (SqlType::Date, None),
            PropertyKind::Identifier => (SqlType::Text, Some(ColumnConstraint::PrimaryKey)),
            PropertyKind::Geometry(_) => (SqlType::Geometry, None),
            PropertyKind::ForeignKeyUri { target } => (
                SqlType::Text,
                Some(ColumnConstraint::References {
                    table: target.clone(),
                }),
            ),
        }
    }
}

/// A classified property with its optional grantees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    /// Roles granted column-level `SELECT`, in declaration order.
    pub auth: Vec<String>,
}

impl PropertyDef {
    /// Classify a raw property definition of `table`.
    pub fn classify(table: &str, name: &str, definition: &Value) -> Result<Self> {
        let unmappable = || Error::UnmappableType {
            table: table.to_string(),
            property: name.to_string(),
            definition: definition.to_string(),
        };

        let object = definition.as_object().ok_or_else(unmappable)?;
        let kind = classify_shape(object).ok_or_else(unmappable)?;
        let auth = parse_auth(table, name, object.get("auth"))?;

        Ok(Self {
            name: name.to_string(),
            kind,
            auth,
        })
    }
}

fn classify_shape(object: &Map<String, Value>) -> Option<PropertyKind> {
    if let Some(json_type) = object.get("type").and_then(Value::as_str) {
        let format = object.get("format").and_then(Value::as_str);
        return match (json_type, format) {
            ("number", _) => Some(PropertyKind::Number),
            ("integer", _) => Some(PropertyKind::Integer),
            ("boolean", _) => Some(PropertyKind::Boolean),
            ("array", _) => Some(PropertyKind::StringArray),
            ("object", _) => Some(PropertyKind::JsonDocument),
            ("string", None) => Some(PropertyKind::Text),
            ("string", Some("date-time")) => Some(PropertyKind::DateTime),
            ("string", Some("date")) => Some(PropertyKind::Date),
            _ => None,
        };
    }

    let reference = object.get("$ref").and_then(Value::as_str)?;
    classify_reference(reference, object)
}

fn classify_reference(reference: &str, object: &Map<String, Value>) -> Option<PropertyKind> {
    if let Some(schema) = reference.strip_prefix(GEOJSON_BASE) {
        return match schema {
            "Geometry.json" => Some(PropertyKind::Geometry(GeometryKind::Any)),
            "Point.json" => Some(PropertyKind::Geometry(GeometryKind::Point)),
            "Polygon.json" => Some(PropertyKind::Geometry(GeometryKind::Polygon)),
            _ => None,
        };
    }

    let unversioned = strip_version_tag(reference);
    match unversioned.strip_prefix(DEFINITIONS_BASE)? {
        "id" => Some(PropertyKind::Identifier),
        "class" => Some(PropertyKind::ClassRef),
        "dataset" => Some(PropertyKind::DatasetRef),
        "year" => Some(PropertyKind::Year),
        "uri" => object
            .get(CLASS_ANNOTATION)
            .and_then(Value::as_str)
            .map(|uri| PropertyKind::ForeignKeyUri {
                target: table_name_from_uri(uri),
            }),
        _ => None,
    }
}

fn parse_auth(table: &str, name: &str, auth: Option<&Value>) -> Result<Vec<String>> {
    let Some(auth) = auth else {
        return Ok(Vec::new());
    };

    let invalid = || {
        Error::InvalidSchema(format!(
            "auth of {table}.{name} must be a list of role names, got {auth}"
        ))
    };

    auth.as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|role| role.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}
