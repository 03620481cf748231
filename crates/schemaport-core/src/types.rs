use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::naming::to_snake_case;
use crate::property::PropertyDef;

/// Postgres column types produced by the type mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    DoublePrecision,
    Integer,
    Boolean,
    TextArray,
    Jsonb,
    Text,
    TimestampTz,
    Date,
    Geometry,
}

impl SqlType {
    /// SQL spelling used in DDL and casts.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::DoublePrecision => "double precision",
            SqlType::Integer => "integer",
            SqlType::Boolean => "boolean",
            SqlType::TextArray => "text[]",
            SqlType::Jsonb => "jsonb",
            SqlType::Text => "text",
            SqlType::TimestampTz => "timestamp with time zone",
            SqlType::Date => "date",
            SqlType::Geometry => "geometry",
        }
    }
}

/// Column-level constraint derived from a property shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnConstraint {
    PrimaryKey,
    /// `REFERENCES <table>(id)`.
    References { table: String },
}

/// Column metadata shared by DDL and insert generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Normalized column name.
    pub name: String,
    /// Property key the value is read from in records.
    pub property: String,
    pub sql_type: SqlType,
    pub constraint: Option<ColumnConstraint>,
}

impl Column {
    pub fn from_property(property: &PropertyDef) -> Self {
        let (sql_type, constraint) = property.kind.column_type();
        Self {
            name: to_snake_case(&property.name),
            property: property.name.clone(),
            sql_type,
            constraint,
        }
    }

    /// True when values must be encoded as geometries.
    pub fn is_geometry(&self) -> bool {
        self.sql_type == SqlType::Geometry
    }

    /// Column definition as it appears inside `CREATE TABLE`.
    pub fn definition(&self) -> String {
        let base = format!("{} {}", self.name, self.sql_type.as_sql());
        match &self.constraint {
            None => base,
            Some(ColumnConstraint::PrimaryKey) => format!("{base} PRIMARY KEY"),
            Some(ColumnConstraint::References { table }) => {
                format!("{base} REFERENCES {table}(id)")
            }
        }
    }
}

/// Derive the ordered column set for a list of properties.
pub fn columns_for(properties: &[PropertyDef]) -> Vec<Column> {
    properties.iter().map(Column::from_property).collect()
}

/// Classify a single raw property and derive its column.
pub fn column_for(table: &str, name: &str, definition: &serde_json::Value) -> Result<Column> {
    PropertyDef::classify(table, name, definition).map(|property| Column::from_property(&property))
}
