//! Core contracts and helpers for schemaport.
//!
//! This crate defines the dataset schema model, the closed union of property
//! shapes with its column type mapping, and the error taxonomy shared by the
//! compiler, DDL generator and importer.

pub mod crs;
pub mod error;
pub mod naming;
pub mod property;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;

pub use crs::{DEFAULT_SRID, parse_srid, resolve_srid};
pub use error::{Error, Result, ValidationFailure, ValidationIssue};
pub use naming::{
    is_identifier, is_reserved_keyword, strip_version_tag, table_name_from_uri, to_snake_case,
};
pub use property::{GeometryKind, PropertyDef, PropertyKind};
pub use redaction::redact_database_url;
pub use schema::{ClassDef, ClassSchema, DatasetSchema};
pub use types::{Column, ColumnConstraint, SqlType, column_for, columns_for};
pub use validation::validate_dataset;
