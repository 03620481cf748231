//! DDL generation for compiled dataset schemas.
//!
//! Maps every class to a `CREATE TABLE` statement through the total type
//! mapping in `schemaport-core`, derives column-level grants, and packages
//! the script together with per-table column metadata for the importer.

pub mod grants;
pub mod graph;
pub mod plan;
pub mod table;

pub use grants::{PUBLIC_GRANTEE, grant_statements};
pub use graph::creation_order;
pub use plan::{ImportPlan, schema_script};
pub use table::{TableSpec, create_table};
