//! Schema reference resolution, compilation and meta-schema validation.
//!
//! A dataset schema may point at its classes (and a class at its property
//! schema) through `$ref`. Compilation replaces every such reference with a
//! freshly fetched copy so the result carries no indirection.

pub mod compiler;
pub mod source;
pub mod validate;

pub use compiler::{CompiledSchema, compile, compile_file, compile_remote, compile_with};
pub use source::{FileSource, HttpSource, SchemaSource, file_reference, remote_reference, source_for};
pub use validate::{SchemaValidator, load_meta_schema};
