use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Core error type shared across schemaport crates.
///
/// Every failure aborts the enclosing compilation or import; nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced schema fragment could not be fetched or parsed.
    #[error("cannot resolve schema reference {target}: {reason}")]
    SchemaResolution { target: String, reason: String },
    /// A resolution failure surfaced while walking the schema tree.
    #[error("schema compilation failed at {pointer}: {source}")]
    SchemaCompile {
        pointer: String,
        #[source]
        source: Box<Error>,
    },
    /// A property shape has no column type mapping.
    #[error("cannot map property {table}.{property} to a column type: {definition}")]
    UnmappableType {
        table: String,
        property: String,
        definition: String,
    },
    /// A record names a `dataset.class` pair the compiled schema does not declare.
    #[error("class encountered not defined in schema: {key}")]
    UnknownTable { key: String },
    /// A record line is not a valid routed JSON object.
    #[error("malformed record on line {line}: {message}")]
    RecordParse { line: usize, message: String },
    /// Database error or driver failure.
    #[error("database error: {0}")]
    Db(String),
    /// The schema violates structural invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The compiled schema does not satisfy the meta-schema.
    #[error("schema failed meta-schema validation with {} issue(s)", .0.issues.len())]
    Validation(Box<ValidationFailure>),
    /// Filesystem or stream failure outside schema resolution.
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Wrap an error with the JSON pointer of the node being compiled.
    pub fn at_pointer(self, pointer: impl Into<String>) -> Self {
        Error::SchemaCompile {
            pointer: pointer.into(),
            source: Box::new(self),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

/// Convenience alias for results returned by schemaport crates.
pub type Result<T> = std::result::Result<T, Error>;

/// One meta-schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending instance location.
    pub path: String,
    pub message: String,
}

/// Structured validation failure: the rejected document plus every issue.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFailure {
    pub data: Value,
    pub issues: Vec<ValidationIssue>,
}
