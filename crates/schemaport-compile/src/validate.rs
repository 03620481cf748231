use std::path::Path;

use jsonschema::JSONSchema;
use serde_json::Value;

use schemaport_core::{Error, Result, ValidationFailure, ValidationIssue};

use crate::source::{fetch_json, is_remote};

/// Validates compiled dataset schemas against a meta-schema.
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Compile the meta-schema once; the validator can then be reused.
    pub fn new(meta_schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::compile(meta_schema)
            .map_err(|err| Error::InvalidSchema(format!("meta-schema does not compile: {err}")))?;
        Ok(Self { compiled })
    }

    /// Returns `Ok(true)` or a structured `Validation` error listing every issue.
    pub fn validate(&self, document: &Value) -> Result<bool> {
        if let Err(errors) = self.compiled.validate(document) {
            let issues: Vec<ValidationIssue> = errors
                .map(|error| ValidationIssue {
                    path: normalized_pointer(&error.instance_path.to_string()),
                    message: error.to_string(),
                })
                .collect();
            return Err(Error::Validation(Box::new(ValidationFailure {
                data: document.clone(),
                issues,
            })));
        }
        Ok(true)
    }
}

fn normalized_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

/// Load a meta-schema from a URL or a local file.
pub async fn load_meta_schema(location: &str) -> Result<Value> {
    if is_remote(location) {
        let client = reqwest::Client::new();
        return fetch_json(&client, location).await;
    }

    let path = Path::new(location);
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::SchemaResolution {
            target: path.display().to_string(),
            reason: err.to_string(),
        })?;
    serde_json::from_str(&content).map_err(|err| Error::SchemaResolution {
        target: path.display().to_string(),
        reason: format!("invalid json: {err}"),
    })
}
