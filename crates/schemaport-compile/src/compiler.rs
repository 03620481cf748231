use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde_json::Value;

use schemaport_core::{DatasetSchema, Error, Result};

use crate::source::{FileSource, HttpSource, SchemaSource, source_for};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A dataset schema with every `schema`/`classes` reference materialized.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// The full compiled document, unknown fields included.
    pub document: Value,
    /// Typed view used for DDL generation and import planning.
    pub dataset: DatasetSchema,
}

impl CompiledSchema {
    fn from_document(document: Value) -> Result<Self> {
        let dataset = serde_json::from_value(document.clone())
            .map_err(|err| Error::InvalidSchema(format!("compiled schema is malformed: {err}")))?;
        Ok(Self { document, dataset })
    }

    pub fn id(&self) -> &str {
        &self.dataset.id
    }
}

/// Compile a dataset schema, resolving references relative to `base`.
///
/// `base` is either a directory or an `http(s)` base URL.
pub async fn compile(schema: &Value, base: &str) -> Result<CompiledSchema> {
    let source = source_for(base)?;
    compile_with(schema, source.as_ref()).await
}

/// Compile a dataset schema with an explicit reference source.
///
/// The input is never mutated; every resolved reference is a fresh copy.
pub async fn compile_with(schema: &Value, source: &dyn SchemaSource) -> Result<CompiledSchema> {
    let document = compile_node(schema.clone(), source, String::new()).await?;
    let compiled = CompiledSchema::from_document(document)?;
    tracing::info!(
        event = "schema_compiled",
        dataset = %compiled.dataset.id,
        classes = compiled.dataset.classes.len(),
        base = %source.base(),
    );
    Ok(compiled)
}

/// Read a dataset schema file and compile it relative to its directory.
pub async fn compile_file(path: &Path) -> Result<CompiledSchema> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::SchemaResolution {
            target: path.display().to_string(),
            reason: err.to_string(),
        })?;
    let schema: Value = serde_json::from_str(&content).map_err(|err| Error::SchemaResolution {
        target: path.display().to_string(),
        reason: format!("invalid json: {err}"),
    })?;

    let root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    compile_with(&schema, &FileSource::new(root)).await
}

/// Fetch `<base_url>/<id>/<id>` and compile it relative to `<base_url>/<id>/`.
pub async fn compile_remote(base_url: &str, dataset_id: &str) -> Result<CompiledSchema> {
    let dataset_base = format!("{}/{dataset_id}/", base_url.trim_end_matches('/'));
    let source = HttpSource::new(dataset_base)?;
    let schema = source.resolve(dataset_id).await?;
    compile_with(&schema, &source).await
}

async fn resolve_if_reference(node: Value, source: &dyn SchemaSource) -> Result<Value> {
    let reference = node.get("$ref").and_then(Value::as_str).map(str::to_string);
    match reference {
        Some(reference) => source.resolve(&reference).await,
        None => Ok(node),
    }
}

fn compile_node<'a>(
    node: Value,
    source: &'a dyn SchemaSource,
    pointer: String,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let Value::Object(mut object) = node else {
            return Ok(node);
        };

        if let Some(schema) = object.get_mut("schema") {
            let schema_pointer = format!("{pointer}/schema");
            *schema = resolve_if_reference(schema.take(), source)
                .await
                .map_err(|err| err.at_pointer(schema_pointer))?;
        }

        if let Some(classes) = object.get_mut("classes") {
            let Value::Array(items) = classes.take() else {
                return Err(Error::InvalidSchema(format!(
                    "`classes` at {pointer}/classes must be an array"
                )));
            };

            let mut compiled = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_pointer = format!("{pointer}/classes/{index}");
                let resolved = resolve_if_reference(item, source)
                    .await
                    .map_err(|err| err.at_pointer(item_pointer.clone()))?;
                compiled.push(compile_node(resolved, source, item_pointer).await?);
            }
            *classes = Value::Array(compiled);
        }

        Ok(Value::Object(object))
    })
}
