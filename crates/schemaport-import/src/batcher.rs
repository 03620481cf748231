use serde_json::{Map, Value};

use schemaport_core::{Error, Result};

use crate::source::ChunkSource;

/// Records per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One parsed NDJSON line routed by its `dataset` and `class` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line number in the input stream.
    pub line: usize,
    pub dataset: String,
    pub class: String,
    /// The full object, routing fields included.
    pub values: Map<String, Value>,
}

impl Record {
    /// Routing key `<dataset>.<class>`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.dataset, self.class)
    }

    pub fn value(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }
}

/// Groups a chunked NDJSON stream into batches of records.
///
/// Chunks are pulled only when the buffered bytes do not hold enough lines
/// to fill the next batch, so the importer controls the input pace.
#[derive(Debug)]
pub struct RecordBatcher<S> {
    source: S,
    batch_size: usize,
    buffer: Vec<u8>,
    start: usize,
    line: usize,
    exhausted: bool,
}

impl<S: ChunkSource> RecordBatcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_batch_size(source, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(source: S, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            start: 0,
            line: 0,
            exhausted: false,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Next non-empty batch, or `None` once the stream is drained.
    ///
    /// The final batch may hold fewer than `batch_size` records.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Record>>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let Some((line, bytes)) = self.next_line().await? else {
                break;
            };
            if let Some(record) = parse_record(line, &bytes)? {
                batch.push(record);
            }
        }

        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    async fn next_line(&mut self) -> Result<Option<(usize, Vec<u8>)>> {
        loop {
            if let Some(offset) = self.buffer[self.start..].iter().position(|byte| *byte == b'\n') {
                let end = self.start + offset;
                let bytes = self.buffer[self.start..end].to_vec();
                self.start = end + 1;
                self.line += 1;
                return Ok(Some((self.line, bytes)));
            }

            if self.exhausted {
                if self.start >= self.buffer.len() {
                    return Ok(None);
                }
                let bytes = self.buffer[self.start..].to_vec();
                self.start = self.buffer.len();
                self.line += 1;
                return Ok(Some((self.line, bytes)));
            }

            self.buffer.drain(..self.start);
            self.start = 0;
            match self.source.next_chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.exhausted = true,
            }
        }
    }
}

/// Parse one line; blank lines yield `None`.
fn parse_record(line: usize, bytes: &[u8]) -> Result<Option<Record>> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|err| Error::RecordParse {
        line,
        message: format!("invalid utf-8: {err}"),
    })?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(text).map_err(|err| Error::RecordParse {
        line,
        message: err.to_string(),
    })?;
    let Value::Object(values) = value else {
        return Err(Error::RecordParse {
            line,
            message: "record is not a JSON object".to_string(),
        });
    };

    let dataset = routing_field(line, &values, "dataset")?;
    let class = routing_field(line, &values, "class")?;
    Ok(Some(Record {
        line,
        dataset,
        class,
        values,
    }))
}

fn routing_field(line: usize, values: &Map<String, Value>, field: &str) -> Result<String> {
    values
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::RecordParse {
            line,
            message: format!("missing string field \"{field}\""),
        })
}
