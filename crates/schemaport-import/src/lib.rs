//! Streaming NDJSON import into Postgres/PostGIS.
//!
//! Records are pulled from a [`ChunkSource`], grouped into batches by the
//! [`RecordBatcher`] and written table by table inside one transaction.

pub mod batcher;
pub mod fetch;
pub mod importer;
pub mod render;
pub mod source;
pub mod statement;
pub mod target;

pub use batcher::{DEFAULT_BATCH_SIZE, Record, RecordBatcher};
pub use fetch::fetch_rows;
pub use importer::{ImportSummary, run_import};
pub use render::{RenderConfigClient, render_config_path, write_render_config};
pub use source::{ChunkList, ChunkSource, FileListSource, ReaderSource, dataset_files};
pub use statement::{BindValue, InsertStatement, MAX_BIND_PARAMS, build_insert};
pub use target::{ConnectOptions, ImportContext, ImportTarget, PgImportTarget};
