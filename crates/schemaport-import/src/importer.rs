use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Serialize;

use schemaport_core::{Error, Result};
use schemaport_ddl::ImportPlan;

use crate::batcher::{Record, RecordBatcher};
use crate::source::ChunkSource;
use crate::statement::{InsertStatement, build_insert};
use crate::target::ImportTarget;

/// Outcome of a committed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub dataset: String,
    pub batches: usize,
    pub rows_total: u64,
    pub rows_by_table: BTreeMap<String, u64>,
    pub duration_ms: u64,
}

/// Recreate the dataset schema and load every record in one transaction.
///
/// The DDL script runs first, then each batch is grouped by table and
/// inserted with one statement per table. The next batch is pulled only
/// after the current one is written. Any failure rolls the whole import
/// back, DDL included, and is returned unchanged.
pub async fn run_import<T, S>(
    plan: &ImportPlan,
    mut target: T,
    batcher: &mut RecordBatcher<S>,
) -> Result<ImportSummary>
where
    T: ImportTarget,
    S: ChunkSource,
{
    let started = Instant::now();
    tracing::info!(
        event = "import_started",
        dataset = %plan.dataset,
        tables = plan.tables.len(),
        batch_size = batcher.batch_size(),
    );

    match load(plan, &mut target, batcher).await {
        Ok(mut summary) => {
            target.commit().await?;
            summary.duration_ms = started.elapsed().as_millis() as u64;
            tracing::info!(
                event = "import_committed",
                dataset = %summary.dataset,
                batches = summary.batches,
                rows = summary.rows_total,
                duration_ms = summary.duration_ms,
            );
            Ok(summary)
        }
        Err(err) => {
            tracing::warn!(event = "import_rolled_back", dataset = %plan.dataset, error = %err);
            if let Err(rollback) = target.rollback().await {
                tracing::warn!(event = "rollback_failed", error = %rollback);
            }
            Err(err)
        }
    }
}

async fn load<T, S>(
    plan: &ImportPlan,
    target: &mut T,
    batcher: &mut RecordBatcher<S>,
) -> Result<ImportSummary>
where
    T: ImportTarget,
    S: ChunkSource,
{
    target.execute_script(&plan.script).await?;
    tracing::info!(event = "ddl_executed", dataset = %plan.dataset);

    let mut summary = ImportSummary {
        dataset: plan.dataset.clone(),
        batches: 0,
        rows_total: 0,
        rows_by_table: BTreeMap::new(),
        duration_ms: 0,
    };

    while let Some(batch) = batcher.next_batch().await? {
        let statements = plan_batch(plan, &batch)?;
        for statement in &statements {
            let written = target.insert(statement).await?;
            *summary
                .rows_by_table
                .entry(statement.table.clone())
                .or_default() += written;
            summary.rows_total += written;
        }
        summary.batches += 1;
        tracing::debug!(
            event = "batch_inserted",
            batch = summary.batches,
            records = batch.len(),
            tables = statements.len(),
        );
    }

    Ok(summary)
}

/// Resolve every record of a batch before anything is inserted.
///
/// Statements follow the plan's table order so rows of a referenced table
/// are written before rows pointing at them.
fn plan_batch(plan: &ImportPlan, batch: &[Record]) -> Result<Vec<InsertStatement>> {
    let mut groups: HashMap<String, Vec<&Record>> = HashMap::new();
    for record in batch {
        let key = record.key();
        if plan.table(&key).is_none() {
            return Err(Error::UnknownTable { key });
        }
        groups.entry(key).or_default().push(record);
    }

    plan.ordered_tables()
        .filter_map(|table| {
            groups
                .get(&table.key())
                .map(|records| build_insert(table, records))
        })
        .collect()
}
