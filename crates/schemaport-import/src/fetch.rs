use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use schemaport_core::{Error, Result, is_identifier};

use crate::target::db_error;

/// Read up to `limit` rows of an imported table as JSON objects keyed by
/// column name.
pub async fn fetch_rows(pool: &PgPool, dataset: &str, class: &str, limit: i64) -> Result<Vec<Value>> {
    for name in [dataset, class] {
        if !is_identifier(name) {
            return Err(Error::InvalidSchema(format!(
                "not a plain table identifier: {name:?}"
            )));
        }
    }

    let sql = format!("select row_to_json(t) from {dataset}.{class} t limit $1");
    let rows = sqlx::query_scalar::<_, Json<Value>>(&sql)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await
        .map_err(db_error)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
