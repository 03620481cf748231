use serde_json::Value;

use schemaport_core::{Column, Error, Result, SqlType};
use schemaport_ddl::TableSpec;

use crate::batcher::Record;

/// Postgres caps a single statement at this many bind parameters.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// A value bound to one placeholder of an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    /// Text the placeholder cast converts to the column type.
    Text(String),
    TextArray(Vec<Option<String>>),
}

/// One multi-row insert into a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Qualified `<dataset>.<class>` table name.
    pub table: String,
    pub sql: String,
    pub params: Vec<BindValue>,
    pub rows: usize,
}

/// Build one `INSERT ... VALUES (...), (...)` for `records`.
///
/// Columns follow the table's column order. Missing and null values become
/// SQL `NULL`; geometry values are parsed from GeoJSON with the table SRID.
pub fn build_insert(table: &TableSpec, records: &[&Record]) -> Result<InsertStatement> {
    let names: Vec<&str> = table.columns.iter().map(|column| column.name.as_str()).collect();
    let mut params = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let mut placeholders = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let value = record.value(&column.property).filter(|value| !value.is_null());
            let Some(value) = value else {
                placeholders.push("NULL".to_string());
                continue;
            };
            params.push(bind_value(column, value));
            placeholders.push(placeholder(column, params.len(), table.srid));
        }
        rows.push(format!("({})", placeholders.join(", ")));
    }

    if params.len() > MAX_BIND_PARAMS {
        return Err(Error::InvalidSchema(format!(
            "insert into {} needs {} bind parameters (limit {MAX_BIND_PARAMS}); lower the batch size",
            table.key(),
            params.len()
        )));
    }

    Ok(InsertStatement {
        table: table.key(),
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            table.key(),
            names.join(", "),
            rows.join(", ")
        ),
        params,
        rows: records.len(),
    })
}

fn placeholder(column: &Column, position: usize, srid: i32) -> String {
    match column.sql_type {
        SqlType::Geometry => format!("ST_SetSRID(ST_GeomFromGeoJSON(${position}), {srid})"),
        other => format!("${position}::{}", other.as_sql()),
    }
}

fn bind_value(column: &Column, value: &Value) -> BindValue {
    match (column.sql_type, value) {
        (SqlType::TextArray, Value::Array(items)) => BindValue::TextArray(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => None,
                    other => Some(scalar_text(other)),
                })
                .collect(),
        ),
        (SqlType::Jsonb, other) => BindValue::Text(other.to_string()),
        (_, other) => BindValue::Text(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaport_core::{ColumnConstraint, DatasetSchema};
    use serde_json::json;

    fn tree_table() -> TableSpec {
        let dataset: DatasetSchema = serde_json::from_value(json!({
            "id": "parks",
            "crs": "EPSG:4326",
            "classes": [{
                "id": "tree",
                "schema": {"properties": {
                    "id": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/id"},
                    "height": {"type": "number"},
                    "tags": {"type": "array"},
                    "extra": {"type": "object"},
                    "geometry": {"$ref": "https://geojson.org/schema/Point.json"}
                }}
            }]
        }))
        .unwrap();
        TableSpec::from_class(&dataset, &dataset.classes[0], 28992).unwrap()
    }

    fn record(values: Value) -> Record {
        Record {
            line: 1,
            dataset: "parks".to_string(),
            class: "tree".to_string(),
            values: values.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn builds_typed_placeholders_with_table_srid() {
        let table = tree_table();
        assert_eq!(table.columns[0].constraint, Some(ColumnConstraint::PrimaryKey));

        let one = record(json!({
            "id": "t1",
            "height": 12.5,
            "tags": ["oak", null],
            "extra": {"note": "x"},
            "geometry": {"type": "Point", "coordinates": [4.9, 52.3]}
        }));
        let statement = build_insert(&table, &[&one]).unwrap();

        assert_eq!(statement.table, "parks.tree");
        assert_eq!(
            statement.sql,
            "INSERT INTO parks.tree (id, height, tags, extra, geometry) VALUES \
             ($1::text, $2::double precision, $3::text[], $4::jsonb, \
             ST_SetSRID(ST_GeomFromGeoJSON($5), 4326))"
        );
        assert_eq!(
            statement.params,
            vec![
                BindValue::Text("t1".to_string()),
                BindValue::Text("12.5".to_string()),
                BindValue::TextArray(vec![Some("oak".to_string()), None]),
                BindValue::Text("{\"note\":\"x\"}".to_string()),
                BindValue::Text("{\"type\":\"Point\",\"coordinates\":[4.9,52.3]}".to_string()),
            ]
        );
    }

    #[test]
    fn missing_and_null_values_become_sql_null() {
        let table = tree_table();
        let first = record(json!({"id": "t1", "height": null}));
        let second = record(json!({"id": "t2", "height": 3}));
        let statement = build_insert(&table, &[&first, &second]).unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO parks.tree (id, height, tags, extra, geometry) VALUES \
             ($1::text, NULL, NULL, NULL, NULL), ($2::text, $3::double precision, NULL, NULL, NULL)"
        );
        assert_eq!(statement.params.len(), 3);
        assert_eq!(statement.rows, 2);
    }

    #[test]
    fn rejects_statements_over_the_parameter_limit() {
        let table = tree_table();
        let one = record(json!({"id": "t1", "height": 1, "tags": [], "extra": {}, "geometry": {}}));
        let records: Vec<&Record> = std::iter::repeat_n(&one, MAX_BIND_PARAMS / 5 + 1).collect();
        assert!(matches!(
            build_insert(&table, &records),
            Err(Error::InvalidSchema(_))
        ));
    }
}
