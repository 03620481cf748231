use std::collections::BTreeMap;

use serde::Serialize;

use schemaport_core::{
    ColumnConstraint, DEFAULT_SRID, DatasetSchema, Error, Result, is_identifier, validate_dataset,
};

use crate::grants::grant_statements;
use crate::graph::creation_order;
use crate::table::TableSpec;

/// Everything the importer needs, derived once from a compiled schema:
/// the DDL script and the column set of every destination table.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPlan {
    pub dataset: String,
    pub script: String,
    /// Tables keyed by `<dataset>.<class>`.
    pub tables: BTreeMap<String, TableSpec>,
    /// Table keys with foreign-key targets before the tables referencing them.
    pub order: Vec<String>,
}

impl ImportPlan {
    pub fn build(dataset: &DatasetSchema, default_srid: i32) -> Result<Self> {
        validate_dataset(dataset)?;

        let specs = dataset
            .classes
            .iter()
            .map(|class| TableSpec::from_class(dataset, class, default_srid))
            .collect::<Result<Vec<_>>>()?;
        check_reference_targets(&specs)?;

        let order = creation_order(&specs)?;
        let grants = grant_statements(dataset)?;

        let mut lines = vec![
            format!("DROP SCHEMA IF EXISTS {} CASCADE;", dataset.id),
            format!("CREATE SCHEMA {};", dataset.id),
        ];
        lines.extend(order.iter().map(|position| specs[*position].create_statement()));
        lines.extend(grants);

        let order = order.iter().map(|position| specs[*position].key()).collect();
        let tables = specs
            .into_iter()
            .map(|spec| (spec.key(), spec))
            .collect();

        Ok(Self {
            dataset: dataset.id.clone(),
            script: lines.join("\n"),
            tables,
            order,
        })
    }

    /// Column set for a routing key, if the schema declares it.
    pub fn table(&self, key: &str) -> Option<&TableSpec> {
        self.tables.get(key)
    }

    /// Tables in insert order: referenced tables come first.
    pub fn ordered_tables(&self) -> impl Iterator<Item = &TableSpec> {
        self.order.iter().filter_map(|key| self.tables.get(key))
    }
}

/// Full DDL script for a dataset, using the default SRID for planning.
pub fn schema_script(dataset: &DatasetSchema) -> Result<String> {
    ImportPlan::build(dataset, DEFAULT_SRID).map(|plan| plan.script)
}

fn check_reference_targets(specs: &[TableSpec]) -> Result<()> {
    for spec in specs {
        for column in &spec.columns {
            if let Some(ColumnConstraint::References { table }) = &column.constraint {
                let valid = table.split('.').count() <= 2 && table.split('.').all(is_identifier);
                if !valid {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key target of {}.{} is not a table name: {table:?}",
                        spec.key(),
                        column.name
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parks() -> DatasetSchema {
        serde_json::from_value(json!({
            "id": "parks",
            "crs": "EPSG:28992",
            "classes": [
                {
                    "id": "tree",
                    "crs": "EPSG:4326",
                    "schema": {"properties": {
                        "id": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/id"},
                        "park": {
                            "$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/uri",
                            "ams.$ref.class": "https://ams-schema.glitch.me/dataset/parks/park"
                        },
                        "species": {"type": "string", "auth": ["public"]}
                    }}
                },
                {
                    "id": "park",
                    "schema": {"properties": {
                        "id": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/id"},
                        "name": {"type": "string"}
                    }}
                }
            ]
        }))
        .expect("parse parks")
    }

    #[test]
    fn script_drops_creates_then_grants() {
        let plan = ImportPlan::build(&parks(), DEFAULT_SRID).unwrap();
        let expected = "DROP SCHEMA IF EXISTS parks CASCADE;\n\
             CREATE SCHEMA parks;\n\
             CREATE TABLE parks.park (id text PRIMARY KEY, name text);\n\
             CREATE TABLE parks.tree (id text PRIMARY KEY, park text REFERENCES parks.park(id), species text);\n\
             GRANT SELECT(species) ON parks.tree TO PUBLIC;";
        assert_eq!(plan.script, expected);
    }

    #[test]
    fn tables_are_keyed_by_dataset_and_class() {
        let plan = ImportPlan::build(&parks(), DEFAULT_SRID).unwrap();
        let keys: Vec<&str> = plan.tables.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["parks.park", "parks.tree"]);
        assert_eq!(plan.table("parks.tree").unwrap().srid, 4326);
        assert_eq!(plan.table("parks.park").unwrap().srid, 28992);
        assert!(plan.table("parks.bench").is_none());
    }

    #[test]
    fn orders_referenced_tables_first() {
        let plan = ImportPlan::build(&parks(), DEFAULT_SRID).unwrap();
        assert_eq!(plan.order, vec!["parks.park", "parks.tree"]);
        let names: Vec<&str> = plan.ordered_tables().map(|table| table.name.as_str()).collect();
        assert_eq!(names, vec!["park", "tree"]);
    }

    #[test]
    fn invalid_dataset_id_fails_before_ddl() {
        let mut dataset = parks();
        dataset.id = "parks cascade".to_string();
        assert!(matches!(
            ImportPlan::build(&dataset, DEFAULT_SRID),
            Err(Error::InvalidSchema(_))
        ));
    }
}
