use serde::Serialize;

use schemaport_core::{ClassDef, Column, DatasetSchema, Result, columns_for, resolve_srid};

/// Destination table of one class: ordered columns plus the SRID used for
/// geometry values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub schema: String,
    pub name: String,
    pub srid: i32,
    pub columns: Vec<Column>,
}

impl TableSpec {
    /// Derive the table for `class`; fails on the first unmappable property.
    pub fn from_class(dataset: &DatasetSchema, class: &ClassDef, default_srid: i32) -> Result<Self> {
        let properties = class.property_defs()?;
        Ok(Self {
            schema: dataset.id.clone(),
            name: class.id.clone(),
            srid: resolve_srid(class.crs.as_deref(), dataset.crs.as_deref(), default_srid),
            columns: columns_for(&properties),
        })
    }

    /// Routing key `<dataset>.<class>`, also the qualified table name.
    pub fn key(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn create_statement(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::definition).collect();
        format!("CREATE TABLE {} ({});", self.key(), columns.join(", "))
    }
}

/// `CREATE TABLE <dataset>.<class> (...)` for one class.
pub fn create_table(dataset_name: &str, class: &ClassDef) -> Result<String> {
    let properties = class.property_defs()?;
    let columns: Vec<String> = columns_for(&properties)
        .iter()
        .map(Column::definition)
        .collect();
    Ok(format!(
        "CREATE TABLE {dataset_name}.{} ({});",
        class.id,
        columns.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaport_core::{DEFAULT_SRID, Error};
    use serde_json::json;

    fn class(value: serde_json::Value) -> ClassDef {
        serde_json::from_value(value).expect("parse class")
    }

    #[test]
    fn creates_table_in_property_order() {
        let cls = class(json!({
            "id": "cls",
            "schema": {"properties": {
                "id": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/id"},
                "name": {"type": "string"}
            }}
        }));
        assert_eq!(
            create_table("ds", &cls).unwrap(),
            "CREATE TABLE ds.cls (id text PRIMARY KEY, name text);"
        );
    }

    #[test]
    fn maps_every_supported_shape_to_one_column() {
        let cls = class(json!({
            "id": "tree",
            "schema": {"properties": {
                "height": {"type": "number"},
                "rings": {"type": "integer"},
                "alive": {"type": "boolean"},
                "tags": {"type": "array"},
                "extra": {"type": "object"},
                "name": {"type": "string"},
                "seenAt": {"type": "string", "format": "date-time"},
                "plantedOn": {"type": "string", "format": "date"},
                "id": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/id"},
                "class": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/class"},
                "dataset": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/dataset"},
                "geometry": {"$ref": "https://geojson.org/schema/Geometry.json"},
                "spot": {"$ref": "https://geojson.org/schema/Point.json"},
                "crown": {"$ref": "https://geojson.org/schema/Polygon.json"},
                "plantYear": {"$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/year"},
                "park": {
                    "$ref": "https://ams-schema.glitch.me/schema@v0.1#/definitions/uri",
                    "ams.$ref.class": "https://ams-schema.glitch.me/dataset/parks/park"
                }
            }}
        }));
        let dataset: DatasetSchema =
            serde_json::from_value(json!({"id": "parks", "classes": []})).unwrap();

        let table = TableSpec::from_class(&dataset, &cls, DEFAULT_SRID).unwrap();
        assert_eq!(table.columns.len(), 16);
        assert_eq!(
            table.create_statement(),
            "CREATE TABLE parks.tree (height double precision, rings integer, alive boolean, \
             tags text[], extra jsonb, name text, seen_at timestamp with time zone, \
             planted_on date, id text PRIMARY KEY, class text, dataset text, \
             geometry geometry, spot geometry, crown geometry, plant_year integer, \
             park text REFERENCES parks.park(id));"
        );
    }

    #[test]
    fn unmappable_property_fails_without_partial_table() {
        let cls = class(json!({
            "id": "tree",
            "schema": {"properties": {
                "name": {"type": "string"},
                "email": {"type": "string", "format": "email"}
            }}
        }));
        let err = create_table("parks", &cls).unwrap_err();
        assert!(matches!(
            err,
            Error::UnmappableType { ref table, ref property, .. }
                if table == "tree" && property == "email"
        ));
    }

    #[test]
    fn srid_follows_class_then_dataset_crs() {
        let dataset: DatasetSchema = serde_json::from_value(json!({
            "id": "parks",
            "crs": "EPSG:3857",
            "classes": [
                {"id": "tree", "crs": "EPSG:4326", "schema": {"properties": {}}},
                {"id": "bench", "schema": {"properties": {}}}
            ]
        }))
        .unwrap();

        let tree = TableSpec::from_class(&dataset, &dataset.classes[0], DEFAULT_SRID).unwrap();
        let bench = TableSpec::from_class(&dataset, &dataset.classes[1], DEFAULT_SRID).unwrap();
        assert_eq!(tree.srid, 4326);
        assert_eq!(bench.srid, 3857);
    }
}
