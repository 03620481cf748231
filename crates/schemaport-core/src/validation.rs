use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::naming::{is_identifier, is_reserved_keyword, to_snake_case};
use crate::schema::DatasetSchema;

/// Validate that a dataset can be spliced into DDL unquoted.
///
/// This checks:
/// - dataset ids, class ids and column names are plain identifiers
/// - none of them is a reserved SQL keyword
/// - class ids are unique within the dataset
/// - normalized column names are unique per class
pub fn validate_dataset(dataset: &DatasetSchema) -> Result<()> {
    if !is_identifier(&dataset.id) {
        return Err(Error::InvalidSchema(format!(
            "dataset id is not a plain identifier: {:?}",
            dataset.id
        )));
    }
    if is_reserved_keyword(&dataset.id) {
        return Err(Error::InvalidSchema(format!(
            "dataset id is a reserved SQL keyword: {}",
            dataset.id
        )));
    }

    let mut classes = BTreeSet::new();
    for class in &dataset.classes {
        if !is_identifier(&class.id) {
            return Err(Error::InvalidSchema(format!(
                "class id is not a plain identifier: {}.{:?}",
                dataset.id, class.id
            )));
        }
        if is_reserved_keyword(&class.id) {
            return Err(Error::InvalidSchema(format!(
                "class id is a reserved SQL keyword: {}.{}",
                dataset.id, class.id
            )));
        }
        if !classes.insert(class.id.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate class id: {}.{}",
                dataset.id, class.id
            )));
        }

        let mut columns = BTreeSet::new();
        for property in class.schema.properties.keys() {
            let column = to_snake_case(property);
            if !is_identifier(&column) {
                return Err(Error::InvalidSchema(format!(
                    "property {}.{}.{property:?} does not normalize to an identifier",
                    dataset.id, class.id
                )));
            }
            if is_reserved_keyword(&column) {
                return Err(Error::InvalidSchema(format!(
                    "property {}.{}.{property} maps to reserved SQL keyword {column}",
                    dataset.id, class.id
                )));
            }
            if !columns.insert(column.clone()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}.{column}",
                    dataset.id, class.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> DatasetSchema {
        serde_json::from_value(value).expect("parse dataset")
    }

    #[test]
    fn accepts_well_formed_dataset() {
        let schema = dataset(json!({
            "id": "parks",
            "classes": [
                {"id": "tree", "schema": {"properties": {"id": {}, "plantYear": {}}}},
                {"id": "park", "schema": {"properties": {"id": {}}}}
            ]
        }));
        assert!(validate_dataset(&schema).is_ok());
    }

    #[test]
    fn rejects_duplicate_classes() {
        let schema = dataset(json!({
            "id": "parks",
            "classes": [
                {"id": "tree", "schema": {"properties": {}}},
                {"id": "tree", "schema": {"properties": {}}}
            ]
        }));
        let err = validate_dataset(&schema).unwrap_err();
        assert!(err.to_string().contains("duplicate class id: parks.tree"));
    }

    #[test]
    fn rejects_columns_colliding_after_normalization() {
        let schema = dataset(json!({
            "id": "parks",
            "classes": [
                {"id": "tree", "schema": {"properties": {"plantYear": {}, "plant_year": {}}}}
            ]
        }));
        let err = validate_dataset(&schema).unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let schema = dataset(json!({"id": "parks; drop", "classes": []}));
        assert!(matches!(
            validate_dataset(&schema),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn rejects_reserved_keywords() {
        let schema = dataset(json!({
            "id": "shop",
            "classes": [{"id": "sale", "schema": {"properties": {"id": {}, "order": {}}}}]
        }));
        let err = validate_dataset(&schema).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
        assert!(err.to_string().contains("shop.sale.order"));

        let schema = dataset(json!({"id": "user", "classes": []}));
        let err = validate_dataset(&schema).unwrap_err();
        assert!(err.to_string().contains("reserved SQL keyword: user"));

        let schema = dataset(json!({
            "id": "shop",
            "classes": [{"id": "group", "schema": {"properties": {}}}]
        }));
        assert!(validate_dataset(&schema).is_err());
    }
}
