use schemaport_core::{
    DatasetSchema, Error, Result, is_identifier, is_reserved_keyword, to_snake_case,
};

/// Grantee name that maps onto the Postgres `PUBLIC` role.
pub const PUBLIC_GRANTEE: &str = "public";

/// Column-level `GRANT SELECT` statements for every property carrying `auth`.
///
/// Only the first grantee of each `auth` list is granted; additional
/// grantees are reported as warnings and otherwise ignored.
pub fn grant_statements(dataset: &DatasetSchema) -> Result<Vec<String>> {
    let mut statements = Vec::new();

    for class in &dataset.classes {
        for property in class.property_defs()? {
            let Some(first) = property.auth.first() else {
                continue;
            };

            if property.auth.len() > 1 {
                tracing::warn!(
                    event = "grant_truncated",
                    table = %format!("{}.{}", dataset.id, class.id),
                    property = %property.name,
                    granted = %first,
                    ignored = ?&property.auth[1..],
                );
            }

            let grantee = grantee_sql(first)?;
            statements.push(format!(
                "GRANT SELECT({}) ON {}.{} TO {grantee};",
                to_snake_case(&property.name),
                dataset.id,
                class.id
            ));
        }
    }

    Ok(statements)
}

fn grantee_sql(grantee: &str) -> Result<String> {
    if grantee == PUBLIC_GRANTEE {
        return Ok("PUBLIC".to_string());
    }
    if !is_identifier(grantee) || is_reserved_keyword(grantee) {
        return Err(Error::InvalidSchema(format!(
            "grantee is not a plain role name: {grantee:?}"
        )));
    }
    Ok(grantee.to_string())
}
