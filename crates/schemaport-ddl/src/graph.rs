use std::collections::{BTreeMap, BTreeSet};

use schemaport_core::{ColumnConstraint, Error, Result};

use crate::table::TableSpec;

/// Order tables so that foreign-key targets inside the dataset are created
/// before the tables referencing them.
///
/// Independent tables keep declaration order. Self references and targets
/// outside the dataset impose no ordering.
pub fn creation_order(tables: &[TableSpec]) -> Result<Vec<usize>> {
    let index: BTreeMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(position, table)| (table.key(), position))
        .collect();

    // dependents[target] = tables that reference target
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
    let mut indegree = vec![0usize; tables.len()];

    for (position, table) in tables.iter().enumerate() {
        for column in &table.columns {
            let Some(ColumnConstraint::References { table: target }) = &column.constraint else {
                continue;
            };
            let Some(&target) = index.get(target) else {
                continue;
            };
            if target != position && dependents[target].insert(position) {
                indegree[position] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..tables.len())
        .filter(|position| indegree[*position] == 0)
        .collect();
    let mut order = Vec::with_capacity(tables.len());

    while let Some(position) = ready.pop_first() {
        order.push(position);
        for &dependent in &dependents[position] {
            indegree[dependent] = indegree[dependent].saturating_sub(1);
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == tables.len() {
        Ok(order)
    } else {
        let cycle: Vec<String> = (0..tables.len())
            .filter(|position| indegree[*position] > 0)
            .map(|position| tables[position].key())
            .collect();
        Err(Error::InvalidSchema(format!(
            "foreign key cycle between tables: {}",
            cycle.join(", ")
        )))
    }
}
