use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A table and the tables whose rows it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDependency {
    pub table: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl TableDependency {
    pub fn new(table: &str, depends_on: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            depends_on: depends_on.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreOrderError {
    #[error("table '{table}' is listed more than once")]
    DuplicateTable { table: String },
    #[error("table '{table}' depends on unknown table '{dependency}'")]
    UnknownDependency { table: String, dependency: String },
    /// `tables` holds only the cycle members, not the tables merely waiting on them.
    #[error("dependency cycle between tables: {}", .tables.join(", "))]
    Cycle { tables: Vec<String> },
}

/// Restoration order with every table after its dependencies; ties break alphabetically.
pub fn restoration_order(tables: &[TableDependency]) -> Result<Vec<String>, RestoreOrderError> {
    let mut pending: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for entry in tables {
        if pending.insert(entry.table.as_str(), BTreeSet::new()).is_some() {
            return Err(RestoreOrderError::DuplicateTable {
                table: entry.table.clone(),
            });
        }
    }

    for entry in tables {
        for dependency in &entry.depends_on {
            if !pending.contains_key(dependency.as_str()) {
                return Err(RestoreOrderError::UnknownDependency {
                    table: entry.table.clone(),
                    dependency: dependency.clone(),
                });
            }
            // Self references only matter for row order inside one table.
            if dependency != &entry.table {
                if let Some(waiting_on) = pending.get_mut(entry.table.as_str()) {
                    waiting_on.insert(dependency.as_str());
                }
            }
        }
    }

    let mut order = Vec::with_capacity(pending.len());
    loop {
        let Some(ready) = pending
            .iter()
            .find(|(_, waiting_on)| waiting_on.is_empty())
            .map(|(table, _)| *table)
        else {
            break;
        };

        pending.remove(ready);
        for waiting_on in pending.values_mut() {
            waiting_on.remove(ready);
        }
        order.push(ready.to_string());
    }

    if !pending.is_empty() {
        let tables = pending
            .keys()
            .filter(|table| reaches(&pending, table, table))
            .map(|table| table.to_string())
            .collect();
        return Err(RestoreOrderError::Cycle { tables });
    }
    Ok(order)
}

/// Whether `target` is reachable from `from` by following at least one dependency edge.
fn reaches(graph: &BTreeMap<&str, BTreeSet<&str>>, from: &str, target: &str) -> bool {
    let mut stack: Vec<&str> = graph.get(from).into_iter().flatten().copied().collect();
    let mut seen = BTreeSet::new();
    while let Some(next) = stack.pop() {
        if next == target {
            return true;
        }
        if seen.insert(next) {
            if let Some(dependencies) = graph.get(next) {
                stack.extend(dependencies.iter().copied());
            }
        }
    }
    false
}
