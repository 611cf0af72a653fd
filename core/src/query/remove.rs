//! Deletion of every node of a value tree.

use serde_json::Value;

use crate::error::{Result, TesselError};
use crate::graph::EntityRelationGraph;
use crate::meta::{EntityClass, MetadataRegistry};
use crate::prelude::*;
use crate::query::{OperationKind, OperationQueue, execute_write, plan_foreign_keys, plan_operations};
use crate::sql::{SQL, Token};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct RemovePlan<'r, 'v> {
    pub graph: EntityRelationGraph<'r, 'v>,
    pub queue: OperationQueue<'r>,
}

/// Plans the removal of every node in `value`; each must carry its primary key.
pub fn plan_remove<'r, 'v>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    value: &'v Value,
) -> Result<RemovePlan<'r, 'v>> {
    let graph = EntityRelationGraph::build(registry, entity, value)?;
    let (_, tiers) = plan_foreign_keys(&graph, "remove")?;
    let queue = plan_operations(&graph, OperationKind::Remove, &tiers)?;

    for op in queue.iter() {
        let identifier = registry.get_identifier_property(op.entity)?;
        if op.primary_key_value(identifier).is_none() {
            return Err(TesselError::MissingIdentifier(op.entity));
        }
    }

    Ok(RemovePlan { graph, queue })
}

impl<'r, 'v> RemovePlan<'r, 'v> {
    /// One `DELETE` per table and tier, rows holding foreign keys first.
    pub fn statements(&self) -> Result<Vec<SQL<'r>>> {
        let registry = self.graph.registry();
        let mut statements = Vec::new();

        for priority in self.queue.priorities().into_iter().rev() {
            let mut tables: Vec<(&'r str, &'r str, Vec<Value>)> = Vec::new();

            for index in self.queue.indices_at(priority) {
                let Some(op) = self.queue.get(index) else {
                    continue;
                };
                let identifier = registry.get_identifier_property(op.entity)?;
                let Some(key) = op.primary_key_value(identifier) else {
                    continue;
                };

                match tables.iter_mut().find(|(table, _, _)| *table == op.table) {
                    Some((_, _, keys)) => {
                        if !keys.contains(key) {
                            keys.push(key.clone());
                        }
                    }
                    None => tables.push((op.table, identifier.column_name.as_str(), vec![key.clone()])),
                }
            }

            for (table, column, keys) in tables {
                let condition = if keys.len() == 1 {
                    SQL::ident(column)
                        .push(Token::EQ)
                        .append(SQL::param_list(keys))
                } else {
                    SQL::ident(column)
                        .push(Token::IN)
                        .append(SQL::param_list(keys).parens())
                };
                statements.push(
                    SQL::token(Token::DELETE)
                        .push(Token::FROM)
                        .append(SQL::ident(table))
                        .push(Token::WHERE)
                        .append(condition),
                );
            }
        }
        Ok(statements)
    }

    /// Runs every delete and returns the number of removed rows.
    pub async fn execute<S: Store>(self, store: &S) -> Result<u64> {
        let mut affected = 0;
        for statement in self.statements()? {
            affected += execute_write(store, &statement).await?.affected_rows;
        }
        Ok(affected)
    }
}
