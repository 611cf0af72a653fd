//! Key-addressed updates of a value tree.

use serde_json::Value;

use crate::error::{Result, TesselError};
use crate::graph::EntityRelationGraph;
use crate::meta::{EntityClass, MetadataRegistry};
use crate::prelude::*;
use crate::query::{
    ForeignKey, OperationKind, OperationQueue, execute_write, plan_foreign_keys, plan_operations,
    write_back,
};
use crate::sql::{SQL, Token};
use crate::store::Store;

/// Update operations for every node of a value tree that carries its keys.
#[derive(Debug, Clone)]
pub struct UpdatePlan<'r, 'v> {
    pub graph: EntityRelationGraph<'r, 'v>,
    pub queue: OperationQueue<'r>,
}

/// Plans an update of every node in `value`.
///
/// Each node must carry its primary key. Foreign keys between nodes are set from
/// the keys of the nodes they reference.
pub fn plan_update<'r, 'v>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    value: &'v Value,
) -> Result<UpdatePlan<'r, 'v>> {
    crate::tessel_profile_scope!("update", "plan");
    let graph = EntityRelationGraph::build(registry, entity, value)?;
    let (foreign_keys, tiers) = plan_foreign_keys(&graph, "update")?;
    let mut queue = plan_operations(&graph, OperationKind::Update, &tiers)?;

    for (_, node) in graph.nodes() {
        let identifier = registry.get_identifier_property(node.entity)?;
        if node.column_value(identifier).is_none_or(Value::is_null) {
            return Err(TesselError::MissingIdentifier(node.entity));
        }
    }

    for foreign_key in &foreign_keys {
        propagate(&graph, &mut queue, foreign_key)?;
    }

    Ok(UpdatePlan { graph, queue })
}

fn propagate<'r>(
    graph: &EntityRelationGraph<'r, '_>,
    queue: &mut OperationQueue<'r>,
    foreign_key: &ForeignKey<'r>,
) -> Result<()> {
    let registry = graph.registry();
    let dependency = graph.node(foreign_key.dependency);
    let identifier = registry.get_identifier_property(dependency.entity)?;
    let key = dependency
        .column_value(identifier)
        .cloned()
        .ok_or(TesselError::MissingIdentifier(dependency.entity))?;

    if let Some(op) = queue
        .index_of(foreign_key.dependent)
        .and_then(|index| queue.get_mut(index))
    {
        op.set_foreign_key(foreign_key, key);
    }
    Ok(())
}

impl<'r, 'v> UpdatePlan<'r, 'v> {
    /// Statements in execution order; nodes with nothing to set are skipped.
    pub fn statements(&self) -> Result<Vec<SQL<'r>>> {
        let registry = self.graph.registry();
        let mut statements = Vec::new();

        for priority in self.queue.priorities() {
            for index in self.queue.indices_at(priority) {
                let Some(op) = self.queue.get(index) else {
                    continue;
                };
                let identifier = registry.get_identifier_property(op.entity)?;
                let key = op
                    .primary_key_value(identifier)
                    .cloned()
                    .ok_or(TesselError::MissingIdentifier(op.entity))?;

                let assignments: Vec<(&'r str, Value)> = op
                    .column_values()?
                    .into_iter()
                    .filter(|(column, _)| *column != identifier.column_name)
                    .collect();
                if assignments.is_empty() {
                    continue;
                }

                statements.push(
                    SQL::token(Token::UPDATE)
                        .append(SQL::ident(op.table))
                        .push(Token::SET)
                        .append(SQL::assignments(assignments))
                        .push(Token::WHERE)
                        .append(SQL::ident(identifier.column_name.as_str()))
                        .push(Token::EQ)
                        .append(SQL::param(key)),
                );
            }
        }
        Ok(statements)
    }

    /// Runs every update in dependency order and returns the value tree with the
    /// propagated foreign keys filled in.
    pub async fn execute<S: Store>(self, store: &S) -> Result<Value> {
        for statement in self.statements()? {
            execute_write(store, &statement).await?;
        }

        let mut root = Value::Object(self.graph.root().value.clone());
        write_back(&self.graph, &self.queue, &mut root);
        Ok(root)
    }
}
