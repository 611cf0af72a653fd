//! SQL operations planned from entity relation graphs.

pub mod create;
pub mod read;
pub mod remove;
pub mod update;

use serde_json::{Map, Value};

use crate::error::{Result, TesselError};
use crate::graph::{EntityRelationGraph, NodeId};
use crate::meta::{ColumnMeta, EntityClass, RelationKind, RelationMeta};
use crate::prelude::*;
use crate::sql::SQL;
use crate::store::{Store, WriteResult};

pub use create::{InsertPlan, plan_insert};
pub use read::{ReadQuery, build_read};
pub use remove::{RemovePlan, plan_remove};
pub use update::{UpdatePlan, plan_update};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Select,
    Update,
    Remove,
}

/// One statement's worth of work against one table.
#[derive(Debug, Clone)]
pub struct SqlOperation<'r> {
    pub kind: OperationKind,
    pub entity: EntityClass,
    pub table: &'r str,
    /// Graph node the operation was planned from.
    pub node: NodeId,
    /// Columns whose properties are present in `value`.
    pub columns: Vec<&'r ColumnMeta>,
    /// Relations populated on the node.
    pub relations: Vec<&'r RelationMeta>,
    /// Scalar property values of the node.
    pub value: Map<String, Value>,
    /// Foreign key columns not mapped to any property.
    pub foreign_keys: Vec<(&'r str, Value)>,
    /// Execution tier; operations with a lower priority run first.
    pub priority: usize,
}

impl<'r> SqlOperation<'r> {
    /// Sets a foreign key column, through its property when one is declared.
    pub fn set_foreign_key(&mut self, foreign_key: &ForeignKey<'r>, value: Value) {
        match foreign_key.property {
            Some(column) => {
                if !self.columns.iter().any(|c| c.property_name == column.property_name) {
                    self.columns.push(column);
                }
                self.value.insert(column.property_name.clone(), value);
            }
            None => {
                self.foreign_keys.retain(|(name, _)| *name != foreign_key.column);
                self.foreign_keys.push((foreign_key.column, value));
            }
        }
    }

    /// Column names and encoded parameters of every present column, in order.
    pub fn column_values(&self) -> Result<Vec<(&'r str, Value)>> {
        let mut values = Vec::with_capacity(self.columns.len() + self.foreign_keys.len());
        for column in self.columns.iter().copied() {
            let Some(value) = self.value.get(&column.property_name) else {
                continue;
            };
            let encoded = column.data_type.encode(value).ok_or_else(|| {
                TesselError::DataShape(format!(
                    "`{}.{}` cannot store {}",
                    self.entity, column.property_name, value
                ))
            })?;
            values.push((column.column_name.as_str(), encoded));
        }
        values.extend(self.foreign_keys.iter().cloned());
        Ok(values)
    }

    pub fn primary_key_value(&self, identifier: &ColumnMeta) -> Option<&Value> {
        self.value
            .get(&identifier.property_name)
            .filter(|value| !value.is_null())
    }
}

/// Ordered collection of planned operations.
#[derive(Debug, Clone, Default)]
pub struct OperationQueue<'r> {
    operations: Vec<SqlOperation<'r>>,
}

impl<'r> OperationQueue<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: SqlOperation<'r>) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlOperation<'r>> {
        self.operations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SqlOperation<'r>> {
        self.operations.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SqlOperation<'r>> {
        self.operations.get_mut(index)
    }

    pub fn by_kind(&self, kind: OperationKind) -> impl Iterator<Item = &SqlOperation<'r>> {
        self.operations.iter().filter(move |op| op.kind == kind)
    }

    pub fn by_table<'q>(&'q self, table: &'q str) -> impl Iterator<Item = &'q SqlOperation<'r>> {
        self.operations.iter().filter(move |op| op.table == table)
    }

    /// Distinct target tables in first-seen order.
    pub fn tables(&self) -> Vec<&'r str> {
        let mut tables: Vec<&'r str> = Vec::new();
        for op in &self.operations {
            if !tables.contains(&op.table) {
                tables.push(op.table);
            }
        }
        tables
    }

    /// Distinct priorities in ascending order.
    pub fn priorities(&self) -> Vec<usize> {
        let mut priorities: Vec<usize> = self.operations.iter().map(|op| op.priority).collect();
        priorities.sort_unstable();
        priorities.dedup();
        priorities
    }

    /// Indices of the operations with `priority`, in queue order.
    pub fn indices_at(&self, priority: usize) -> Vec<usize> {
        self.operations
            .iter()
            .enumerate()
            .filter(|(_, op)| op.priority == priority)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the operation planned from `node`.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.operations.iter().position(|op| op.node == node)
    }

    pub fn into_operations(self) -> Vec<SqlOperation<'r>> {
        self.operations
    }
}

/// A foreign key between two graph nodes: `dependent.column` references the
/// primary key of `dependency`.
#[derive(Debug, Clone)]
pub struct ForeignKey<'r> {
    pub dependent: NodeId,
    pub dependency: NodeId,
    pub column: &'r str,
    /// Property of the dependent entity stored in `column`.
    pub property: Option<&'r ColumnMeta>,
}

/// Foreign keys implied by every edge of `graph`, and the tier of each node.
///
/// The side holding the foreign key depends on the other side: children of
/// one-to-many relations, owners of many-to-one relations, and the one-to-one side
/// declaring the join column. A node's tier is one more than the deepest tier it
/// depends on.
pub(crate) fn plan_foreign_keys<'r>(
    graph: &EntityRelationGraph<'r, '_>,
    operation: &'static str,
) -> Result<(Vec<ForeignKey<'r>>, Vec<usize>)> {
    let registry = graph.registry();
    let mut foreign_keys = Vec::new();

    for (id, node) in graph.nodes() {
        let (Some(relation), Some(parent)) = (node.via, node.parent) else {
            continue;
        };

        let (dependent, dependency, column) = match relation.kind {
            RelationKind::OneToMany => {
                let inverse = registry.get_inverse_relation(relation)?;
                let column = inverse.and_then(|r| r.join_column.as_deref());
                (id, parent, column)
            }
            RelationKind::ManyToOne => (parent, id, relation.join_column.as_deref()),
            RelationKind::OneToOne => match relation.join_column.as_deref() {
                Some(column) => (parent, id, Some(column)),
                None => {
                    let inverse = registry.get_inverse_relation(relation)?;
                    (id, parent, inverse.and_then(|r| r.join_column.as_deref()))
                }
            },
            RelationKind::ManyToMany => {
                return Err(TesselError::UnsupportedRelation {
                    entity: relation.entity,
                    property: relation.property_name.clone(),
                    kind: relation.kind,
                    operation,
                });
            }
        };

        let column = column.ok_or_else(|| TesselError::MetadataResolution {
            entity: relation.entity,
            property: relation.property_name.clone(),
            reason: "neither side declares a join column".into(),
        })?;

        let dependent_entity = graph.node(dependent).entity;
        foreign_keys.push(ForeignKey {
            dependent,
            dependency,
            column,
            property: registry.get_column_by_name(dependent_entity, column),
        });
    }

    let mut tiers: Vec<Option<usize>> = vec![None; graph.len()];
    for id in 0..graph.len() {
        tier_of(NodeId(id), &foreign_keys, &mut tiers);
    }
    let tiers = tiers.into_iter().map(|tier| tier.unwrap_or(0)).collect();

    Ok((foreign_keys, tiers))
}

fn tier_of(node: NodeId, foreign_keys: &[ForeignKey<'_>], tiers: &mut [Option<usize>]) -> usize {
    if let Some(tier) = tiers[node.0] {
        return tier;
    }
    tiers[node.0] = Some(0);

    let tier = foreign_keys
        .iter()
        .filter(|fk| fk.dependent == node)
        .map(|fk| tier_of(fk.dependency, foreign_keys, tiers) + 1)
        .max()
        .unwrap_or(0);
    tiers[node.0] = Some(tier);
    tier
}

/// Builds one operation per graph node, tiered by its foreign key dependencies.
pub(crate) fn plan_operations<'r>(
    graph: &EntityRelationGraph<'r, '_>,
    kind: OperationKind,
    tiers: &[usize],
) -> Result<OperationQueue<'r>> {
    let registry = graph.registry();
    let mut queue = OperationQueue::new();

    for (id, node) in graph.nodes() {
        let mut value = Map::new();
        let mut columns = Vec::new();
        for column in node.columns {
            if let Some(present) = node.column_value(column) {
                if holds_instance(node.relations, &column.property_name, present) {
                    continue;
                }
                value.insert(column.property_name.clone(), present.clone());
                columns.push(column);
            }
        }

        let relations = node
            .relations
            .iter()
            .filter(|relation| {
                node.value
                    .get(&relation.property_name)
                    .is_some_and(|v| v.is_object() || v.is_array())
            })
            .collect();

        queue.push(SqlOperation {
            kind,
            entity: node.entity,
            table: registry.table_name(node.entity)?,
            node: id,
            columns,
            relations,
            value,
            foreign_keys: Vec::new(),
            priority: tiers[id.0],
        });
    }

    Ok(queue)
}

/// Writes the scalar values of every operation back into `root` at its node.
pub(crate) fn write_back(
    graph: &EntityRelationGraph<'_, '_>,
    queue: &OperationQueue<'_>,
    root: &mut Value,
) {
    for op in queue.iter() {
        let pointer = graph.pointer(op.node);
        let relations = graph.node(op.node).relations;
        if let Some(Value::Object(target)) = root.pointer_mut(&pointer) {
            for (property, value) in &op.value {
                if target
                    .get(property)
                    .is_some_and(|current| holds_instance(relations, property, current))
                {
                    continue;
                }
                target.insert(property.clone(), value.clone());
            }
        }
    }
}

/// Whether `value` is a related instance under a property that is also a column.
fn holds_instance(relations: &[RelationMeta], property: &str, value: &Value) -> bool {
    (value.is_object() || value.is_array())
        && relations.iter().any(|relation| relation.property_name == property)
}

/// Renders `sql` for the store's dialect and runs it as a write.
pub(crate) async fn execute_write<S: Store>(store: &S, sql: &SQL<'_>) -> Result<WriteResult> {
    let (text, params) = sql.build(S::DIALECT);
    crate::tessel_trace_query!(&text, params.len());
    store.execute_statement(&text, &params).await?.into_write()
}
