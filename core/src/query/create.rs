//! Dependency-ordered inserts of a value tree.

use serde_json::Value;

use crate::error::{Result, TesselError};
use crate::graph::EntityRelationGraph;
use crate::meta::{EntityClass, MetadataRegistry};
use crate::prelude::*;
use crate::query::{
    ForeignKey, OperationKind, OperationQueue, execute_write, plan_foreign_keys,
    plan_operations, write_back,
};
use crate::sql::{SQL, Token};
use crate::store::{BatchIds, Store};

/// Insert operations for every node of a normalized value tree.
#[derive(Debug, Clone)]
pub struct InsertPlan<'r, 'v> {
    pub graph: EntityRelationGraph<'r, 'v>,
    pub queue: OperationQueue<'r>,
    pub foreign_keys: Vec<ForeignKey<'r>>,
}

/// Plans the insertion of `value`, which should come from
/// [`EntityInstanceFactory::normalize`](crate::factory::EntityInstanceFactory::normalize).
pub fn plan_insert<'r, 'v>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    value: &'v Value,
) -> Result<InsertPlan<'r, 'v>> {
    crate::tessel_profile_scope!("create", "plan");
    let graph = EntityRelationGraph::build(registry, entity, value)?;
    let (foreign_keys, tiers) = plan_foreign_keys(&graph, "insert")?;
    let queue = plan_operations(&graph, OperationKind::Insert, &tiers)?;

    Ok(InsertPlan {
        graph,
        queue,
        foreign_keys,
    })
}

/// Rows of one tier sharing a table and a column set.
struct InsertGroup<'r> {
    table: &'r str,
    columns: Vec<&'r str>,
    rows: Vec<(usize, Vec<Value>)>,
}

impl<'r, 'v> InsertPlan<'r, 'v> {
    /// Tiers in execution order, each holding the tables written in it.
    pub fn tiers(&self) -> Vec<Vec<&'r str>> {
        self.queue
            .priorities()
            .into_iter()
            .map(|priority| {
                let mut tables: Vec<&'r str> = Vec::new();
                for index in self.queue.indices_at(priority) {
                    if let Some(op) = self.queue.get(index)
                        && !tables.contains(&op.table)
                    {
                        tables.push(op.table);
                    }
                }
                tables
            })
            .collect()
    }

    /// Runs the inserts tier by tier and returns the value tree with generated
    /// identifiers and foreign keys filled in.
    ///
    /// Rows are batched into multi-row statements only when `batch` is set and the
    /// store reports contiguous identifiers.
    pub async fn execute<S: Store>(mut self, store: &S, batch: bool) -> Result<Value> {
        let contiguous = batch && store.batch_ids() == BatchIds::Contiguous;
        let mut keys: Vec<Option<Value>> = vec![None; self.graph.len()];

        for priority in self.queue.priorities() {
            let indices = self.queue.indices_at(priority);

            for &index in &indices {
                self.propagate_foreign_keys(index, &keys)?;
            }

            for group in self.group(&indices)? {
                if contiguous && group.rows.len() > 1 && !group.columns.is_empty() {
                    let sql = insert_sql(
                        group.table,
                        &group.columns,
                        group.rows.iter().map(|(_, params)| params.clone()),
                    );
                    let result = execute_write(store, &sql).await?;
                    for (offset, (index, _)) in group.rows.iter().enumerate() {
                        let generated = result.first_insert_id.map(|first| first + offset as i64);
                        self.record_key(*index, generated, &mut keys)?;
                    }
                } else {
                    for (index, params) in group.rows {
                        let sql = insert_sql(group.table, &group.columns, [params]);
                        let result = execute_write(store, &sql).await?;
                        self.record_key(index, result.first_insert_id, &mut keys)?;
                    }
                }
            }
        }

        let mut root = Value::Object(self.graph.root().value.clone());
        write_back(&self.graph, &self.queue, &mut root);
        Ok(root)
    }

    fn propagate_foreign_keys(&mut self, index: usize, keys: &[Option<Value>]) -> Result<()> {
        let Some(node) = self.queue.get(index).map(|op| op.node) else {
            return Ok(());
        };

        for foreign_key in self.foreign_keys.iter().filter(|fk| fk.dependent == node) {
            let key = keys[foreign_key.dependency.0].clone().ok_or_else(|| {
                TesselError::MissingIdentifier(self.graph.node(foreign_key.dependency).entity)
            })?;
            if let Some(op) = self.queue.get_mut(index) {
                op.set_foreign_key(foreign_key, key);
            }
        }
        Ok(())
    }

    fn group(&self, indices: &[usize]) -> Result<Vec<InsertGroup<'r>>> {
        let mut groups: Vec<InsertGroup<'r>> = Vec::new();
        for &index in indices {
            let Some(op) = self.queue.get(index) else {
                continue;
            };
            let (columns, params): (Vec<&'r str>, Vec<Value>) =
                op.column_values()?.into_iter().unzip();

            match groups
                .iter_mut()
                .find(|group| group.table == op.table && group.columns == columns)
            {
                Some(group) => group.rows.push((index, params)),
                None => groups.push(InsertGroup {
                    table: op.table,
                    columns,
                    rows: vec![(index, params)],
                }),
            }
        }
        Ok(groups)
    }

    /// Stores the identifier of the row inserted for operation `index`; an
    /// identifier present in the value wins over the generated one.
    fn record_key(
        &mut self,
        index: usize,
        generated: Option<i64>,
        keys: &mut [Option<Value>],
    ) -> Result<()> {
        let registry = self.graph.registry();
        let Some(op) = self.queue.get_mut(index) else {
            return Ok(());
        };
        let identifier = registry.get_identifier_property(op.entity)?;

        let key = match op.primary_key_value(identifier).cloned() {
            Some(existing) => existing,
            None => {
                let id = generated.ok_or_else(|| {
                    TesselError::ExecutionError(format!(
                        "store reported no generated identifier for `{}`",
                        op.table
                    ))
                })?;
                let key = Value::from(id);
                op.value.insert(identifier.property_name.clone(), key.clone());
                key
            }
        };
        keys[op.node.0] = Some(key);
        Ok(())
    }
}

/// `INSERT INTO "table" ("a", "b") VALUES (?, ?), (?, ?)`
fn insert_sql<'a>(
    table: &'a str,
    columns: &[&'a str],
    rows: impl IntoIterator<Item = Vec<Value>>,
) -> SQL<'a> {
    let sql = SQL::token(Token::INSERT)
        .push(Token::INTO)
        .append(SQL::ident(table));

    if columns.is_empty() {
        return sql.push(Token::DEFAULT).push(Token::VALUES);
    }

    let rows = rows
        .into_iter()
        .map(|params| SQL::param_list(params).parens());

    sql.append(SQL::ident_list(columns.iter().copied()).parens())
        .push(Token::VALUES)
        .append(SQL::join(rows, Token::COMMA))
}
