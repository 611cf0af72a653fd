//! Select statements with relation joins and key filters.

use hashbrown::HashSet;
use serde_json::{Map, Value};

use crate::error::{Result, TesselError};
use crate::factory::EntityInstanceFactory;
use crate::graph::EntityRelationGraph;
use crate::meta::{ColumnMeta, EntityClass, MetadataRegistry};
use crate::prelude::*;
use crate::query::{OperationKind, OperationQueue, plan_operations};
use crate::relations::Relations;
use crate::resolver::{ResolvedQueryRelation, resolve_query_relations};
use crate::sql::{SQL, Token};
use crate::store::{Row, Store};

/// A rendered read together with the join edges needed to rebuild its rows.
#[derive(Debug, Clone)]
pub struct ReadQuery<'r> {
    pub entity: EntityClass,
    pub sql: SQL<'r>,
    /// Resolved edges, deepest first.
    pub relations: Vec<ResolvedQueryRelation<'r>>,
    /// One select operation per node of the filter value.
    pub operations: OperationQueue<'r>,
    registry: &'r MetadataRegistry,
}

/// Builds the select for `entity` filtered by `filter` and joined along `relations`.
///
/// `filter` is either a scalar identifier or a partial entity; relations
/// populated in it are joined as well. Only primary and scope keys filter.
pub fn build_read<'r>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    filter: &Value,
    relations: &Relations,
) -> Result<ReadQuery<'r>> {
    crate::tessel_profile_scope!("read", "build");
    let identifier = registry.get_identifier_property(entity)?;
    let table = registry.table_name(entity)?;

    let filter = match filter {
        Value::Object(_) => filter.clone(),
        Value::Null => Value::Object(Map::new()),
        Value::Array(_) => {
            return Err(TesselError::DataShape(format!(
                "`{}` filter must be an identifier or an object, got {}",
                entity, filter
            )));
        }
        scalar => {
            let mut map = Map::new();
            map.insert(identifier.property_name.clone(), scalar.clone());
            Value::Object(map)
        }
    };

    let graph = EntityRelationGraph::build(registry, entity, &filter)?;
    let mut shape = relations.clone();
    shape.merge(graph.relations());
    let resolved = resolve_query_relations(registry, entity, &shape)?;
    check_tables(table, &resolved)?;

    let mut selection = Selection::default();
    for column in registry.get_properties_by_class(entity) {
        selection.push(selected(table, column));
    }
    for edge in resolved.iter().rev() {
        selection.push(
            SQL::column(edge.base.table, edge.base.column).alias(edge.base.alias.clone()),
        );
        selection.push(
            SQL::column(edge.related.table, edge.related.column)
                .alias(edge.related.alias.clone()),
        );
        for column in registry.get_properties_by_class(edge.related.entity) {
            selection.push(selected(edge.related.table, column));
        }
    }

    let mut sql = SQL::token(Token::SELECT)
        .append(SQL::join(selection.columns, Token::COMMA))
        .push(Token::FROM)
        .append(SQL::ident(table));

    for edge in resolved.iter().rev() {
        sql = sql
            .push(Token::LEFT)
            .push(Token::JOIN)
            .append(SQL::ident(edge.related.table))
            .push(Token::ON)
            .append(SQL::column(edge.base.table, edge.base.column))
            .push(Token::EQ)
            .append(SQL::column(edge.related.table, edge.related.column));
    }

    let conditions = where_conditions(&graph)?;
    if !conditions.is_empty() {
        sql = sql
            .push(Token::WHERE)
            .append(SQL::join(conditions, Token::AND));
    }

    let tiers = vec![0; graph.len()];
    let operations = plan_operations(&graph, OperationKind::Select, &tiers)?;

    Ok(ReadQuery {
        entity,
        sql,
        relations: resolved,
        operations,
        registry,
    })
}

impl<'r> ReadQuery<'r> {
    /// Runs the select and returns its raw rows.
    pub async fn fetch<S: Store>(&self, store: &S) -> Result<Vec<Row>> {
        let (text, params) = self.sql.build(S::DIALECT);
        crate::tessel_trace_query!(&text, params.len());
        store.execute_statement(&text, &params).await?.into_rows()
    }

    /// Runs the select and rebuilds one instance per matched root row.
    pub async fn execute<S: Store>(&self, store: &S) -> Result<Vec<Value>> {
        let rows = self.fetch(store).await?;
        EntityInstanceFactory::new(self.registry).from_rows(self.entity, &rows, &self.relations)
    }
}

/// Select list deduplicated by rendered column reference.
#[derive(Default)]
struct Selection<'r> {
    columns: Vec<SQL<'r>>,
    seen: HashSet<String>,
}

impl<'r> Selection<'r> {
    fn push(&mut self, column: SQL<'r>) {
        if self.seen.insert(column.sql()) {
            self.columns.push(column);
        }
    }
}

fn selected<'r>(table: &'r str, column: &'r ColumnMeta) -> SQL<'r> {
    SQL::column(table, column.column_name.as_str()).alias(column.alias.as_str())
}

/// Joined tables are not aliased, so each may appear once per read.
fn check_tables(root: &str, relations: &[ResolvedQueryRelation<'_>]) -> Result<()> {
    let mut tables: Vec<&str> = vec![root];
    for edge in relations.iter().rev() {
        if tables.contains(&edge.related.table) {
            return Err(TesselError::RelationConflict(format!(
                "table `{}` is joined more than once (through `{}`)",
                edge.related.table,
                edge.path.join(".")
            )));
        }
        tables.push(edge.related.table);
    }
    Ok(())
}

/// Equality or membership conditions from the key properties of every node.
fn where_conditions<'r>(graph: &EntityRelationGraph<'r, '_>) -> Result<Vec<SQL<'r>>> {
    let registry = graph.registry();
    let mut filters: Vec<(&'r str, &'r ColumnMeta, Vec<Value>)> = Vec::new();

    for (_, node) in graph.nodes() {
        let table = registry.table_name(node.entity)?;
        for column in node.columns.iter().filter(|c| c.is_filter_key()) {
            let Some(value) = node.column_value(column).or(column.scope.as_ref()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let encoded = match value {
                Value::Array(_) | Value::Object(_) => None,
                scalar => column.data_type.encode(scalar),
            }
            .ok_or_else(|| {
                TesselError::DataShape(format!(
                    "filter on `{}.{}` must be a scalar, got {}",
                    node.entity, column.property_name, value
                ))
            })?;

            match filters.iter_mut().find(|(_, meta, _)| {
                meta.entity == column.entity && meta.property_name == column.property_name
            }) {
                Some((_, _, values)) => {
                    if !values.contains(&encoded) {
                        values.push(encoded);
                    }
                }
                None => filters.push((table, column, vec![encoded])),
            }
        }
    }

    Ok(filters
        .into_iter()
        .map(|(table, column, values)| {
            let target = SQL::column(table, column.column_name.as_str());
            if values.len() == 1 {
                target.push(Token::EQ).append(SQL::param_list(values))
            } else {
                target
                    .push(Token::IN)
                    .append(SQL::param_list(values).parens())
            }
        })
        .collect())
}
