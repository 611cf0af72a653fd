//! Expansion of relation inclusion shapes into join edges.

use crate::error::{Result, TesselError};
use crate::meta::{ColumnMeta, EntityClass, MetadataRegistry, RelationKind, RelationMeta, default_alias};
use crate::prelude::*;
use crate::relations::Relations;

/// One side of a join edge.
#[derive(Debug, Clone)]
pub struct JoinSide<'r> {
    pub entity: EntityClass,
    pub table: &'r str,
    /// Relation declared on this side, if any.
    pub relation: Option<&'r RelationMeta>,
    /// Joined column of this side's table.
    pub column: &'r str,
    /// Column metadata of `column` when it is a declared property.
    pub column_meta: Option<&'r ColumnMeta>,
    /// Name the joined column is selected as.
    pub alias: Cow<'r, str>,
}

/// A fully resolved join edge.
#[derive(Debug, Clone)]
pub struct ResolvedQueryRelation<'r> {
    pub kind: RelationKind,
    /// Relation properties leading from the root entity to the related side.
    pub path: Vec<&'r str>,
    pub base: JoinSide<'r>,
    pub related: JoinSide<'r>,
}

impl<'r> ResolvedQueryRelation<'r> {
    /// The relation property on the base entity.
    pub fn property(&self) -> &'r str {
        self.path.last().copied().unwrap_or_default()
    }
}

/// Resolves every edge requested by `relations`, starting at `entity`.
///
/// Edges nested below a relation are accumulated before the relation's own edge,
/// so the list runs deepest-first; reverse it before emitting joins.
pub fn resolve_query_relations<'r>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    relations: &Relations,
) -> Result<Vec<ResolvedQueryRelation<'r>>> {
    crate::tessel_profile_scope!("resolver", "resolve_query_relations");
    let mut accumulator = Vec::new();
    resolve_into(registry, entity, relations, &[], &mut accumulator)?;
    Ok(accumulator)
}

fn resolve_into<'r>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    relations: &Relations,
    prefix: &[&'r str],
    accumulator: &mut Vec<ResolvedQueryRelation<'r>>,
) -> Result<()> {
    for (property, include) in relations.iter() {
        let relation = registry
            .get_relations_for_property(entity, property)
            .ok_or_else(|| TesselError::UnknownRelation {
                entity,
                property: property.to_string(),
            })?;

        if matches!(relation.kind, RelationKind::OneToOne | RelationKind::ManyToMany) {
            return Err(TesselError::UnsupportedRelation {
                entity,
                property: relation.property_name.clone(),
                kind: relation.kind,
                operation: "query relations",
            });
        }

        let edge = resolve_edge(registry, relation, prefix)?;
        if let Some(nested) = include.nested() {
            resolve_into(registry, edge.related.entity, nested, &edge.path, accumulator)?;
        }
        accumulator.push(edge);
    }
    Ok(())
}

/// Resolves a single one-to-many or many-to-one relation.
///
/// Each side joins on its own foreign key column when it declares one, and on
/// its primary key otherwise.
fn resolve_edge<'r>(
    registry: &'r MetadataRegistry,
    relation: &'r RelationMeta,
    prefix: &[&'r str],
) -> Result<ResolvedQueryRelation<'r>> {
    let related_entity = registry.resolve_related_entity_of(relation)?;
    let inverse = registry.get_inverse_relation(relation)?;

    let base = join_side(registry, relation.entity, Some(relation))?;
    let related = join_side(registry, related_entity, inverse)?;

    let mut path = prefix.to_vec();
    path.push(relation.property_name.as_str());

    Ok(ResolvedQueryRelation {
        kind: relation.kind,
        path,
        base,
        related,
    })
}

fn join_side<'r>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    relation: Option<&'r RelationMeta>,
) -> Result<JoinSide<'r>> {
    let table = registry.table_name(entity)?;

    let (column, column_meta) = match relation.and_then(|r| r.join_column.as_deref()) {
        Some(join_column) => (join_column, registry.get_column_by_name(entity, join_column)),
        None => {
            let identifier = registry.get_identifier_property(entity)?;
            (identifier.column_name.as_str(), Some(identifier))
        }
    };

    let alias = match column_meta {
        Some(meta) => Cow::Borrowed(meta.alias.as_str()),
        None => Cow::Owned(default_alias(table, column)),
    };

    Ok(JoinSide {
        entity,
        table,
        relation,
        column,
        column_meta,
        alias,
    })
}
