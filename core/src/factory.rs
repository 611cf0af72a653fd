//! Building entity instances from value trees and result rows.

use hashbrown::HashMap;
use serde_json::{Map, Value};

use crate::error::{Result, TesselError};
use crate::meta::{ColumnMeta, EntityClass, MetadataRegistry, RelationMeta};
use crate::prelude::*;
use crate::resolver::ResolvedQueryRelation;
use crate::store::Row;

/// Turns partial value trees and flat result rows into entity instances.
#[derive(Debug, Clone, Copy)]
pub struct EntityInstanceFactory<'r> {
    registry: &'r MetadataRegistry,
}

impl<'r> EntityInstanceFactory<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self { registry }
    }

    /// Normalizes a value tree for insertion.
    ///
    /// Unknown properties are dropped, `null` relations count as absent and absent
    /// columns receive their declared default.
    pub fn normalize(&self, entity: EntityClass, value: &Value) -> Result<Value> {
        crate::tessel_profile_scope!("factory", "normalize");
        self.normalize_value(entity, value, true)
    }

    /// Like [`normalize`](Self::normalize) without applying defaults, so absent
    /// columns stay untouched by updates.
    pub fn normalize_partial(&self, entity: EntityClass, value: &Value) -> Result<Value> {
        self.normalize_value(entity, value, false)
    }

    fn normalize_value(
        &self,
        entity: EntityClass,
        value: &Value,
        apply_defaults: bool,
    ) -> Result<Value> {
        let Value::Object(map) = value else {
            return Err(TesselError::DataShape(format!(
                "`{}` value must be an object, got {}",
                entity, value
            )));
        };

        let mut instance = Map::new();
        for (property, property_value) in map {
            let column = self.registry.get_column(entity, property);
            let relation = self.registry.get_relations_for_property(entity, property);

            match (column, relation, property_value) {
                (_, Some(relation), Value::Array(_) | Value::Object(_)) => {
                    let related = self.normalize_relation(relation, property_value, apply_defaults)?;
                    instance.insert(property.clone(), related);
                }
                (Some(_), _, _) => {
                    instance.insert(property.clone(), property_value.clone());
                }
                (None, Some(_), Value::Null) => {}
                (None, Some(relation), other) => {
                    return Err(TesselError::DataShape(format!(
                        "relation `{}.{}` must hold an object or an array, got {}",
                        entity, relation.property_name, other
                    )));
                }
                (None, None, _) => {
                    crate::tessel_warn!(
                        entity = %entity,
                        property = %property,
                        "dropping property without metadata"
                    );
                }
            }
        }

        if apply_defaults {
            for column in self.registry.get_properties_by_class(entity) {
                if let Some(default) = &column.default
                    && !instance.contains_key(&column.property_name)
                {
                    instance.insert(column.property_name.clone(), default.clone());
                }
            }
        }

        Ok(Value::Object(instance))
    }

    fn normalize_relation(
        &self,
        relation: &RelationMeta,
        value: &Value,
        apply_defaults: bool,
    ) -> Result<Value> {
        let related = self.registry.resolve_related_entity_of(relation)?;
        match (relation.kind.is_collection(), value) {
            (true, Value::Array(items)) => items
                .iter()
                .map(|item| self.normalize_value(related, item, apply_defaults))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            (false, Value::Object(_)) => self.normalize_value(related, value, apply_defaults),
            (true, _) => Err(TesselError::DataShape(format!(
                "{} relation `{}.{}` must hold an array",
                relation.kind, relation.entity, relation.property_name
            ))),
            (false, _) => Err(TesselError::DataShape(format!(
                "{} relation `{}.{}` must hold an object",
                relation.kind, relation.entity, relation.property_name
            ))),
        }
    }

    /// Rebuilds one instance per distinct root row, in first-seen order.
    ///
    /// Rows repeating the same root merge into it; one-to-many members are
    /// deduplicated by primary key and nulls never overwrite collected values.
    pub fn from_rows(
        &self,
        entity: EntityClass,
        rows: &[Row],
        relations: &[ResolvedQueryRelation<'r>],
    ) -> Result<Vec<Value>> {
        crate::tessel_profile_scope!("factory", "from_rows");
        let identifier = self.registry.get_identifier_property(entity)?;
        let columns = self.registry.get_properties_by_class(entity);

        let mut instances: Vec<Map<String, Value>> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let key = row.get_or_null(&identifier.alias);
            if key.is_null() {
                continue;
            }

            let slot = *by_key.entry(key.to_string()).or_insert_with(|| {
                instances.push(Map::new());
                instances.len() - 1
            });
            let instance = &mut instances[slot];
            merge_columns(instance, columns, row);
            self.merge_relations(instance, row, relations, &[])?;
        }

        Ok(instances.into_iter().map(Value::Object).collect())
    }

    /// First instance rebuilt from `rows`.
    pub fn retrieve(
        &self,
        entity: EntityClass,
        rows: &[Row],
        relations: &[ResolvedQueryRelation<'r>],
    ) -> Result<Value> {
        self.from_rows(entity, rows, relations)?
            .into_iter()
            .next()
            .ok_or(TesselError::NotFound)
    }

    fn merge_relations(
        &self,
        instance: &mut Map<String, Value>,
        row: &Row,
        relations: &[ResolvedQueryRelation<'r>],
        prefix: &[&'r str],
    ) -> Result<()> {
        let direct = relations.iter().filter(|edge| {
            edge.path.len() == prefix.len() + 1 && edge.path.starts_with(prefix)
        });

        for edge in direct {
            let related = edge.related.entity;
            let identifier = self.registry.get_identifier_property(related)?;
            let columns = self.registry.get_properties_by_class(related);
            let key = row.get_or_null(&identifier.alias);

            if edge.kind.is_collection() {
                let slot = instance
                    .entry(edge.property())
                    .or_insert_with(|| Value::Array(Vec::new()));
                let Value::Array(members) = slot else {
                    return Err(TesselError::Mapping(format!(
                        "`{}.{}` already holds a non-collection value",
                        edge.base.entity,
                        edge.property()
                    )));
                };
                if key.is_null() {
                    continue;
                }

                let key = identifier.data_type.decode(key.clone());
                let position = members
                    .iter()
                    .position(|member| member.get(&identifier.property_name) == Some(&key));
                let member = match position {
                    Some(index) => &mut members[index],
                    None => {
                        members.push(Value::Object(Map::new()));
                        let last = members.len() - 1;
                        &mut members[last]
                    }
                };
                if let Value::Object(member) = member {
                    merge_columns(member, columns, row);
                    self.merge_relations(member, row, relations, &edge.path)?;
                }
            } else {
                if key.is_null() {
                    continue;
                }
                let slot = instance
                    .entry(edge.property())
                    .or_insert_with(|| Value::Object(Map::new()));
                // The joined instance replaces a foreign key sharing its property.
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(related) = slot {
                    merge_columns(related, columns, row);
                    self.merge_relations(related, row, relations, &edge.path)?;
                }
            }
        }
        Ok(())
    }
}

/// Copies every column of `row` into `instance` without replacing values with null.
fn merge_columns(instance: &mut Map<String, Value>, columns: &[ColumnMeta], row: &Row) {
    for column in columns {
        let value = row.get_or_null(&column.alias);
        match instance.get(&column.property_name) {
            Some(existing) if !existing.is_null() => {}
            Some(_) if value.is_null() => {}
            _ => {
                instance.insert(
                    column.property_name.clone(),
                    column.data_type.decode(value.clone()),
                );
            }
        }
    }
}
