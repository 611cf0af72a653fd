use hashbrown::HashMap;

use crate::error::{Result, TesselError};
use crate::meta::{
    ClassMeta, ColumnMeta, EntityClass, PropertyMeta, RelationMeta, default_alias,
};
use crate::prelude::*;

/// Collection of all entity, column and relation metadata.
///
/// Populated during bootstrap, then shared by reference; every lookup takes `&self`.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: HashMap<EntityClass, ClassMeta>,
    columns: HashMap<EntityClass, Vec<ColumnMeta>>,
    relations: HashMap<EntityClass, Vec<RelationMeta>>,
    /// Registration order, so iteration over classes is deterministic.
    order: Vec<EntityClass>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `entity` to `table_name`. Registering the same class again replaces the
    /// table and re-derives the default aliases of its columns.
    pub fn register_class(&mut self, entity: EntityClass, table_name: impl Into<String>) {
        let table_name = table_name.into();

        match self.classes.get_mut(&entity) {
            Some(existing) => {
                if existing.table_name != table_name {
                    crate::tessel_warn!(
                        entity = %entity,
                        previous = %existing.table_name,
                        table = %table_name,
                        "entity re-registered with a different table"
                    );
                }
                existing.table_name = table_name.clone();
            }
            None => {
                self.order.push(entity);
                self.classes.insert(
                    entity,
                    ClassMeta {
                        entity,
                        table_name: table_name.clone(),
                    },
                );
            }
        }

        if let Some(columns) = self.columns.get_mut(&entity) {
            for column in columns.iter_mut().filter(|c| !c.declared_alias) {
                column.alias = default_alias(&table_name, &column.column_name);
            }
        }
    }

    /// Registers a scalar column property. The class must already be registered.
    pub fn register_property(&mut self, mut column: ColumnMeta) -> Result<()> {
        let table = &self.get_class_meta(column.entity)?.table_name;
        if !column.declared_alias {
            column.alias = default_alias(table, &column.column_name);
        }

        let columns = self.columns.entry(column.entity).or_default();
        match columns
            .iter_mut()
            .find(|c| c.property_name == column.property_name)
        {
            Some(existing) => {
                crate::tessel_warn!(
                    entity = %column.entity,
                    property = %column.property_name,
                    "column property registered twice, keeping the latest declaration"
                );
                *existing = column;
            }
            None => columns.push(column),
        }
        Ok(())
    }

    /// Registers a navigation property.
    ///
    /// Re-registering a relation with the same kind and target is a no-op;
    /// anything else conflicts.
    pub fn register_relation(&mut self, relation: RelationMeta) -> Result<()> {
        let relations = self.relations.entry(relation.entity).or_default();
        let Some(existing) = relations
            .iter_mut()
            .find(|r| r.property_name == relation.property_name)
        else {
            relations.push(relation);
            return Ok(());
        };

        if existing.kind != relation.kind {
            return Err(TesselError::ConflictingMetadata {
                entity: relation.entity,
                property: relation.property_name,
                reason: format!("declared as {} and {}", existing.kind, relation.kind),
            });
        }

        let (previous, next) = (existing.related_entity(), relation.related_entity());
        if previous != next {
            return Err(TesselError::ConflictingMetadata {
                entity: relation.entity,
                property: relation.property_name,
                reason: format!("related to both {} and {}", previous, next),
            });
        }

        *existing = relation;
        Ok(())
    }

    pub fn get_class_meta(&self, entity: EntityClass) -> Result<&ClassMeta> {
        self.classes
            .get(&entity)
            .ok_or(TesselError::UnknownEntity(entity))
    }

    pub fn table_name(&self, entity: EntityClass) -> Result<&str> {
        Ok(&self.get_class_meta(entity)?.table_name)
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMeta> {
        self.order.iter().filter_map(|entity| self.classes.get(entity))
    }

    /// The primary key column of `entity`. When several columns are flagged,
    /// the first one registered is the identifier.
    pub fn get_identifier_property(&self, entity: EntityClass) -> Result<&ColumnMeta> {
        self.get_class_meta(entity)?;
        self.get_properties_by_class(entity)
            .iter()
            .find(|c| c.primary_key)
            .ok_or(TesselError::NoPrimaryKey(entity))
    }

    /// Column properties of `entity` in registration order.
    pub fn get_properties_by_class(&self, entity: EntityClass) -> &[ColumnMeta] {
        self.columns.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relation properties of `entity` in registration order.
    pub fn get_relations_by_class(&self, entity: EntityClass) -> &[RelationMeta] {
        self.relations.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_relations_for_property(
        &self,
        entity: EntityClass,
        property: &str,
    ) -> Option<&RelationMeta> {
        self.get_relations_by_class(entity)
            .iter()
            .find(|r| r.property_name == property)
    }

    pub fn get_column(&self, entity: EntityClass, property: &str) -> Option<&ColumnMeta> {
        self.get_properties_by_class(entity)
            .iter()
            .find(|c| c.property_name == property)
    }

    /// Column property stored in `column_name`, if one is declared.
    pub fn get_column_by_name(&self, entity: EntityClass, column_name: &str) -> Option<&ColumnMeta> {
        self.get_properties_by_class(entity)
            .iter()
            .find(|c| c.column_name == column_name)
    }

    /// Every metadata entry declared under `property`.
    pub fn get_property_metas(&self, entity: EntityClass, property: &str) -> Vec<PropertyMeta<'_>> {
        let mut metas = Vec::with_capacity(2);
        if let Some(column) = self.get_column(entity, property) {
            metas.push(PropertyMeta::Column(column));
        }
        if let Some(relation) = self.get_relations_for_property(entity, property) {
            metas.push(PropertyMeta::Relation(relation));
        }
        metas
    }

    /// Resolves the related class of `relation`, which must be registered by now.
    pub fn resolve_related_entity_of(&self, relation: &RelationMeta) -> Result<EntityClass> {
        let related = relation.related_entity();
        if self.classes.contains_key(&related) {
            Ok(related)
        } else {
            Err(TesselError::MetadataResolution {
                entity: relation.entity,
                property: relation.property_name.clone(),
                reason: format!("related entity `{}` is not registered", related),
            })
        }
    }

    /// The relation on the related class that points back along `relation`.
    ///
    /// Uses the declared inverse side when present, otherwise the first relation
    /// on the related class that targets this class with the mirrored kind.
    pub fn get_inverse_relation(&self, relation: &RelationMeta) -> Result<Option<&RelationMeta>> {
        let related = self.resolve_related_entity_of(relation)?;

        if let Some(inverse) = &relation.inverse_side {
            return self
                .get_relations_for_property(related, inverse)
                .map(Some)
                .ok_or_else(|| TesselError::MetadataResolution {
                    entity: relation.entity,
                    property: relation.property_name.clone(),
                    reason: format!("inverse side `{}.{}` is not declared", related, inverse),
                });
        }

        Ok(self.get_relations_by_class(related).iter().find(|candidate| {
            candidate.kind == relation.kind.mirrored()
                && candidate.related_entity() == relation.entity
        }))
    }
}
