use serde_json::Value;

use crate::error::Result;
use crate::meta::{
    ColumnMeta, DataType, EntityClass, EntityFactory, MetadataRegistry, RelationKind, RelationMeta,
};
use crate::prelude::*;

/// Column declaration.
///
/// ```
/// use tessel_core::{Column, DataType};
///
/// let id = Column::new("id", DataType::Integer).primary_key();
/// let tenant = Column::new("tenant", DataType::Text).scope("acme").not_null();
/// # let _ = (id, tenant);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    alias: Option<String>,
    primary_key: bool,
    unique: bool,
    not_null: bool,
    default: Option<Value>,
    scope: Option<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            alias: None,
            primary_key: false,
            unique: false,
            not_null: false,
            default: None,
            scope: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Overrides the `"{table}.{column}"` name the column is selected as.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column as a scope key filtering every read, with `value` applied
    /// when a read does not mention the property.
    pub fn scope(mut self, value: impl Into<Value>) -> Self {
        self.scope = Some(value.into());
        self
    }

    pub(crate) fn into_meta(self, entity: EntityClass, property_name: String) -> ColumnMeta {
        ColumnMeta {
            entity,
            property_name,
            column_name: self.name,
            declared_alias: self.alias.is_some(),
            alias: self.alias.unwrap_or_default(),
            data_type: self.data_type,
            primary_key: self.primary_key,
            unique: self.unique,
            not_null: self.not_null,
            default: self.default,
            scope: self.scope,
        }
    }
}

/// Declares one entity class, its columns and its relations.
///
/// Nothing reaches the registry until [`finish`](EntityBuilder::finish).
#[must_use = "declarations are only registered by `finish`"]
pub struct EntityBuilder<'r> {
    registry: &'r mut MetadataRegistry,
    entity: EntityClass,
    table: String,
    columns: Vec<ColumnMeta>,
    relations: Vec<RelationMeta>,
}

impl MetadataRegistry {
    /// Starts declaring `entity`, stored in `table`.
    pub fn entity(&mut self, entity: EntityClass, table: impl Into<String>) -> EntityBuilder<'_> {
        EntityBuilder {
            registry: self,
            entity,
            table: table.into(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }
}

impl<'r> EntityBuilder<'r> {
    pub fn column(mut self, property: impl Into<String>, column: Column) -> Self {
        self.columns.push(column.into_meta(self.entity, property.into()));
        self
    }

    /// Collection of `related` rows whose `inverse` relation points back here.
    pub fn one_to_many(
        self,
        property: impl Into<String>,
        related: EntityFactory,
        inverse: impl Into<String>,
    ) -> Self {
        self.relation(
            property,
            RelationKind::OneToMany,
            related,
            Some(inverse.into()),
            None,
        )
    }

    /// Reference to one `related` row through `join_column` on this table.
    pub fn many_to_one(
        self,
        property: impl Into<String>,
        related: EntityFactory,
        inverse: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        self.relation(
            property,
            RelationKind::ManyToOne,
            related,
            Some(inverse.into()),
            Some(join_column.into()),
        )
    }

    /// One-to-one relation; the side declaring `join_column` holds the foreign key.
    pub fn one_to_one(
        self,
        property: impl Into<String>,
        related: EntityFactory,
        inverse: Option<&str>,
        join_column: Option<&str>,
    ) -> Self {
        self.relation(
            property,
            RelationKind::OneToOne,
            related,
            inverse.map(str::to_string),
            join_column.map(str::to_string),
        )
    }

    pub fn many_to_many(
        self,
        property: impl Into<String>,
        related: EntityFactory,
        inverse: Option<&str>,
    ) -> Self {
        self.relation(
            property,
            RelationKind::ManyToMany,
            related,
            inverse.map(str::to_string),
            None,
        )
    }

    fn relation(
        mut self,
        property: impl Into<String>,
        kind: RelationKind,
        related: EntityFactory,
        inverse_side: Option<String>,
        join_column: Option<String>,
    ) -> Self {
        self.relations.push(RelationMeta {
            entity: self.entity,
            property_name: property.into(),
            kind,
            related,
            inverse_side,
            join_column,
        });
        self
    }

    /// Registers the class, then its columns and relations in declaration order.
    pub fn finish(self) -> Result<()> {
        let EntityBuilder {
            registry,
            entity,
            table,
            columns,
            relations,
        } = self;

        registry.register_class(entity, table);
        for column in columns {
            registry.register_property(column)?;
        }
        for relation in relations {
            registry.register_relation(relation)?;
        }
        Ok(())
    }
}
