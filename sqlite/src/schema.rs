//! `CREATE TABLE` statements derived from registered metadata.

use serde_json::Value;
use tessel_core::{
    DataType, EntityClass, MetadataRegistry, RelationKind, Result, SQL, TesselError, Token,
};

/// Renders `CREATE TABLE IF NOT EXISTS` for `entity`.
///
/// Join columns of many-to-one and owning one-to-one relations reference the
/// related table's primary key; join columns without a column property are added
/// with the related key's type.
pub fn create_table_sql(registry: &MetadataRegistry, entity: EntityClass) -> Result<String> {
    let table = registry.table_name(entity)?;
    let columns = registry.get_properties_by_class(entity);
    let mut definitions: Vec<SQL<'_>> = Vec::with_capacity(columns.len());

    for column in columns {
        let mut definition = SQL::ident(column.column_name.as_str())
            .append(SQL::raw(column.data_type.sql_type()));
        if column.primary_key {
            definition = definition.append(SQL::raw("PRIMARY KEY"));
        }
        if column.unique {
            definition = definition.append(SQL::raw("UNIQUE"));
        }
        if column.not_null {
            definition = definition.append(SQL::raw("NOT NULL"));
        }
        if let Some(default) = &column.default {
            definition = definition
                .push(Token::DEFAULT)
                .append(SQL::raw(literal(column.data_type, default)?));
        }
        if let Some(reference) = references(registry, entity, &column.column_name)? {
            definition = definition.append(reference);
        }
        definitions.push(definition);
    }

    for relation in registry.get_relations_by_class(entity) {
        let Some(join_column) = relation.join_column.as_deref() else {
            continue;
        };
        if registry.get_column_by_name(entity, join_column).is_some() {
            continue;
        }
        let related = registry.resolve_related_entity_of(relation)?;
        let identifier = registry.get_identifier_property(related)?;
        let mut definition =
            SQL::ident(join_column).append(SQL::raw(identifier.data_type.sql_type()));
        if let Some(reference) = references(registry, entity, join_column)? {
            definition = definition.append(reference);
        }
        definitions.push(definition);
    }

    if definitions.is_empty() {
        return Err(TesselError::Statement(format!(
            "entity `{}` declares no columns",
            entity
        )));
    }

    Ok(SQL::raw("CREATE TABLE IF NOT EXISTS")
        .append(SQL::ident(table))
        .append(SQL::join(definitions, Token::COMMA).parens())
        .sql())
}

/// `REFERENCES "table" ("id")` when `column` is the join column of a to-one relation.
fn references<'r>(
    registry: &'r MetadataRegistry,
    entity: EntityClass,
    column: &str,
) -> Result<Option<SQL<'r>>> {
    let relation = registry.get_relations_by_class(entity).iter().find(|r| {
        matches!(r.kind, RelationKind::ManyToOne | RelationKind::OneToOne)
            && r.join_column.as_deref() == Some(column)
    });
    let Some(relation) = relation else {
        return Ok(None);
    };

    let related = registry.resolve_related_entity_of(relation)?;
    let identifier = registry.get_identifier_property(related)?;
    Ok(Some(
        SQL::raw("REFERENCES")
            .append(SQL::ident(registry.table_name(related)?))
            .append(SQL::ident(identifier.column_name.as_str()).parens()),
    ))
}

fn literal(data_type: DataType, value: &Value) -> Result<String> {
    let stored = data_type.encode(value).ok_or_else(|| {
        TesselError::Statement(format!("{} is not a {:?} default", value, data_type))
    })?;
    Ok(match stored {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => i64::from(b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Array(bytes) => {
            let hex: String = bytes
                .iter()
                .filter_map(Value::as_u64)
                .map(|b| format!("{:02X}", b))
                .collect();
            format!("X'{}'", hex)
        }
        Value::Object(_) => {
            return Err(TesselError::Statement(format!(
                "{} is not a literal",
                value
            )));
        }
    })
}

/// Creates the table of every registered entity, in registration order.
#[cfg(feature = "rusqlite")]
pub fn create_tables(conn: &rusqlite::Connection, registry: &MetadataRegistry) -> Result<()> {
    for class in registry.classes() {
        let sql = create_table_sql(registry, class.entity)?;
        tessel_core::tessel_trace_query!(&sql, 0);
        conn.execute(&sql, [])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Column;

    const AUTHOR: EntityClass = EntityClass::new("Author");
    const BOOK: EntityClass = EntityClass::new("Book");

    fn author() -> EntityClass {
        AUTHOR
    }

    fn book() -> EntityClass {
        BOOK
    }

    fn registry() -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        registry
            .entity(AUTHOR, "author")
            .column("id", Column::new("id", DataType::Integer).primary_key())
            .column(
                "name",
                Column::new("name", DataType::Text).not_null().unique(),
            )
            .column(
                "nick",
                Column::new("nick", DataType::Text).default_value("o'neil"),
            )
            .one_to_many("books", book, "author")
            .finish()
            .unwrap();
        registry
            .entity(BOOK, "book")
            .column("id", Column::new("id", DataType::Integer).primary_key())
            .column(
                "draft",
                Column::new("draft", DataType::Boolean).default_value(true),
            )
            .many_to_one("author", author, "books", "author_id")
            .finish()
            .unwrap();
        registry
    }

    #[test]
    fn renders_constraints_and_defaults() {
        let registry = registry();
        assert_eq!(
            create_table_sql(&registry, AUTHOR).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "author" ("id" INTEGER PRIMARY KEY, "name" TEXT UNIQUE NOT NULL, "nick" TEXT DEFAULT 'o''neil')"#
        );
    }

    #[test]
    fn undeclared_join_columns_reference_their_target() {
        let registry = registry();
        assert_eq!(
            create_table_sql(&registry, BOOK).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "book" ("id" INTEGER PRIMARY KEY, "draft" INTEGER DEFAULT 1, "author_id" INTEGER REFERENCES "author" ("id"))"#
        );
    }
}
