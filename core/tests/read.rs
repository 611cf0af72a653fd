mod common;

use common::*;
use serde_json::json;
use tessel_core::query::build_read;
use tessel_core::{Relations, TesselError};

#[test]
fn many_to_one_read_joins_the_parent() {
    let registry = registry();
    let query = build_read(&registry, CHILD, &json!(5), &Relations::new().with("parent")).unwrap();

    assert_eq!(
        query.sql.sql(),
        concat!(
            r#"SELECT "child"."id" AS "child.id", "child"."name" AS "child.name", "#,
            r#""child"."parent_id" AS "child.parent_id", "parent"."id" AS "parent.id", "#,
            r#""parent"."name" AS "parent.name" FROM "child" "#,
            r#"LEFT JOIN "parent" ON "child"."parent_id" = "parent"."id" "#,
            r#"WHERE "child"."id" = ?"#
        )
    );
    assert_eq!(query.sql.params().cloned().collect::<Vec<_>>(), vec![json!(5)]);
}

#[test]
fn nested_joins_introduce_tables_before_referencing_them() {
    let registry = registry();
    let relations = Relations::new().nest("children", Relations::new().with("toys"));
    let sql = build_read(&registry, PARENT, &json!(1), &relations)
        .unwrap()
        .sql
        .sql();

    let child_join = sql
        .find(r#"LEFT JOIN "child" ON "parent"."id" = "child"."parent_id""#)
        .unwrap();
    let toy_join = sql
        .find(r#"LEFT JOIN "toy" ON "child"."id" = "toy"."child_id""#)
        .unwrap();
    assert!(child_join < toy_join);
    assert_eq!(sql.matches(r#""child"."id" AS"#).count(), 1);
}

#[test]
fn relations_in_the_filter_are_joined_and_filtered() {
    let registry = registry();
    let filter = json!({"id": 1, "name": "ignored", "children": [{"id": 4}, {"id": 5}]});
    let query = build_read(&registry, PARENT, &filter, &Relations::new()).unwrap();
    let sql = query.sql.sql();

    assert!(sql.contains(r#"LEFT JOIN "child""#));
    assert!(sql.ends_with(r#"WHERE "parent"."id" = ? AND "child"."id" IN (?, ?)"#));
    assert_eq!(
        query.sql.params().cloned().collect::<Vec<_>>(),
        vec![json!(1), json!(4), json!(5)]
    );
    assert_eq!(query.relations.len(), 1);
}

#[test]
fn repeated_filter_values_collapse() {
    let registry = registry();
    let filter = json!({"children": [{"id": 4}, {"id": 4}]});
    let sql = build_read(&registry, PARENT, &filter, &Relations::new())
        .unwrap()
        .sql
        .sql();
    assert!(sql.ends_with(r#"WHERE "child"."id" = ?"#));
}

#[test]
fn scope_keys_filter_with_their_default() {
    let registry = registry();
    let query = build_read(&registry, DOCUMENT, &json!(1), &Relations::new()).unwrap();
    assert!(
        query
            .sql
            .sql()
            .ends_with(r#"WHERE "document"."id" = ? AND "document"."tenant" = ?"#)
    );
    assert_eq!(
        query.sql.params().cloned().collect::<Vec<_>>(),
        vec![json!(1), json!("acme")]
    );

    let query = build_read(
        &registry,
        DOCUMENT,
        &json!({"tenant": "globex"}),
        &Relations::new(),
    )
    .unwrap();
    assert_eq!(
        query.sql.params().cloned().collect::<Vec<_>>(),
        vec![json!("globex")]
    );
}

#[test]
fn null_filter_reads_everything() {
    let registry = registry();
    let sql = build_read(&registry, PARENT, &json!(null), &Relations::new())
        .unwrap()
        .sql
        .sql();
    assert_eq!(
        sql,
        r#"SELECT "parent"."id" AS "parent.id", "parent"."name" AS "parent.name" FROM "parent""#
    );
}

#[test]
fn joining_a_table_twice_conflicts() {
    let registry = registry();
    let relations = Relations::new().nest("parent", Relations::new().with("children"));
    let error = build_read(&registry, CHILD, &json!(1), &relations).unwrap_err();
    assert!(matches!(error, TesselError::RelationConflict(_)));
}

#[test]
fn unsupported_relations_fail_before_sql_is_built() {
    let registry = registry();
    let error = build_read(&registry, PARENT, &json!(1), &Relations::new().with("tags"))
        .unwrap_err();
    assert!(matches!(error, TesselError::UnsupportedRelation { .. }));
}

#[test]
fn list_filters_are_rejected() {
    let registry = registry();
    let error = build_read(&registry, PARENT, &json!([1, 2]), &Relations::new()).unwrap_err();
    assert!(matches!(error, TesselError::DataShape(_)));

    let error =
        build_read(&registry, PARENT, &json!({"id": [1, 2]}), &Relations::new()).unwrap_err();
    assert!(matches!(error, TesselError::MetadataResolution { .. }));
}
