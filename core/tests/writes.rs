mod common;

use common::*;
use serde_json::json;
use tessel_core::query::{plan_insert, plan_remove, plan_update};
use tessel_core::{Column, DataType, EntityClass, Orm, OrmOptions, RelationKind, TesselError};

#[tokio::test]
async fn parent_is_inserted_before_its_children() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let inserted = orm
        .insert(PARENT, &json!({"children": [{"name": "a"}, {"name": "b"}]}))
        .await
        .unwrap();

    assert_eq!(
        inserted,
        json!({
            "id": 1,
            "children": [
                {"id": 2, "name": "a", "parentId": 1},
                {"id": 3, "name": "b", "parentId": 1}
            ]
        })
    );
    assert_eq!(
        orm.store().sql(),
        vec![
            "BEGIN",
            r#"INSERT INTO "parent" DEFAULT VALUES"#,
            r#"INSERT INTO "child" ("name", "parent_id") VALUES (?, ?)"#,
            r#"INSERT INTO "child" ("name", "parent_id") VALUES (?, ?)"#,
            "COMMIT",
        ]
    );
    assert_eq!(orm.store().params(3), vec![json!("b"), json!(1)]);
}

#[tokio::test]
async fn nested_instance_under_a_foreign_key_property_gets_its_key() {
    let registry = shared_key_registry();
    let orm = Orm::new(&registry, MockStore::new());

    let car = orm
        .insert(CAR, &json!({"owner": {"name": "o"}}))
        .await
        .unwrap();

    assert_eq!(car, json!({"id": 2, "owner": {"id": 1, "name": "o"}}));
    assert_eq!(
        orm.store().sql(),
        vec![
            "BEGIN",
            r#"INSERT INTO "owner" ("name") VALUES (?)"#,
            r#"INSERT INTO "car" ("owner_id") VALUES (?)"#,
            "COMMIT",
        ]
    );
    assert_eq!(orm.store().params(2), vec![json!(1)]);
}

#[tokio::test]
async fn foreign_key_property_accepts_a_plain_key() {
    let registry = shared_key_registry();
    let orm = Orm::new(&registry, MockStore::new());

    let car = orm.insert(CAR, &json!({"owner": 7})).await.unwrap();

    assert_eq!(car, json!({"id": 1, "owner": 7}));
    assert_eq!(orm.store().params(1), vec![json!(7)]);
}

#[tokio::test]
async fn inserting_without_a_primary_key_fails() {
    const NOTE: EntityClass = EntityClass::new("Note");
    let mut registry = registry();
    registry
        .entity(NOTE, "note")
        .column("body", Column::new("body", DataType::Text))
        .finish()
        .unwrap();
    let orm = Orm::new(&registry, MockStore::new());

    let error = orm.insert(NOTE, &json!({"body": "x"})).await.unwrap_err();

    assert!(matches!(error, TesselError::NoPrimaryKey(entity) if entity == NOTE));
    assert_eq!(orm.store().sql().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn contiguous_stores_receive_multi_row_inserts() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::contiguous());

    let inserted = orm
        .insert(
            PARENT,
            &json!({"name": "p", "children": [{"name": "a"}, {"name": "b"}]}),
        )
        .await
        .unwrap();

    assert_eq!(inserted["children"][0]["id"], json!(2));
    assert_eq!(inserted["children"][1]["id"], json!(3));
    assert_eq!(
        orm.store().sql()[2],
        r#"INSERT INTO "child" ("name", "parent_id") VALUES (?, ?), (?, ?)"#
    );
}

#[tokio::test]
async fn batching_can_be_disabled() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::contiguous())
        .with_options(OrmOptions::default().batch_inserts(false));

    orm.insert(PARENT, &json!({"children": [{"name": "a"}, {"name": "b"}]}))
        .await
        .unwrap();
    assert_eq!(orm.store().sql().len(), 5);
}

#[tokio::test]
async fn referenced_rows_are_inserted_first() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new())
        .with_options(OrmOptions::default().transactional_writes(false));

    let inserted = orm
        .insert(CHILD, &json!({"name": "c", "parent": {"name": "p"}}))
        .await
        .unwrap();

    assert_eq!(
        orm.store().sql(),
        vec![
            r#"INSERT INTO "parent" ("name") VALUES (?)"#,
            r#"INSERT INTO "child" ("name", "parent_id") VALUES (?, ?)"#,
        ]
    );
    assert_eq!(
        inserted,
        json!({"id": 2, "name": "c", "parentId": 1, "parent": {"id": 1, "name": "p"}})
    );
}

#[tokio::test]
async fn one_to_one_waits_for_the_side_without_the_join_column() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let inserted = orm
        .insert(PARENT, &json!({"name": "p", "profile": {"bio": "hi"}}))
        .await
        .unwrap();

    assert_eq!(inserted["profile"]["parentId"], inserted["id"]);
    assert_eq!(
        orm.store().sql()[2],
        r#"INSERT INTO "profile" ("bio", "parent_id") VALUES (?, ?)"#
    );
}

#[tokio::test]
async fn explicit_identifiers_are_kept() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let inserted = orm
        .insert(PARENT, &json!({"id": 40, "children": [{"name": "a"}]}))
        .await
        .unwrap();

    assert_eq!(inserted["id"], json!(40));
    assert_eq!(inserted["children"][0]["parentId"], json!(40));
}

#[tokio::test]
async fn three_levels_follow_their_tiers() {
    let registry = registry();
    let value = json!({"children": [{"name": "a", "toys": [{"label": "x"}]}]});
    let plan = plan_insert(&registry, PARENT, &value).unwrap();

    assert_eq!(plan.tiers(), vec![vec!["parent"], vec!["child"], vec!["toy"]]);

    let store = MockStore::new();
    let inserted = plan.execute(&store, true).await.unwrap();
    assert_eq!(inserted["children"][0]["toys"][0]["childId"], json!(2));
}

#[tokio::test]
async fn many_to_many_writes_are_unsupported() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let error = orm
        .insert(PARENT, &json!({"tags": [{"label": "t"}]}))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        TesselError::UnsupportedRelation {
            kind: RelationKind::ManyToMany,
            ..
        }
    ));
    assert!(orm.store().sql().is_empty());
}

#[tokio::test]
async fn failed_writes_roll_back() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::failing_on(r#"INTO "child""#));

    let error = orm
        .insert(PARENT, &json!({"children": [{"name": "a"}]}))
        .await
        .unwrap_err();

    assert!(matches!(error, TesselError::ExecutionError(_)));
    assert_eq!(orm.store().sql().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn updates_set_present_columns_by_key() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let updated = orm
        .update(
            PARENT,
            &json!({"id": 1, "name": "n", "children": [{"id": 2, "name": "a"}]}),
        )
        .await
        .unwrap();

    assert_eq!(
        orm.store().sql(),
        vec![
            "BEGIN",
            r#"UPDATE "parent" SET "name" = ? WHERE "id" = ?"#,
            r#"UPDATE "child" SET "name" = ?, "parent_id" = ? WHERE "id" = ?"#,
            "COMMIT",
        ]
    );
    assert_eq!(orm.store().params(2), vec![json!("a"), json!(1), json!(2)]);
    assert_eq!(updated["children"][0]["parentId"], json!(1));
}

#[test]
fn updates_need_every_identifier() {
    let registry = registry();
    let value = json!({"id": 1, "children": [{"name": "a"}]});
    let error = plan_update(&registry, PARENT, &value).unwrap_err();
    assert!(matches!(error, TesselError::MissingIdentifier(entity) if entity == CHILD));
}

#[test]
fn key_only_updates_issue_nothing() {
    let registry = registry();
    let value = json!({"id": 1});
    let plan = plan_update(&registry, PARENT, &value).unwrap();
    assert!(plan.statements().unwrap().is_empty());
}

#[tokio::test]
async fn removal_deletes_dependents_first() {
    let registry = registry();
    let orm = Orm::new(&registry, MockStore::new());

    let removed = orm
        .remove(PARENT, &json!({"id": 1, "children": [{"id": 2}, {"id": 3}]}))
        .await
        .unwrap();

    assert_eq!(removed, 3);
    assert_eq!(
        orm.store().sql(),
        vec![
            "BEGIN",
            r#"DELETE FROM "child" WHERE "id" IN (?, ?)"#,
            r#"DELETE FROM "parent" WHERE "id" = ?"#,
            "COMMIT",
        ]
    );
}

#[test]
fn removal_needs_identifiers() {
    let registry = registry();
    let value = json!({"name": "p"});
    assert!(matches!(
        plan_remove(&registry, PARENT, &value),
        Err(TesselError::MissingIdentifier(_))
    ));
}
