#![cfg(feature = "rusqlite")]
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use tessel::sqlite::{SqliteStore, create_tables};
use tessel::{Column, DataType, Entity, EntityClass, MetadataRegistry};

pub const PARENT: EntityClass = EntityClass::new("Parent");
pub const CHILD: EntityClass = EntityClass::new("Child");
pub const TOY: EntityClass = EntityClass::new("Toy");
pub const PROFILE: EntityClass = EntityClass::new("Profile");
pub const TAG: EntityClass = EntityClass::new("Tag");
pub const DOCUMENT: EntityClass = EntityClass::new("Document");

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Child>,
}

impl Entity for Parent {
    const CLASS: EntityClass = PARENT;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Child {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Parent>>,
}

impl Entity for Child {
    const CLASS: EntityClass = CHILD;
}

/// Parent -< Child -< Toy, Parent - Profile, Parent >-< Tag, plus a scoped Document.
pub fn registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();

    registry
        .entity(PARENT, "parent")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("name", Column::new("name", DataType::Text).not_null())
        .one_to_many("children", || CHILD, "parent")
        .one_to_one("profile", || PROFILE, Some("parent"), None)
        .many_to_many("tags", || TAG, None)
        .finish()
        .unwrap();

    registry
        .entity(CHILD, "child")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("name", Column::new("name", DataType::Text).not_null())
        .column("parentId", Column::new("parent_id", DataType::Integer))
        .many_to_one("parent", || PARENT, "children", "parent_id")
        .one_to_many("toys", || TOY, "child")
        .finish()
        .unwrap();

    registry
        .entity(TOY, "toy")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column(
            "label",
            Column::new("label", DataType::Text).default_value("ball"),
        )
        .column("childId", Column::new("child_id", DataType::Integer))
        .many_to_one("child", || CHILD, "toys", "child_id")
        .finish()
        .unwrap();

    registry
        .entity(PROFILE, "profile")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("bio", Column::new("bio", DataType::Text))
        .column("parentId", Column::new("parent_id", DataType::Integer))
        .one_to_one("parent", || PARENT, Some("profile"), Some("parent_id"))
        .finish()
        .unwrap();

    registry
        .entity(TAG, "tag")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("label", Column::new("label", DataType::Text))
        .finish()
        .unwrap();

    registry
        .entity(DOCUMENT, "document")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("tenant", Column::new("tenant", DataType::Text).scope("acme"))
        .column("title", Column::new("title", DataType::Text))
        .finish()
        .unwrap();

    registry
}

/// In-memory database with foreign keys enforced and every table created.
pub fn setup_db(registry: &MetadataRegistry) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch("PRAGMA foreign_keys = ON")
        .unwrap();
    create_tables(store.connection(), registry).unwrap();
    store
}

/// Number of rows in `table`.
pub fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })
        .unwrap()
}
