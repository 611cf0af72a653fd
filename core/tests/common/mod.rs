#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use serde_json::Value;
use tessel_core::{
    BatchIds, Column, DataType, Dialect, EntityClass, MetadataRegistry, Result, Row,
    StatementOutcome, Store, TesselError, WriteResult,
};

pub const PARENT: EntityClass = EntityClass::new("Parent");
pub const CHILD: EntityClass = EntityClass::new("Child");
pub const TOY: EntityClass = EntityClass::new("Toy");
pub const PROFILE: EntityClass = EntityClass::new("Profile");
pub const TAG: EntityClass = EntityClass::new("Tag");
pub const DOCUMENT: EntityClass = EntityClass::new("Document");
pub const OWNER: EntityClass = EntityClass::new("Owner");
pub const CAR: EntityClass = EntityClass::new("Car");

pub fn parent() -> EntityClass {
    PARENT
}

pub fn child() -> EntityClass {
    CHILD
}

pub fn toy() -> EntityClass {
    TOY
}

pub fn profile() -> EntityClass {
    PROFILE
}

pub fn tag() -> EntityClass {
    TAG
}

/// Parent -< Child -< Toy, Parent - Profile, Parent >-< Tag, plus a scoped Document.
pub fn registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();

    registry
        .entity(PARENT, "parent")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("name", Column::new("name", DataType::Text))
        .one_to_many("children", child, "parent")
        .one_to_one("profile", profile, Some("parent"), None)
        .many_to_many("tags", tag, None)
        .finish()
        .unwrap();

    registry
        .entity(CHILD, "child")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("name", Column::new("name", DataType::Text))
        .column("parentId", Column::new("parent_id", DataType::Integer))
        .many_to_one("parent", parent, "children", "parent_id")
        .one_to_many("toys", toy, "child")
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
        .many_to_one("child", child, "toys", "child_id")
        .finish()
        .unwrap();

    registry
        .entity(PROFILE, "profile")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("bio", Column::new("bio", DataType::Text))
        .column("parentId", Column::new("parent_id", DataType::Integer))
        .one_to_one("parent", parent, Some("profile"), Some("parent_id"))
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

/// Owner -< Car, where `Car.owner` is both the foreign key column and the relation.
pub fn shared_key_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();

    registry
        .entity(OWNER, "owner")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("name", Column::new("name", DataType::Text))
        .one_to_many("cars", || CAR, "owner")
        .finish()
        .unwrap();

    registry
        .entity(CAR, "car")
        .column("id", Column::new("id", DataType::Integer).primary_key())
        .column("owner", Column::new("owner_id", DataType::Integer))
        .many_to_one("owner", || OWNER, "cars", "owner_id")
        .finish()
        .unwrap();

    registry
}

/// In-memory store recording every statement.
///
/// Inserts hand out increasing identifiers, deletes report one affected row per
/// parameter and selects return the canned `rows`.
#[derive(Debug, Default)]
pub struct MockStore {
    pub statements: RefCell<Vec<(String, Vec<Value>)>>,
    pub rows: RefCell<Vec<Row>>,
    pub contiguous: bool,
    /// Statements containing this text fail.
    pub fail_on: Option<&'static str>,
    last_id: Cell<i64>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contiguous() -> Self {
        Self {
            contiguous: true,
            ..Self::default()
        }
    }

    pub fn failing_on(text: &'static str) -> Self {
        Self {
            fail_on: Some(text),
            ..Self::default()
        }
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: RefCell::new(rows),
            ..Self::default()
        }
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements
            .borrow()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn params(&self, index: usize) -> Vec<Value> {
        self.statements.borrow()[index].1.clone()
    }
}

impl Store for MockStore {
    const DIALECT: Dialect = Dialect::SQLite;

    async fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<StatementOutcome> {
        self.statements
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));

        if let Some(text) = self.fail_on
            && sql.contains(text)
        {
            return Err(TesselError::ExecutionError(format!("refused: {sql}")));
        }

        if sql.starts_with("SELECT") {
            return Ok(StatementOutcome::Rows(self.rows.borrow().clone()));
        }

        if sql.starts_with("INSERT") {
            let rows = sql.matches("), (").count() as i64 + 1;
            let first = self.last_id.get() + 1;
            self.last_id.set(first + rows - 1);
            return Ok(StatementOutcome::Write(WriteResult {
                first_insert_id: Some(first),
                affected_rows: rows as u64,
            }));
        }

        let affected = if sql.starts_with("DELETE") {
            params.len() as u64
        } else {
            1
        };
        Ok(StatementOutcome::Write(WriteResult {
            first_insert_id: None,
            affected_rows: affected,
        }))
    }

    fn batch_ids(&self) -> BatchIds {
        if self.contiguous {
            BatchIds::Contiguous
        } else {
            BatchIds::Unknown
        }
    }
}

pub fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(column, value)| (*column, value.clone()))
        .collect()
}
