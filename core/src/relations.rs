//! Relation inclusion shapes for reads.

use serde_json::Value;

use crate::error::{Result, TesselError};
use crate::prelude::*;

/// What to load for one requested relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    /// The related entity's own columns only.
    All,
    /// The related entity's columns plus further relations.
    Nested(Relations),
}

impl Include {
    pub fn nested(&self) -> Option<&Relations> {
        match self {
            Include::All => None,
            Include::Nested(relations) => Some(relations),
        }
    }

    fn merge(self, other: Include) -> Include {
        match (self, other) {
            (Include::All, Include::All) => Include::All,
            (Include::All, nested @ Include::Nested(_)) | (nested @ Include::Nested(_), Include::All) => {
                nested
            }
            (Include::Nested(mut left), Include::Nested(right)) => {
                left.merge(right);
                Include::Nested(left)
            }
        }
    }
}

/// Ordered set of relations to load alongside an entity.
///
/// ```
/// use tessel_core::Relations;
///
/// let relations = Relations::new()
///     .with("parent")
///     .nest("children", Relations::new().with("toys"));
/// assert_eq!(relations.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    entries: Vec<(String, Include)>,
}

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes `property` with its own columns.
    pub fn with(mut self, property: impl Into<String>) -> Self {
        self.insert(property, Include::All);
        self
    }

    /// Includes `property` and the relations nested below it.
    pub fn nest(mut self, property: impl Into<String>, nested: Relations) -> Self {
        self.insert(property, Include::Nested(nested));
        self
    }

    /// Adds `property`, merging with an existing request for the same key.
    pub fn insert(&mut self, property: impl Into<String>, include: Include) {
        let property = property.into();
        match self.entries.iter().position(|(key, _)| *key == property) {
            Some(index) => {
                let (_, existing) = self.entries.remove(index);
                self.entries.insert(index, (property, existing.merge(include)));
            }
            None => self.entries.push((property, include)),
        }
    }

    /// Merges every request of `other` into `self`.
    pub fn merge(&mut self, other: Relations) {
        for (property, include) in other.entries {
            self.insert(property, include);
        }
    }

    pub fn get(&self, property: &str) -> Option<&Include> {
        self.entries
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, include)| include)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Include)> {
        self.entries
            .iter()
            .map(|(key, include)| (key.as_str(), include))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `{"parent": true, "children": {"toys": true}}`.
    ///
    /// `false` and `null` leaves are skipped; any other leaf is a shape error.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(TesselError::DataShape(format!(
                "relations must be an object, got {}",
                value
            )));
        };

        let mut relations = Relations::new();
        for (property, leaf) in map {
            match leaf {
                Value::Bool(true) => relations.insert(property.as_str(), Include::All),
                Value::Bool(false) | Value::Null => {}
                Value::Object(_) => {
                    relations.insert(property.as_str(), Include::Nested(Self::from_value(leaf)?))
                }
                other => {
                    return Err(TesselError::DataShape(format!(
                        "relation `{}` must be `true` or an object, got {}",
                        property, other
                    )));
                }
            }
        }
        Ok(relations)
    }
}

impl TryFrom<&Value> for Relations {
    type Error = TesselError;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl<S: Into<String>> FromIterator<S> for Relations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut relations = Relations::new();
        for property in iter {
            relations.insert(property, Include::All);
        }
        relations
    }
}
