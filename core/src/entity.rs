//! Typed entities on top of the value model.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TesselError};
use crate::meta::EntityClass;
use crate::prelude::*;

/// A Rust type stored as a registered entity class.
///
/// Instances travel through the ORM as `serde_json` values, so field names must
/// match the declared property names. Relation fields are usually `Option` or
/// `Vec` with `#[serde(default, skip_serializing_if = ...)]` so absent relations
/// stay absent.
pub trait Entity: Serialize + DeserializeOwned {
    const CLASS: EntityClass;
}

pub(crate) fn to_value<T: Entity>(entity: &T) -> Result<Value> {
    serde_json::to_value(entity)
        .map_err(|e| TesselError::Mapping(format!("serializing `{}`: {}", T::CLASS, e)))
}

pub(crate) fn from_value<T: Entity>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| TesselError::Mapping(format!("deserializing `{}`: {}", T::CLASS, e)))
}
