//! Session tying a metadata registry to a store.

use core::future::Future;

use serde_json::Value;

use crate::entity::{self, Entity};
use crate::error::Result;
use crate::factory::EntityInstanceFactory;
use crate::meta::{EntityClass, MetadataRegistry};
use crate::options::OrmOptions;
use crate::query::{build_read, plan_insert, plan_remove, plan_update};
use crate::relations::Relations;
use crate::store::Store;

/// Entry point for reads and writes against one store.
///
/// The registry is borrowed read-only; any number of sessions may share it.
#[derive(Debug)]
pub struct Orm<'r, S: Store> {
    registry: &'r MetadataRegistry,
    store: S,
    options: OrmOptions,
}

impl<'r, S: Store> Orm<'r, S> {
    pub fn new(registry: &'r MetadataRegistry, store: S) -> Self {
        Self {
            registry,
            store,
            options: OrmOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrmOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &'r MetadataRegistry {
        self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> OrmOptions {
        self.options
    }

    /// Loads the first instance matching `filter`, with `relations` attached.
    ///
    /// `filter` is an identifier or a partial entity; only its primary and scope
    /// keys constrain the result. Fails with `NotFound` when nothing matched.
    pub async fn retrieve(
        &self,
        entity: EntityClass,
        filter: &Value,
        relations: &Relations,
    ) -> Result<Value> {
        let query = build_read(self.registry, entity, filter, relations)?;
        let rows = query.fetch(&self.store).await?;
        EntityInstanceFactory::new(self.registry).retrieve(entity, &rows, &query.relations)
    }

    /// Loads every instance matching `filter`, in the order the store returned them.
    pub async fn retrieve_all(
        &self,
        entity: EntityClass,
        filter: &Value,
        relations: &Relations,
    ) -> Result<Vec<Value>> {
        build_read(self.registry, entity, filter, relations)?
            .execute(&self.store)
            .await
    }

    /// Inserts `value` and every related value it carries, parents first.
    ///
    /// Returns the inserted tree with defaults, generated identifiers and foreign
    /// keys filled in.
    pub async fn insert(&self, entity: EntityClass, value: &Value) -> Result<Value> {
        let normalized = EntityInstanceFactory::new(self.registry).normalize(entity, value)?;
        let plan = plan_insert(self.registry, entity, &normalized)?;
        self.write("insert", plan.execute(&self.store, self.options.batch_inserts))
            .await
    }

    /// Updates every node of `value` by primary key, setting only the columns present.
    pub async fn update(&self, entity: EntityClass, value: &Value) -> Result<Value> {
        let normalized =
            EntityInstanceFactory::new(self.registry).normalize_partial(entity, value)?;
        let plan = plan_update(self.registry, entity, &normalized)?;
        self.write("update", plan.execute(&self.store)).await
    }

    /// Deletes every node of `value` by primary key and returns the removed row count.
    pub async fn remove(&self, entity: EntityClass, value: &Value) -> Result<u64> {
        let normalized =
            EntityInstanceFactory::new(self.registry).normalize_partial(entity, value)?;
        let plan = plan_remove(self.registry, entity, &normalized)?;
        self.write("remove", plan.execute(&self.store)).await
    }

    /// Typed [`retrieve`](Self::retrieve).
    pub async fn find<T: Entity>(&self, filter: &Value, relations: &Relations) -> Result<T> {
        let value = self.retrieve(T::CLASS, filter, relations).await?;
        entity::from_value(value)
    }

    /// Typed [`retrieve_all`](Self::retrieve_all).
    pub async fn find_all<T: Entity>(&self, filter: &Value, relations: &Relations) -> Result<Vec<T>> {
        self.retrieve_all(T::CLASS, filter, relations)
            .await?
            .into_iter()
            .map(entity::from_value)
            .collect()
    }

    /// Typed [`insert`](Self::insert).
    pub async fn create<T: Entity>(&self, instance: &T) -> Result<T> {
        let value = entity::to_value(instance)?;
        let inserted = self.insert(T::CLASS, &value).await?;
        entity::from_value(inserted)
    }

    /// Typed [`update`](Self::update).
    pub async fn save<T: Entity>(&self, instance: &T) -> Result<T> {
        let value = entity::to_value(instance)?;
        let updated = self.update(T::CLASS, &value).await?;
        entity::from_value(updated)
    }

    /// Runs `work` inside a transaction when transactional writes are enabled.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn write<R>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<R>>,
    ) -> Result<R> {
        if !self.options.transactional_writes {
            return work.await;
        }

        crate::tessel_trace_tx!("begin", operation);
        self.store.begin().await?;

        match work.await {
            Ok(value) => {
                crate::tessel_trace_tx!("commit", operation);
                self.store.commit().await?;
                Ok(value)
            }
            Err(e) => {
                crate::tessel_trace_tx!("rollback", operation);
                let _ = self.store.rollback().await;
                Err(e)
            }
        }
    }
}
