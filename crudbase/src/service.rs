//! Generic service over a [`BaseRepository`].

use std::sync::Arc;

use serde_json::Value;

use crate::entity::{Actor, Entity, FieldMap};
use crate::error::Result;
use crate::query::{Criteria, FindOptions, ListOptions, PagingResult};
use crate::repository::BaseRepository;
use crate::source::DataSource;

pub struct BaseService<E: Entity, D: DataSource<E>> {
    repository: Arc<BaseRepository<E, D>>,
}

impl<E: Entity, D: DataSource<E>> Clone for BaseService<E, D> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<E: Entity, D: DataSource<E>> BaseService<E, D> {
    pub fn new(repository: Arc<BaseRepository<E, D>>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &BaseRepository<E, D> {
        &self.repository
    }

    /// Build an entity from `payload` and create it.
    pub async fn create_single(&self, payload: FieldMap, actor: &Actor) -> Result<E> {
        let entity = self.repository.build_entity(payload)?;
        self.repository.create(entity, actor).await
    }

    pub async fn create_multiple(&self, payload: Vec<FieldMap>, actor: &Actor) -> Result<Vec<E>> {
        let entities = self.repository.build_entities(payload)?;
        self.repository.create_many(entities, actor).await
    }

    /// Load the record matching `options`, overwrite it with `payload` and
    /// save it. Returns `None` when no live record matches.
    pub async fn edit(
        &self,
        options: FindOptions,
        payload: FieldMap,
        actor: &Actor,
    ) -> Result<Option<E>> {
        let Some(entity) = self.repository.detail(options).await? else {
            return Ok(None);
        };

        let mut merged = serde_json::to_value(&entity)?;
        if let Value::Object(ref mut object) = merged {
            object.extend(payload.to_json_object());
        }
        let entity: E = serde_json::from_value(merged)?;

        self.repository.edit(entity, actor).await.map(Some)
    }

    pub async fn list(&self, options: ListOptions) -> Result<Vec<E>> {
        self.repository.list(options).await
    }

    pub async fn list_with_paging(&self, options: ListOptions) -> Result<PagingResult<E>> {
        self.repository.list_with_paging(options).await
    }

    pub async fn detail(&self, options: FindOptions) -> Result<Option<E>> {
        self.repository.detail(options).await
    }

    pub async fn set_status(
        &self,
        criteria: &Criteria,
        status: impl Into<i32>,
        actor: &Actor,
    ) -> Result<bool> {
        self.repository.set_status(criteria, status, actor).await
    }

    pub async fn remove(&self, criteria: &Criteria, actor: &Actor) -> Result<bool> {
        self.repository.remove(criteria, actor).await
    }
}
