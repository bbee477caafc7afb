//! Generic repository over a [`DataSource`].
//!
//! Every read filters out soft-deleted rows. Writes go through the
//! formatting pipeline ([`format_fields`]) and stamp the acting user on
//! `creator`, `updater` or `remover`.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::entity::{Actor, Entity, FieldMap, SqlValue};
use crate::error::Result;
use crate::query::{
    Condition, Criteria, DEFAULT_PAGE_SIZE, FindOptions, ListOptions, MAX_PAGE_SIZE, OrderTuple,
    PageFilter, PageInfo, Paging, PagingResult, Predicate, default_order,
};
use crate::source::DataSource;
use crate::utils::{format_date, now_iso, trim_str, trim_value};

/// Defaults applied by list operations.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryOptions {
    pub default_order: Vec<OrderTuple>,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            default_order: default_order(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl From<&Config> for RepositoryOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveMode {
    Create,
    Edit,
}

impl SaveMode {
    fn actor_column(self) -> &'static str {
        match self {
            SaveMode::Create => "creator",
            SaveMode::Edit => "updater",
        }
    }
}

/// Normalize a projection before it is written.
///
/// Timestamps become canonical ISO strings, text is trimmed (empty text is
/// written as NULL) and JSON values are trimmed recursively.
pub fn format_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(column, value)| {
            let value = match value {
                SqlValue::Timestamp(dt) => SqlValue::String(format_date(dt)),
                SqlValue::String(s) => trim_str(&s).map(SqlValue::String).unwrap_or(SqlValue::Null),
                SqlValue::Json(v) => SqlValue::from(trim_value(v)),
                other => other,
            };
            (column, value)
        })
        .collect()
}

/// Merge `removed = false` into every alternative, replacing any caller
/// predicate on `removed`.
fn not_removed(conditions: Vec<Condition>) -> Vec<Condition> {
    let live = Condition::eq("removed", false);
    if conditions.is_empty() {
        return vec![live];
    }
    conditions.into_iter().map(|c| c.merged(&live)).collect()
}

pub struct BaseRepository<E: Entity, D: DataSource<E>> {
    source: D,
    searchable_fields: Vec<String>,
    options: RepositoryOptions,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Entity, D: DataSource<E>> BaseRepository<E, D> {
    pub fn new(source: D) -> Self {
        Self {
            source,
            searchable_fields: Vec::new(),
            options: RepositoryOptions::default(),
            _phantom: PhantomData,
        }
    }

    /// Columns matched by `search_value`.
    pub fn with_searchable_fields<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    /// The underlying data source.
    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn detail(&self, options: FindOptions) -> Result<Option<E>> {
        let options = FindOptions {
            conditions: not_removed(options.conditions),
            ..options
        };
        self.source.find_one(options).await
    }

    pub async fn list(&self, options: ListOptions) -> Result<Vec<E>> {
        let find = self.list_find_options(&options);
        self.source.find(find).await
    }

    pub async fn list_with_paging(&self, options: ListOptions) -> Result<PagingResult<E>> {
        let paging = Paging::resolve(
            options.page,
            options.page_size,
            self.options.default_page_size,
            self.options.max_page_size,
        );
        let find = self
            .list_find_options(&options)
            .skip(paging.skip)
            .take(paging.take);

        let (data, total_count) = self.source.find_and_count(find).await?;
        debug!(
            table = E::TABLE_NAME,
            page = paging.page,
            page_size = paging.page_size,
            total_count,
            "Listed page"
        );

        Ok(PagingResult {
            data,
            page_info: PageInfo {
                filter: PageFilter {
                    page: paging.page,
                    page_size: paging.page_size,
                    search_value: options.search_value,
                },
                total_count,
            },
        })
    }

    /// Build the where-clause and order of a list request, without paging.
    pub fn list_find_options(&self, options: &ListOptions) -> FindOptions {
        let order = if options.options.order.is_empty() {
            self.order_conditions(options.orders.as_deref())
        } else {
            options.options.order.clone()
        };

        let search = options.search_value.as_deref().filter(|s| !s.is_empty());
        let conditions = match search {
            Some(value) if !self.searchable_fields.is_empty() => {
                self.search_conditions(&options.options.conditions, value)
            }
            _ => options.options.conditions.clone(),
        };

        FindOptions {
            conditions: not_removed(conditions),
            order,
            skip: options.options.skip,
            take: options.options.take,
        }
    }

    /// Requested orders on known columns. Falls back to the configured
    /// default order, then to `created_at DESC`.
    fn order_conditions(&self, orders: Option<&[OrderTuple]>) -> Vec<OrderTuple> {
        let columns = self.source.column_names();
        let known = |requested: &[OrderTuple]| -> Vec<OrderTuple> {
            requested
                .iter()
                .filter(|(field, _)| {
                    let known = columns.contains(&field.as_str());
                    if !known {
                        warn!(table = E::TABLE_NAME, field = %field, "Dropping order on unknown field");
                    }
                    known
                })
                .cloned()
                .collect()
        };

        let order = orders.map(|requested| known(requested)).unwrap_or_default();
        if !order.is_empty() {
            return order;
        }

        let configured = known(&self.options.default_order);
        if configured.is_empty() {
            default_order()
        } else {
            configured
        }
    }

    /// Cartesian product of the caller alternatives with one contains
    /// predicate per searchable field.
    fn search_conditions(&self, conditions: &[Condition], value: &str) -> Vec<Condition> {
        let empty = [Condition::new()];
        let alternatives = if conditions.is_empty() {
            &empty[..]
        } else {
            conditions
        };

        alternatives
            .iter()
            .flat_map(|alternative| {
                self.searchable_fields.iter().map(move |field| {
                    alternative
                        .clone()
                        .merged(&Condition::new().and(field.as_str(), Predicate::contains(value)))
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    fn prepare(entity: &E, actor: &Actor, mode: SaveMode) -> FieldMap {
        let mut fields = format_fields(entity.project());
        if let Some(id) = actor.id() {
            fields.insert(mode.actor_column(), id);
        }
        fields
    }

    async fn save(
        &self,
        entities: Vec<E>,
        actor: &Actor,
        mode: SaveMode,
        session: Option<&mut D::Session>,
    ) -> Result<Vec<E>> {
        let records = entities
            .iter()
            .map(|entity| Self::prepare(entity, actor, mode))
            .collect();
        self.source.save(records, session).await
    }

    async fn save_one(
        &self,
        entity: E,
        actor: &Actor,
        mode: SaveMode,
        session: Option<&mut D::Session>,
    ) -> Result<E> {
        let saved = self.save(vec![entity], actor, mode, session).await?;
        Ok(saved.into_iter().next().ok_or(sqlx::Error::RowNotFound)?)
    }

    pub async fn create(&self, entity: E, actor: &Actor) -> Result<E> {
        self.save_one(entity, actor, SaveMode::Create, None).await
    }

    pub async fn create_many(&self, entities: Vec<E>, actor: &Actor) -> Result<Vec<E>> {
        self.save(entities, actor, SaveMode::Create, None).await
    }

    pub async fn create_with_transaction(
        &self,
        entity: E,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<E> {
        self.save_one(entity, actor, SaveMode::Create, Some(session))
            .await
    }

    pub async fn create_many_with_transaction(
        &self,
        entities: Vec<E>,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<Vec<E>> {
        self.save(entities, actor, SaveMode::Create, Some(session))
            .await
    }

    pub async fn edit(&self, entity: E, actor: &Actor) -> Result<E> {
        self.save_one(entity, actor, SaveMode::Edit, None).await
    }

    pub async fn edit_many(&self, entities: Vec<E>, actor: &Actor) -> Result<Vec<E>> {
        self.save(entities, actor, SaveMode::Edit, None).await
    }

    pub async fn edit_with_transaction(
        &self,
        entity: E,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<E> {
        self.save_one(entity, actor, SaveMode::Edit, Some(session))
            .await
    }

    pub async fn edit_many_with_transaction(
        &self,
        entities: Vec<E>,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<Vec<E>> {
        self.save(entities, actor, SaveMode::Edit, Some(session))
            .await
    }

    fn status_fields(status: i32, actor: &Actor) -> FieldMap {
        format_fields(
            FieldMap::new()
                .with("status", status)
                .with_opt("updater", actor.id()),
        )
    }

    fn removal_fields(actor: &Actor) -> FieldMap {
        format_fields(
            FieldMap::new()
                .with("removed", true)
                .with("removed_at", now_iso())
                .with_opt("remover", actor.id()),
        )
    }

    /// Set `status` on every matching record. True if any row changed.
    pub async fn set_status(
        &self,
        criteria: &Criteria,
        status: impl Into<i32>,
        actor: &Actor,
    ) -> Result<bool> {
        let fields = Self::status_fields(status.into(), actor);
        Ok(self.source.update(criteria, fields, None).await? > 0)
    }

    pub async fn set_status_with_transaction(
        &self,
        criteria: &Criteria,
        status: impl Into<i32>,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<bool> {
        let fields = Self::status_fields(status.into(), actor);
        Ok(self.source.update(criteria, fields, Some(session)).await? > 0)
    }

    /// Soft delete every matching record.
    pub async fn remove(&self, criteria: &Criteria, actor: &Actor) -> Result<bool> {
        let fields = Self::removal_fields(actor);
        Ok(self.source.update(criteria, fields, None).await? > 0)
    }

    pub async fn remove_with_transaction(
        &self,
        criteria: &Criteria,
        actor: &Actor,
        session: &mut D::Session,
    ) -> Result<bool> {
        let fields = Self::removal_fields(actor);
        Ok(self.source.update(criteria, fields, Some(session)).await? > 0)
    }

    /// Hard delete. Storage failures are logged and reported as `false`.
    pub async fn destroy(&self, id: &str) -> bool {
        match self.source.delete(id).await {
            Ok(affected) => affected > 0,
            Err(e) => {
                error!(table = E::TABLE_NAME, id = %id, error = %e, "Failed to destroy record");
                false
            }
        }
    }

    /// Build an entity from a projection without touching storage. Missing
    /// fields take their default.
    pub fn build_entity(&self, fields: FieldMap) -> Result<E> {
        Ok(serde_json::from_value(Value::Object(fields.to_json_object()))?)
    }

    pub fn build_entities(&self, records: Vec<FieldMap>) -> Result<Vec<E>> {
        records
            .into_iter()
            .map(|fields| self.build_entity(fields))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_format_fields_pipeline() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let fields = FieldMap::new()
            .with("title", "  Hello    world ")
            .with("body", "   ")
            .with("published_at", dt)
            .with("meta", json!({ "tag": "  a  b ", "list": ["  x ", ""] }))
            .with("pinned", true);

        let formatted = format_fields(fields);

        assert_eq!(formatted.get("title"), Some(&SqlValue::String("Hello world".into())));
        assert_eq!(formatted.get("body"), Some(&SqlValue::Null));
        assert_eq!(
            formatted.get("published_at"),
            Some(&SqlValue::String("2024-03-01T08:00:00.000Z".into()))
        );
        assert_eq!(
            formatted.get("meta"),
            Some(&SqlValue::Json(json!({ "tag": "a b", "list": ["x", null] })))
        );
        assert_eq!(formatted.get("pinned"), Some(&SqlValue::Bool(true)));
    }

    #[test]
    fn test_not_removed_overrides_caller() {
        assert_eq!(not_removed(vec![]), vec![Condition::eq("removed", false)]);

        let merged = not_removed(vec![
            Condition::eq("removed", true),
            Condition::eq("title", "a"),
        ]);
        assert_eq!(merged.len(), 2);
        for condition in &merged {
            assert_eq!(condition.get("removed"), Some(&Predicate::eq(false)));
        }
        assert_eq!(merged[1].get("title"), Some(&Predicate::eq("a")));
    }

    #[test]
    fn test_options_from_config() {
        let config = Config::from_lookup(|key| match key {
            "DEFAULT_PAGE_SIZE" => Some("25".to_string()),
            "MAX_PAGE_SIZE" => Some("50".to_string()),
            _ => None,
        })
        .unwrap();

        let options = RepositoryOptions::from(&config);
        assert_eq!(options.default_page_size, 25);
        assert_eq!(options.max_page_size, 50);
        assert_eq!(options.default_order, default_order());
    }
}
