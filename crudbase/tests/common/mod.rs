//! Shared fixtures: a `Note` entity and an in-memory SQLite store.

#![allow(dead_code)]

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crudbase::db::sqlite_helpers::{decode_json_or_default, decode_timestamp_opt};
use crudbase::{
    BaseEntity, BaseRepository, BaseService, ColumnDef, Database, Entity, FieldMap, SqliteSource,
};

#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub base: BaseEntity,
    pub title: String,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

const NOTE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::required("title", "TEXT", None),
    ColumnDef::nullable("body", "TEXT"),
    ColumnDef::required("tags", "TEXT", Some("'[]'")),
    ColumnDef::nullable("published_at", "TEXT"),
];

impl Entity for Note {
    const TABLE_NAME: &'static str = "notes";

    fn columns() -> &'static [ColumnDef] {
        NOTE_COLUMNS
    }

    fn base(&self) -> &BaseEntity {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseEntity {
        &mut self.base
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("title", self.title.as_str())
            .with("body", self.body.clone())
            .with("tags", Value::from(self.tags.clone()))
            .with("published_at", self.published_at)
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let tags: Option<String> = row.try_get("tags")?;
        let published_at: Option<String> = row.try_get("published_at")?;

        Ok(Self {
            base: BaseEntity::from_row(row)?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            tags: decode_json_or_default(tags.as_deref())?,
            published_at: decode_timestamp_opt(published_at.as_deref())?,
        })
    }
}

pub type NoteRepository = BaseRepository<Note, SqliteSource<Note>>;
pub type NoteService = BaseService<Note, SqliteSource<Note>>;

/// Single-connection in-memory database with the `notes` table.
pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(Database::connect_options("sqlite::memory:").expect("memory url"))
        .await
        .expect("in-memory sqlite");
    crudbase::db::ensure_schema::<Note>(&pool)
        .await
        .expect("notes table");
    pool
}

pub fn repository(pool: &SqlitePool) -> NoteRepository {
    BaseRepository::new(SqliteSource::new(pool.clone())).with_searchable_fields(["title", "body"])
}

pub fn note(title: &str) -> Note {
    Note {
        title: title.to_string(),
        ..Note::default()
    }
}

/// Raw column value, bypassing the soft-delete filter.
pub async fn raw_column(pool: &SqlitePool, id: &str, column: &str) -> Option<String> {
    let sql = format!("SELECT CAST({} AS TEXT) FROM notes WHERE id = ?", column);
    sqlx::query_scalar::<_, Option<String>>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("row exists")
}
