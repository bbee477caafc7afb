//! Entity base: shared audit/soft-delete columns and the traits every
//! persisted record implements.
//!
//! Entities are plain structs that flatten a [`BaseEntity`] and describe
//! themselves through the [`Entity`] trait:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! pub struct Note {
//!     #[serde(flatten)]
//!     pub base: BaseEntity,
//!     pub title: String,
//!     pub body: Option<String>,
//! }
//!
//! impl Entity for Note {
//!     const TABLE_NAME: &'static str = "notes";
//!     fn columns() -> &'static [ColumnDef] { NOTE_COLUMNS }
//!     fn base(&self) -> &BaseEntity { &self.base }
//!     fn base_mut(&mut self) -> &mut BaseEntity { &mut self.base }
//!     fn to_fields(&self) -> FieldMap {
//!         FieldMap::new().with("title", self.title.as_str()).with("body", self.body.clone())
//!     }
//!     fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> { ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use async_graphql::{ComplexObject, ID, SimpleObject};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::sqlite_helpers::{decode_timestamp, decode_timestamp_opt};
use crate::utils::{cast_boolean, format_date};

// ============================================================================
// Values and field projections
// ============================================================================

/// A value that can be bound to a query or written to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Nested data stored as JSON text
    Json(Value),
    Null,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// JSON form used for building entities from payloads.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::String(s) => Value::String(s.clone()),
            SqlValue::Int(i) => Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Timestamp(dt) => Value::String(format_date(*dt)),
            SqlValue::Json(v) => v.clone(),
            SqlValue::Null => Value::Null,
        }
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::String(v.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            other => SqlValue::Json(other),
        }
    }
}

impl From<RecordStatus> for SqlValue {
    fn from(v: RecordStatus) -> Self {
        SqlValue::Int(i32::from(v) as i64)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Column → value projection of a record.
///
/// A column that is absent from the map is left untouched by writes; use
/// [`SqlValue::Null`] to write an explicit NULL. [`insert_opt`](Self::insert_opt)
/// implements the omit-if-absent rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(BTreeMap<String, SqlValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Insert `value` when present; leave the column out otherwise.
    pub fn insert_opt<V: Into<SqlValue>>(
        &mut self,
        column: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(column.into(), v.into());
        }
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Builder form of [`insert_opt`](Self::insert_opt).
    pub fn with_opt<V: Into<SqlValue>>(mut self, column: impl Into<String>, value: Option<V>) -> Self {
        self.insert_opt(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<SqlValue> {
        self.0.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Right-biased merge: columns in `other` replace columns in `self`.
    pub fn merge(&mut self, other: FieldMap) {
        self.0.extend(other.0);
    }

    pub fn to_json_object(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, SqlValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Schema metadata
// ============================================================================

/// Column definition for schema generation.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name in the database
    pub name: &'static str,
    /// SQLite column type (TEXT, INTEGER, REAL, BLOB)
    pub sql_type: &'static str,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub is_primary_key: bool,
    /// Default value expression (e.g., "0")
    pub default: Option<&'static str>,
}

impl ColumnDef {
    /// A nullable column without default.
    pub const fn nullable(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
            is_primary_key: false,
            default: None,
        }
    }

    /// A NOT NULL column, optionally with a default expression.
    pub const fn required(
        name: &'static str,
        sql_type: &'static str,
        default: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            is_primary_key: false,
            default,
        }
    }

    /// Generate the column definition SQL
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);

        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }

        if !self.nullable && !self.is_primary_key {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }

        sql
    }
}

const NOW_EXPR: &str = "(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

/// Columns every entity table carries.
pub const BASE_COLUMNS: &[ColumnDef] = &[
    ColumnDef {
        name: "id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: true,
        default: None,
    },
    ColumnDef::required("status", "INTEGER", Some("1")),
    ColumnDef::required("removed", "INTEGER", Some("0")),
    ColumnDef::nullable("creator", "TEXT"),
    ColumnDef::nullable("updater", "TEXT"),
    ColumnDef::nullable("remover", "TEXT"),
    ColumnDef::required("created_at", "TEXT", Some(NOW_EXPR)),
    ColumnDef::required("updated_at", "TEXT", Some(NOW_EXPR)),
    ColumnDef::nullable("removed_at", "TEXT"),
];

// ============================================================================
// Record status and actors
// ============================================================================

/// Default lifecycle states. Entities with richer lifecycles store their own
/// integer codes in the same column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Inactive,
    Active,
}

impl From<RecordStatus> for i32 {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Inactive => 0,
            RecordStatus::Active => 1,
        }
    }
}

impl TryFrom<i32> for RecordStatus {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordStatus::Inactive),
            1 => Ok(RecordStatus::Active),
            other => Err(other),
        }
    }
}

/// Who performed a write. The system actor leaves audit columns untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    System,
    Principal(String),
}

impl Actor {
    pub fn principal(id: impl fmt::Display) -> Self {
        Actor::Principal(id.to_string())
    }

    /// Identifier written to `creator`/`updater`/`remover`.
    pub fn id(&self) -> Option<&str> {
        match self {
            Actor::System => None,
            Actor::Principal(id) => Some(id),
        }
    }
}

impl From<String> for Actor {
    fn from(id: String) -> Self {
        Actor::Principal(id)
    }
}

impl From<&str> for Actor {
    fn from(id: &str) -> Self {
        Actor::Principal(id.to_string())
    }
}

impl From<i64> for Actor {
    fn from(id: i64) -> Self {
        Actor::Principal(id.to_string())
    }
}

// ============================================================================
// Base entity
// ============================================================================

/// Identifier, lifecycle and audit columns shared by all records.
///
/// Exposed to GraphQL with `creator`/`updater` resolved as `User`
/// references; flatten it into entity objects with `#[graphql(flatten)]`.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(complex)]
#[serde(default)]
pub struct BaseEntity {
    pub id: Option<String>,
    pub status: i32,
    pub removed: bool,
    #[graphql(skip)]
    pub creator: Option<String>,
    #[graphql(skip)]
    pub updater: Option<String>,
    #[graphql(skip)]
    pub remover: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl Default for BaseEntity {
    fn default() -> Self {
        Self {
            id: None,
            status: RecordStatus::Active.into(),
            removed: false,
            creator: None,
            updater: None,
            remover: None,
            created_at: None,
            updated_at: None,
            removed_at: None,
        }
    }
}

impl BaseEntity {
    /// The status as one of the default states, if it is one.
    pub fn record_status(&self) -> Option<RecordStatus> {
        RecordStatus::try_from(self.status).ok()
    }

    /// Projection of the base columns. `id` and the auto-managed timestamps
    /// are omitted when unset so the store can fill them in.
    pub fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with_opt("id", self.id.clone())
            .with("status", self.status)
            .with("removed", self.removed)
            .with("creator", self.creator.clone())
            .with("updater", self.updater.clone())
            .with("remover", self.remover.clone())
            .with_opt("created_at", self.created_at)
            .with_opt("updated_at", self.updated_at)
            .with("removed_at", self.removed_at)
    }

    /// Decode the base columns from a row.
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let removed_at: Option<String> = row.try_get("removed_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            removed: row.try_get("removed")?,
            creator: row.try_get("creator")?,
            updater: row.try_get("updater")?,
            remover: row.try_get("remover")?,
            created_at: Some(decode_timestamp(&created_at)?),
            updated_at: Some(decode_timestamp(&updated_at)?),
            removed_at: decode_timestamp_opt(removed_at.as_deref())?,
        })
    }

    /// Federation reference to the user who created the record.
    pub fn creator_reference(&self) -> Option<UserReference> {
        UserReference::from_actor_id(self.creator.as_deref())
    }

    /// Federation reference to the user who last updated the record.
    pub fn updater_reference(&self) -> Option<UserReference> {
        UserReference::from_actor_id(self.updater.as_deref())
    }
}

#[ComplexObject]
impl BaseEntity {
    async fn creator(&self) -> Option<UserReference> {
        self.creator_reference()
    }

    async fn updater(&self) -> Option<UserReference> {
        self.updater_reference()
    }
}

/// Reference to a `User` owned by another subgraph.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
#[graphql(name = "User")]
pub struct UserReference {
    pub id: ID,
}

impl UserReference {
    fn from_actor_id(id: Option<&str>) -> Option<Self> {
        let id = id?;
        if !cast_boolean(&Value::String(id.to_string())) {
            return None;
        }
        Some(Self { id: ID::from(id) })
    }
}

// ============================================================================
// Entity trait
// ============================================================================

/// A persisted record type.
///
/// Implementors flatten a [`BaseEntity`] and describe their own columns; the
/// base columns are added automatically.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// The SQL table name (e.g., "notes")
    const TABLE_NAME: &'static str;

    /// The primary key column name
    const PRIMARY_KEY: &'static str = "id";

    /// Entity-specific columns (without the base columns)
    fn columns() -> &'static [ColumnDef];

    fn base(&self) -> &BaseEntity;

    fn base_mut(&mut self) -> &mut BaseEntity;

    /// Projection of the entity-specific columns.
    fn to_fields(&self) -> FieldMap;

    /// Decode a row selected with [`select_sql`](Self::select_sql).
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;

    fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    /// All column names, base columns first.
    fn column_names() -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .chain(Self::columns())
            .map(|c| c.name)
            .collect()
    }

    fn has_column(name: &str) -> bool {
        BASE_COLUMNS
            .iter()
            .chain(Self::columns())
            .any(|c| c.name == name)
    }

    /// Full projection: base columns plus entity columns.
    fn project(&self) -> FieldMap {
        let mut fields = self.base().to_fields();
        fields.merge(self.to_fields());
        fields
    }

    /// Build a SELECT query for all columns
    fn select_sql() -> String {
        format!("SELECT {} FROM {}", Self::column_names().join(", "), Self::TABLE_NAME)
    }

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    fn create_table_sql() -> String {
        let column_defs: Vec<String> = BASE_COLUMNS
            .iter()
            .chain(Self::columns())
            .map(|c| c.to_sql())
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            Self::TABLE_NAME,
            column_defs.join(",\n  ")
        )
    }
}
