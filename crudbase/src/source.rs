//! Persistence boundary.
//!
//! [`DataSource`] is what the repository talks to. [`SqliteSource`] renders
//! [`FindOptions`] into parameterized SQL using sqlx and upserts on `id`.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::{Executor, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{Entity, FieldMap, SqlValue};
use crate::error::{Error, Result};
use crate::query::{Criteria, FindOptions};
use crate::utils::{format_date, now_iso};

/// Storage operations the repository relies on.
///
/// `Session` is the handle of a caller-owned transaction. Writes given a
/// session run on it; the caller commits or rolls back.
#[async_trait]
pub trait DataSource<E: Entity>: Send + Sync {
    type Session: Send;

    /// Column names of the entity, used to validate requested orders.
    fn column_names(&self) -> Vec<&'static str> {
        E::column_names()
    }

    async fn find_one(&self, options: FindOptions) -> Result<Option<E>>;

    async fn find(&self, options: FindOptions) -> Result<Vec<E>>;

    /// Matching records plus the total count of the same filter, ignoring
    /// `skip`/`take`.
    async fn find_and_count(&self, options: FindOptions) -> Result<(Vec<E>, i64)>;

    /// Insert or update each record by `id`, returning the stored rows.
    async fn save(
        &self,
        records: Vec<FieldMap>,
        session: Option<&mut Self::Session>,
    ) -> Result<Vec<E>>;

    /// Apply `fields` to every record matching `criteria`; returns the number
    /// of affected rows.
    async fn update(
        &self,
        criteria: &Criteria,
        fields: FieldMap,
        session: Option<&mut Self::Session>,
    ) -> Result<u64>;

    /// Hard delete by id; returns the number of affected rows.
    async fn delete(&self, id: &str) -> Result<u64>;
}

// ============================================================================
// SQL building
// ============================================================================

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::String(s) => query.bind(s.clone()),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Timestamp(dt) => query.bind(format_date(*dt)),
        SqlValue::Json(v) => query.bind(v.to_string()),
        SqlValue::Null => query.bind(None::<String>),
    }
}

fn check_column<E: Entity>(column: &str) -> Result<()> {
    if E::has_column(column) {
        Ok(())
    } else {
        Err(Error::UnknownColumn {
            table: E::TABLE_NAME,
            column: column.to_string(),
        })
    }
}

/// Execute a statement with bound values.
async fn execute_with_binds<'e, X>(
    sql: &str,
    values: &[SqlValue],
    executor: X,
) -> Result<SqliteQueryResult, sqlx::Error>
where
    X: Executor<'e, Database = Sqlite>,
{
    debug!(sql = %sql, binds = values.len(), "Executing statement");
    let query = values
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value));
    query.execute(executor).await
}

/// A SELECT over an entity table built from [`FindOptions`].
///
/// Column names in conditions and orders are checked against the entity
/// before any SQL is produced.
#[derive(Debug)]
pub struct EntityQuery<E: Entity> {
    _phantom: PhantomData<fn() -> E>,
    where_clause: Option<String>,
    values: Vec<SqlValue>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl<E: Entity> EntityQuery<E> {
    pub fn from_options(options: &FindOptions) -> Result<Self> {
        let mut groups = Vec::with_capacity(options.conditions.len());
        let mut values = Vec::new();

        for condition in &options.conditions {
            for column in condition.columns() {
                check_column::<E>(column)?;
            }
            let (sql, binds) = condition.to_sql();
            groups.push(format!("({})", sql));
            values.extend(binds);
        }

        let mut order_by = Vec::with_capacity(options.order.len());
        for (field, direction) in &options.order {
            check_column::<E>(field)?;
            order_by.push(format!("{} {}", field, direction.as_sql()));
        }

        Ok(Self {
            _phantom: PhantomData,
            where_clause: (!groups.is_empty()).then(|| groups.join(" OR ")),
            values,
            order_by,
            limit: options.take,
            offset: options.skip,
        })
    }

    fn push_where(&self, sql: &mut String) {
        if let Some(ref clause) = self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
    }

    /// Build the SQL query string.
    pub fn build_sql(&self) -> String {
        let mut sql = E::select_sql();
        self.push_where(&mut sql);

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite needs a LIMIT before OFFSET
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset))
            }
            _ => {}
        }

        sql
    }

    /// Build a COUNT query string.
    pub fn build_count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", E::TABLE_NAME);
        self.push_where(&mut sql);
        sql
    }

    fn bound<'q>(&self, sql: &'q str) -> SqliteQuery<'q> {
        self.values
            .iter()
            .fold(sqlx::query(sql), |query, value| bind_value(query, value))
    }

    /// Execute the query and return all matching entities.
    pub async fn fetch_all<'e, X>(&self, executor: X) -> Result<Vec<E>, sqlx::Error>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let sql = self.build_sql();
        debug!(sql = %sql, "Executing entity query");

        let rows = self.bound(&sql).fetch_all(executor).await?;
        rows.iter().map(E::from_row).collect()
    }

    /// Execute the query and return the first entity.
    pub async fn fetch_optional<'e, X>(&self, executor: X) -> Result<Option<E>, sqlx::Error>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let sql = self.build_sql();
        debug!(sql = %sql, "Executing entity query (one)");

        match self.bound(&sql).fetch_optional(executor).await? {
            Some(row) => Ok(Some(E::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Execute a COUNT query.
    pub async fn count<'e, X>(&self, executor: X) -> Result<i64, sqlx::Error>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let sql = self.build_count_sql();
        debug!(sql = %sql, "Executing count query");

        let row = self.bound(&sql).fetch_one(executor).await?;
        row.try_get(0)
    }
}

fn upsert_sql<E: Entity>(columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| **c != E::PRIMARY_KEY && **c != "created_at")
        .map(|c| format!("{} = excluded.{}", c, c))
        .collect();

    let on_conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        E::TABLE_NAME,
        columns.join(", "),
        placeholders,
        E::PRIMARY_KEY,
        on_conflict
    )
}

fn record_id(fields: &FieldMap) -> Option<String> {
    match fields.get("id") {
        Some(SqlValue::String(id)) => Some(id.clone()),
        Some(SqlValue::Int(id)) => Some(id.to_string()),
        _ => None,
    }
}

// ============================================================================
// SQLite implementation
// ============================================================================

/// [`DataSource`] over a SQLite pool. Sessions are `&mut SqliteConnection`,
/// typically `&mut *tx` of a transaction begun by the caller.
pub struct SqliteSource<E: Entity> {
    pool: SqlitePool,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for SqliteSource<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<E: Entity> SqliteSource<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn save_on(&self, conn: &mut SqliteConnection, records: Vec<FieldMap>) -> Result<Vec<E>> {
        let mut saved = Vec::with_capacity(records.len());

        for mut fields in records {
            for column in fields.keys() {
                check_column::<E>(column)?;
            }

            let id = match record_id(&fields) {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4().to_string();
                    fields.insert("id", id.as_str());
                    id
                }
            };
            fields.insert("updated_at", now_iso());

            let (columns, values): (Vec<String>, Vec<SqlValue>) = fields.into_iter().unzip();
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            execute_with_binds(&upsert_sql::<E>(&columns), &values, &mut *conn).await?;

            let record = EntityQuery::<E>::from_options(&FindOptions::by_id(id))?
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            saved.push(record);
        }

        Ok(saved)
    }

    fn update_sql(criteria: &Criteria, mut fields: FieldMap) -> Result<(String, Vec<SqlValue>)> {
        fields.insert("updated_at", now_iso());

        let condition = criteria.to_condition();
        for column in fields.keys().chain(condition.columns()) {
            check_column::<E>(column)?;
        }

        let (columns, mut values): (Vec<String>, Vec<SqlValue>) = fields.into_iter().unzip();
        let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        let (where_sql, where_values) = condition.to_sql();
        values.extend(where_values);

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            E::TABLE_NAME,
            assignments.join(", "),
            where_sql
        );
        Ok((sql, values))
    }
}

#[async_trait]
impl<E: Entity> DataSource<E> for SqliteSource<E> {
    type Session = SqliteConnection;

    async fn find_one(&self, options: FindOptions) -> Result<Option<E>> {
        let query = EntityQuery::<E>::from_options(&options.take(1))?;
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn find(&self, options: FindOptions) -> Result<Vec<E>> {
        let query = EntityQuery::<E>::from_options(&options)?;
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Count and page are read in one transaction so they agree.
    async fn find_and_count(&self, options: FindOptions) -> Result<(Vec<E>, i64)> {
        let query = EntityQuery::<E>::from_options(&options)?;

        let mut tx = self.pool.begin().await?;
        let total = query.count(&mut *tx).await?;
        let records = query.fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok((records, total))
    }

    async fn save(
        &self,
        records: Vec<FieldMap>,
        session: Option<&mut SqliteConnection>,
    ) -> Result<Vec<E>> {
        match session {
            Some(conn) => self.save_on(conn, records).await,
            None => {
                let mut tx = self.pool.begin().await?;
                let saved = self.save_on(&mut *tx, records).await?;
                tx.commit().await?;
                Ok(saved)
            }
        }
    }

    async fn update(
        &self,
        criteria: &Criteria,
        fields: FieldMap,
        session: Option<&mut SqliteConnection>,
    ) -> Result<u64> {
        let (sql, values) = Self::update_sql(criteria, fields)?;
        let result = match session {
            Some(conn) => execute_with_binds(&sql, &values, conn).await?,
            None => execute_with_binds(&sql, &values, &self.pool).await?,
        };
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", E::TABLE_NAME, E::PRIMARY_KEY);
        let result =
            execute_with_binds(&sql, &[SqlValue::String(id.to_string())], &self.pool).await?;
        Ok(result.rows_affected())
    }
}
