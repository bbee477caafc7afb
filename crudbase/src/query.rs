//! Query model shared by the repository and data sources.
//!
//! A where-clause is a list of [`Condition`]s joined with OR; each condition
//! is a set of column predicates joined with AND. Data sources render this
//! model to SQL and validate every column name against the entity.

use std::collections::BTreeMap;

use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

use crate::entity::SqlValue;

/// Page size used when a request does not ask for a positive one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound for any requested page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Column used when no valid order is requested.
pub const DEFAULT_ORDER_FIELD: &str = "created_at";

// ============================================================================
// Ordering
// ============================================================================

/// Order direction for sorting
#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    /// Ascending (A-Z, 0-9, oldest-newest)
    Asc,
    /// Descending (Z-A, 9-0, newest-oldest)
    #[default]
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// `(field, direction)`
pub type OrderTuple = (String, OrderDirection);

/// The order applied when a request names no known column.
pub fn default_order() -> Vec<OrderTuple> {
    vec![(DEFAULT_ORDER_FIELD.to_string(), OrderDirection::Desc)]
}

/// GraphQL form of an [`OrderTuple`].
#[derive(InputObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInput {
    pub field: String,
    #[graphql(default)]
    #[serde(default)]
    pub direction: OrderDirection,
}

impl From<OrderInput> for OrderTuple {
    fn from(input: OrderInput) -> Self {
        (input.field, input.direction)
    }
}

// ============================================================================
// Predicates and conditions
// ============================================================================

/// A test applied to a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value` (`IS NULL` for [`SqlValue::Null`])
    Eq(SqlValue),
    /// `column <> value` (`IS NOT NULL` for [`SqlValue::Null`])
    Ne(SqlValue),
    /// `column IN (...)`; an empty list matches nothing
    In(Vec<SqlValue>),
    Gt(SqlValue),
    Gte(SqlValue),
    Lt(SqlValue),
    Lte(SqlValue),
    /// Case-insensitive literal substring match, Unicode-aware. Rendered
    /// with `REGEXP`, so the connection must register it (see
    /// [`Database`](crate::db::Database)).
    Contains(String),
}

impl Predicate {
    pub fn eq(value: impl Into<SqlValue>) -> Self {
        Predicate::Eq(value.into())
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Predicate::Contains(needle.into())
    }

    pub fn one_of<V: Into<SqlValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In(values.into_iter().map(Into::into).collect())
    }

    /// Render against `column`, returning the SQL fragment and its binds.
    pub fn to_sql(&self, column: &str) -> (String, Vec<SqlValue>) {
        let cmp = |op: &str, v: &SqlValue| (format!("{} {} ?", column, op), vec![v.clone()]);

        match self {
            Predicate::Eq(SqlValue::Null) => (format!("{} IS NULL", column), vec![]),
            Predicate::Ne(SqlValue::Null) => (format!("{} IS NOT NULL", column), vec![]),
            Predicate::Eq(v) => cmp("=", v),
            Predicate::Ne(v) => cmp("<>", v),
            Predicate::Gt(v) => cmp(">", v),
            Predicate::Gte(v) => cmp(">=", v),
            Predicate::Lt(v) => cmp("<", v),
            Predicate::Lte(v) => cmp("<=", v),
            Predicate::In(values) if values.is_empty() => ("1 = 0".to_string(), vec![]),
            Predicate::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                (format!("{} IN ({})", column, placeholders), values.clone())
            }
            Predicate::Contains(needle) => (
                format!("{} REGEXP ?", column),
                vec![SqlValue::String(contains_pattern(needle))],
            ),
        }
    }
}

/// Case-insensitive pattern matching `needle` literally anywhere in the
/// value. `(?i)` folds case by Unicode rules, unlike SQLite's `LOWER`/`LIKE`.
pub fn contains_pattern(needle: &str) -> String {
    format!("(?i){}", regex::escape(needle))
}

/// Column predicates joined with AND. One predicate per column; later
/// inserts replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition(BTreeMap<String, Predicate>);

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a condition with a single equality predicate.
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::new().and(column, Predicate::eq(value))
    }

    pub fn and(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.insert(column, predicate);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, predicate: Predicate) {
        self.0.insert(column.into(), predicate);
    }

    /// Right-biased merge: predicates in `other` replace those on the same column.
    pub fn merged(mut self, other: &Condition) -> Self {
        for (column, predicate) in &other.0 {
            self.0.insert(column.clone(), predicate.clone());
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Render as an AND group. An empty condition matches everything.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        if self.0.is_empty() {
            return ("1 = 1".to_string(), vec![]);
        }

        let mut clauses = Vec::with_capacity(self.0.len());
        let mut values = Vec::new();
        for (column, predicate) in &self.0 {
            let (clause, binds) = predicate.to_sql(column);
            clauses.push(clause);
            values.extend(binds);
        }
        (clauses.join(" AND "), values)
    }
}

/// Target of bulk updates (`set_status`, `remove`).
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Id(String),
    Ids(Vec<String>),
    Where(Condition),
}

impl Criteria {
    pub fn id(id: impl Into<String>) -> Self {
        Criteria::Id(id.into())
    }

    pub fn ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Criteria::Ids(ids.into_iter().map(Into::into).collect())
    }

    pub fn to_condition(&self) -> Condition {
        match self {
            Criteria::Id(id) => Condition::eq("id", id.as_str()),
            Criteria::Ids(ids) => {
                Condition::new().and("id", Predicate::one_of(ids.iter().map(String::as_str)))
            }
            Criteria::Where(condition) => condition.clone(),
        }
    }
}

impl From<Condition> for Criteria {
    fn from(condition: Condition) -> Self {
        Criteria::Where(condition)
    }
}

// ============================================================================
// Find / list options
// ============================================================================

/// Options understood by data sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Alternatives joined with OR; empty means no filter
    pub conditions: Vec<Condition>,
    pub order: Vec<OrderTuple>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new().or_where(Condition::eq("id", id))
    }

    /// Add an OR alternative.
    pub fn or_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }
}

/// Filter, search, paging and order request as received from clients.
#[derive(InputObject, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[graphql(name = "FilterInput")]
#[serde(default)]
pub struct FilterRequest {
    pub search_value: Option<String>,
    /// Zero-based page index
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub orders: Option<Vec<OrderInput>>,
}

/// Input of `list` / `list_with_paging`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Caller filter; `order` here takes precedence over `orders`
    pub options: FindOptions,
    pub search_value: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Requested order; unknown columns are dropped
    pub orders: Option<Vec<OrderTuple>>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn or_where(mut self, condition: Condition) -> Self {
        self.options.conditions.push(condition);
        self
    }

    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search_value = Some(value.into());
        self
    }

    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn orders(mut self, orders: Vec<OrderTuple>) -> Self {
        self.orders = Some(orders);
        self
    }
}

impl From<FilterRequest> for ListOptions {
    fn from(filter: FilterRequest) -> Self {
        Self {
            options: FindOptions::default(),
            search_value: filter.search_value,
            page: filter.page,
            page_size: filter.page_size,
            orders: filter
                .orders
                .map(|orders| orders.into_iter().map(OrderTuple::from).collect()),
        }
    }
}

// ============================================================================
// Paging
// ============================================================================

/// Effective paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub page_size: i64,
    pub skip: i64,
    pub take: i64,
}

impl Paging {
    /// A positive `page_size` is capped at `max_page_size`; anything else
    /// falls back to `default_page_size`. Negative pages clamp to zero.
    pub fn resolve(
        page: Option<i64>,
        page_size: Option<i64>,
        default_page_size: i64,
        max_page_size: i64,
    ) -> Self {
        let page = page.unwrap_or(0).max(0);
        let page_size = match page_size {
            Some(size) if size > 0 => size.min(max_page_size),
            _ => default_page_size,
        };

        Self {
            page,
            page_size,
            skip: page.saturating_mul(page_size),
            take: page_size,
        }
    }
}

/// Echo of the effective filter.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFilter {
    pub page: i64,
    pub page_size: i64,
    pub search_value: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub filter: PageFilter,
    pub total_count: i64,
}

/// One page of records. Use `paging_result!` for a GraphQL object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingResult<T> {
    pub data: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> PagingResult<T> {
    pub fn total_count(&self) -> i64 {
        self.page_info.total_count
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagingResult<U> {
        PagingResult {
            data: self.data.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}
