//! Shared base layer for CRUD-oriented GraphQL services.
//!
//! - [`entity`]: base columns, the [`Entity`] trait and field projections
//! - [`repository`] / [`service`]: generic CRUD over a [`DataSource`]
//! - [`source`]: the persistence boundary and its SQLite implementation
//! - [`graphql`]: resolver chains with translated errors
//! - [`external`]: service-to-service HTTP client
//!
//! Startup helpers ([`config`], [`logging`], [`db`], [`i18n`]) return
//! `anyhow::Result`; everything else returns [`Result`].

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod external;
pub mod graphql;
pub mod i18n;
pub mod logging;
pub mod query;
pub mod repository;
pub mod service;
pub mod source;
pub mod utils;

pub use config::Config;
pub use db::Database;
pub use entity::{Actor, BaseEntity, ColumnDef, Entity, FieldMap, RecordStatus, SqlValue};
pub use error::{CustomError, Error, ErrorCode, Result};
pub use external::{ExternalService, FetchResult};
pub use i18n::I18n;
pub use query::{
    Condition, Criteria, FilterRequest, FindOptions, ListOptions, OrderDirection, PageInfo,
    PagingResult, Predicate,
};
pub use repository::{BaseRepository, RepositoryOptions};
pub use service::BaseService;
pub use source::{DataSource, SqliteSource};

pub use crudbase_macros::paging_result;
