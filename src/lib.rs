//! # gridcrate
//!
//! Server-side query compilation for paginated, searchable, sortable data
//! grids, built on Sea-ORM's query AST.
//!
//! Given a declarative grid request (ordered column specs, a global
//! keyword, per-column keywords, a sort field and page window, and an
//! optional nested filter tree), the engine mutates a sea-query
//! `SelectStatement` with injection-safe, dialect-aware predicates, joins,
//! ordering and pagination, then executes it (and its count queries) through
//! any `ConnectionTrait` implementor.
//!
//! ## What it compiles
//!
//! - **Global search**: one OR group across the searchable columns per
//!   keyword term ("smart search" splits multi-word keywords into
//!   independent narrowing passes).
//! - **Per-column search**: AND-combined predicates, with regex columns
//!   dispatched to the dialect's regex operator.
//! - **Filter tree**: arbitrary-depth AND/OR groups over a closed table of
//!   fourteen leaf operators.
//! - **Relations**: dotted `relation.column` references resolve against
//!   registered relation metadata: deduplicated LEFT JOINs for column
//!   search and ordering, correlated `EXISTS` probes for global search.
//! - **JSON fields**: dialect-specific path expressions (`col->'$.p'` on
//!   MySQL, `col#>>'{p}'` on Postgres) with an optional OR-combined
//!   fallback column, shared between search and ordering.
//! - **Ordering and paging**: custom handlers, NULLS-LAST emission, JSON
//!   ordering with fallback, offset/limit, and a derived-table `COUNT(*)`
//!   that strips the select list whenever the query shape allows.
//!
//! Per-column behavior is customizable through [`FilterOverride`] /
//! [`OrderOverride`] registrations (either callbacks or named operations
//! from the closed [`BuilderOp`] set), and a blacklist keeps computed
//! columns out of the automatic passes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gridcrate::{EngineConfig, GridRequest, QueryEngine, RelationDef};
//! use sea_orm::DatabaseBackend;
//! use sea_orm::sea_query::{Alias, Asterisk, Query};
//!
//! # async fn list_users(db: sea_orm::DatabaseConnection,
//! #                     params: std::collections::HashMap<String, String>)
//! #     -> Result<(), gridcrate::EngineError> {
//! let request = GridRequest::from_params(
//!     params.get("columns").map_or("[]", String::as_str),
//!     params.get("sort").map(String::as_str),
//!     params.get("search").map(String::as_str),
//!     params.get("filter").map(String::as_str),
//! );
//!
//! let mut base = Query::select();
//! base.column(Asterisk).from(Alias::new("users"));
//!
//! let mut engine = QueryEngine::new(base, "users", request,
//!     DatabaseBackend::Postgres, EngineConfig::default());
//! engine
//!     .relation("company", RelationDef::belongs_to("companies", "company_id", "id"))
//!     .eager_load("company");
//!
//! let page = engine.fetch(&db).await?;
//! println!("{} of {} rows", page.filtered, page.total);
//! # Ok(())
//! # }
//! ```
//!
//! One engine instance is built per request and discarded with it; only
//! [`EngineConfig`] outlives a request, and it is immutable.

pub mod config;
pub mod dialect;
pub mod engine;
pub mod errors;
pub mod models;

pub use config::EngineConfig;
pub use dialect::Dialect;
pub use engine::conditions::FilterNode;
pub use engine::joined::{RelationDef, RelationKind};
pub use engine::overrides::{
    BuilderOp, FilterFn, FilterOverride, OpEffect, OrderFn, OrderOverride, QueryFn,
};
pub use engine::{AddedColumn, GridResponse, QueryEngine, RowFn};
pub use errors::{EngineError, EngineResult};
pub use models::{ColumnSearch, ColumnSpec, GlobalSearch, GridRequest, Orderable, SortSpec};
