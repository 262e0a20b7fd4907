//! # Grid Query Engine
//!
//! [`QueryEngine`] owns a mutable sea-query [`SelectStatement`] for the
//! duration of one request and compiles the request model into it through
//! side-effecting passes: global search, per-column search, the nested
//! filter tree, ordering, and pagination. Execution is delegated to any
//! [`ConnectionTrait`] implementor at the very end.
//!
//! One engine instance serves exactly one request. Nothing is shared between
//! requests except the immutable [`EngineConfig`](crate::EngineConfig).
//!
//! ```rust,no_run
//! use gridcrate::{EngineConfig, GridRequest, QueryEngine};
//! use sea_orm::DatabaseBackend;
//! use sea_orm::sea_query::{Alias, Asterisk, Query};
//!
//! # async fn demo(db: sea_orm::DatabaseConnection) -> Result<(), gridcrate::EngineError> {
//! let mut base = Query::select();
//! base.column(Asterisk).from(Alias::new("users"));
//!
//! let request = GridRequest::from_params(
//!     r#"[{"name": "name", "data": "name", "searchable": true,
//!          "search": {"value": "", "regex": false}}]"#,
//!     Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 10}"#),
//!     Some(r#"{"value": "alice"}"#),
//!     None,
//! );
//!
//! let engine = QueryEngine::new(base, "users", request, DatabaseBackend::Sqlite,
//!     EngineConfig::default());
//! let response = engine.fetch(&db).await?;
//! println!("{} of {} rows", response.filtered, response.total);
//! # Ok(())
//! # }
//! ```

pub mod conditions;
pub mod joined;
pub mod overrides;
pub mod pagination;
pub mod search;
pub mod sort;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::sea_query::{Alias, Expr, SelectStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, QueryResult};
use serde_json::Value as JsonValue;

use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::errors::EngineResult;
use crate::models::GridRequest;
use joined::RelationDef;
use overrides::{FilterOverride, OrderOverride, QueryFn};

/// Row-content callback for a computed column, applied by the response
/// layer.
pub type RowFn = Arc<dyn Fn(&QueryResult) -> JsonValue + Send + Sync>;

/// A display-only column registered through [`QueryEngine::add_column`].
#[derive(Clone)]
pub struct AddedColumn {
    pub name: String,
    pub content: RowFn,
    /// Insertion position in the rendered row, when the caller cares.
    pub order: Option<usize>,
}

/// Everything the response layer needs: both counts and the page of rows.
pub struct GridResponse {
    /// Unfiltered total across the base query.
    pub total: u64,
    /// Count after search and filter compilation.
    pub filtered: u64,
    pub rows: Vec<QueryResult>,
}

/// Compiles one [`GridRequest`] into an owned query handle.
pub struct QueryEngine {
    pub(crate) query: SelectStatement,
    pub(crate) base_table: String,
    pub(crate) request: GridRequest,
    pub(crate) backend: DatabaseBackend,
    pub(crate) dialect: Dialect,
    pub(crate) config: EngineConfig,
    /// Relation metadata keyed by relation path (`"orders"`,
    /// `"orders.customer"`).
    pub(crate) relations: HashMap<String, RelationDef>,
    /// Relation paths known to be eager-loaded for this query.
    pub(crate) eager_loads: HashSet<String>,
    pub(crate) blacklist: HashSet<String>,
    pub(crate) filter_overrides: HashMap<String, FilterOverride>,
    pub(crate) order_overrides: HashMap<String, OrderOverride>,
    pub(crate) filter_callback: Option<(QueryFn, bool)>,
    pub(crate) order_callback: Option<QueryFn>,
    pub(crate) added_columns: Vec<AddedColumn>,
    /// Tables already joined; consulted before every join emission.
    pub(crate) joined: HashSet<String>,
    pub(crate) total_records: Option<u64>,
    pub(crate) filter_applied: bool,
}

impl QueryEngine {
    /// Take ownership of the query handle for one request.
    ///
    /// `base_table` qualifies bare column references so searches stay
    /// unambiguous once relation joins are in play.
    #[must_use]
    pub fn new(
        query: SelectStatement,
        base_table: impl Into<String>,
        request: GridRequest,
        backend: DatabaseBackend,
        config: EngineConfig,
    ) -> Self {
        let dialect = if config.oracle {
            Dialect::Oracle
        } else {
            Dialect::from_backend(backend)
        };
        let blacklist = config.blacklist.iter().cloned().collect();
        Self {
            query,
            base_table: base_table.into(),
            request,
            backend,
            dialect,
            config,
            relations: HashMap::new(),
            eager_loads: HashSet::new(),
            blacklist,
            filter_overrides: HashMap::new(),
            order_overrides: HashMap::new(),
            filter_callback: None,
            order_callback: None,
            added_columns: Vec::new(),
            joined: HashSet::new(),
            total_records: None,
            filter_applied: false,
        }
    }

    /// Register relation metadata under its dotted path.
    pub fn relation(&mut self, path: impl Into<String>, def: RelationDef) -> &mut Self {
        self.relations.insert(path.into(), def);
        self
    }

    /// Mark a relation path as eager-loaded (joinable/searchable).
    pub fn eager_load(&mut self, path: impl Into<String>) -> &mut Self {
        self.eager_loads.insert(path.into());
        self
    }

    /// Exclude a column from automatic global search and ordering.
    pub fn blacklist_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.blacklist.insert(column.into());
        self
    }

    /// Register a search override for a column. Last registration wins.
    pub fn filter_column(&mut self, column: impl Into<String>, def: FilterOverride) -> &mut Self {
        self.filter_overrides.insert(column.into(), def);
        self
    }

    /// Register an order override for a column. Last registration wins.
    pub fn order_column(&mut self, column: impl Into<String>, def: OrderOverride) -> &mut Self {
        self.order_overrides.insert(column.into(), def);
        self
    }

    /// Run your own filter instead of the automatic search. With
    /// `global_search` set the automatic global search still runs after the
    /// callback.
    pub fn filter(&mut self, callback: QueryFn, global_search: bool) -> &mut Self {
        self.filter_callback = Some((callback, global_search));
        self
    }

    /// Fully override default ordering with a callback over the query
    /// handle.
    pub fn order_callback(&mut self, callback: QueryFn) -> &mut Self {
        self.order_callback = Some(callback);
        self
    }

    /// Register a computed/display-only column. The name is blacklisted so
    /// automatic search and ordering never touch a column the database
    /// cannot resolve.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        content: RowFn,
        order: Option<usize>,
    ) -> &mut Self {
        let name = name.into();
        self.blacklist.insert(name.clone());
        self.added_columns.push(AddedColumn {
            name,
            content,
            order,
        });
        self
    }

    #[must_use]
    pub fn added_columns(&self) -> &[AddedColumn] {
        &self.added_columns
    }

    #[must_use]
    pub fn request(&self) -> &GridRequest {
        &self.request
    }

    /// The query handle in its current compilation state.
    #[must_use]
    pub fn query(&self) -> &SelectStatement {
        &self.query
    }

    #[must_use]
    pub fn into_query(self) -> SelectStatement {
        self.query
    }

    pub(crate) fn has_custom_filter(&self, column: &str) -> bool {
        self.filter_overrides.contains_key(column)
    }

    pub(crate) fn is_blacklisted(&self, column: &str) -> bool {
        self.blacklist.contains(column)
    }

    /// Qualify a bare column with `table` so joined queries stay
    /// unambiguous; dotted references pass through unchanged.
    pub(crate) fn qualify(column: &str, table: &str) -> String {
        if column.contains('.') || table.is_empty() {
            column.to_string()
        } else {
            format!("{table}.{column}")
        }
    }

    /// Execute the compiled query and hand the raw rows back.
    pub async fn results<C: ConnectionTrait>(&self, db: &C) -> EngineResult<Vec<QueryResult>> {
        let statement = self.backend.build(&self.query);
        Ok(db.query_all(statement).await?)
    }

    /// Run the full compile-and-execute cycle: total count, search passes,
    /// filter tree, filtered count, ordering, pagination, rows.
    pub async fn fetch<C: ConnectionTrait>(mut self, db: &C) -> EngineResult<GridResponse> {
        self.request.check_parameters()?;

        let total = self.total_count(db).await?;

        if let Some((callback, with_global_search)) = self.filter_callback.take() {
            callback(&mut self.query);
            self.filter_applied = true;
            if with_global_search && self.request.is_searchable() {
                self.filtering()?;
            }
        } else if self.request.is_searchable() {
            self.filtering()?;
        }

        self.column_search()?;
        self.multi_column_filter()?;

        let filtered = if self.filter_applied {
            self.count(db).await?
        } else {
            total
        };

        if self.request.is_orderable() {
            self.ordering()?;
        }
        if self.request.is_paginationable() {
            self.paging();
        }

        let rows = self.results(db).await?;
        Ok(GridResponse {
            total,
            filtered,
            rows,
        })
    }
}

/// Column expression for a possibly qualified reference.
pub(crate) fn column_expr(name: &str) -> Expr {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [table, column] => Expr::col((Alias::new(*table), Alias::new(*column))),
        [schema, table, column] => Expr::col((
            Alias::new(*schema),
            Alias::new(*table),
            Alias::new(*column),
        )),
        _ => Expr::col(Alias::new(name)),
    }
}
