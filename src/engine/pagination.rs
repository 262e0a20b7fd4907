//! Pagination and row counting.
//!
//! `paging()` converts the request's 1-based page into offset/limit and must
//! be invoked at most once per request: repeated calls re-apply the window
//! (sea-query setter semantics) instead of composing, and `fetch()` upholds
//! the once-per-request contract.
//!
//! `count()` wraps a clone of the current query as a derived table under
//! `SELECT COUNT(*)`. When the clone's SQL carries no `UNION`, `HAVING`,
//! `DISTINCT`, `ORDER BY` or `GROUP BY`, its select list is replaced with a
//! constant literal so the database skips evaluating projection expressions;
//! bindings survive because the wrapping happens on the AST.

use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query, SelectStatement};

use super::QueryEngine;
use crate::errors::EngineResult;

const DEFAULT_PAGE_SIZE: u64 = 10;

/// Select-list replacement is only safe when none of these shape the result
/// set.
const COUNT_UNSAFE_KEYWORDS: [&str; 5] = ["union", "having", "distinct", "order by", "group by"];

impl QueryEngine {
    /// Apply the request's page window to the query.
    ///
    /// `page` values below 1 clamp to offset 0; a page size of 0 falls back
    /// to the default of 10.
    pub fn paging(&mut self) {
        let size = self.request.page_size();
        let effective = if size > 0 { size } else { DEFAULT_PAGE_SIZE };
        let offset = self.request.page().saturating_sub(1) * effective;
        self.query.offset(offset).limit(effective);
    }

    /// The count query for the current compilation state.
    pub(crate) fn build_count_query(&self) -> SelectStatement {
        let mut inner = self.query.clone();
        let sql = self.backend.build(&inner).sql.to_lowercase();
        if !COUNT_UNSAFE_KEYWORDS
            .iter()
            .any(|keyword| sql.contains(keyword))
        {
            inner.clear_selects();
            inner.expr_as(Expr::cust("'1'"), Alias::new("row_count"));
        }

        let mut counter = Query::select();
        counter
            .expr_as(Expr::col(Asterisk).count(), Alias::new("num_rows"))
            .from_subquery(inner, Alias::new("count_row_table"));
        counter
    }

    /// Count the rows the current query would produce.
    pub async fn count<C: ConnectionTrait>(&self, db: &C) -> EngineResult<u64> {
        let statement = self.backend.build(&self.build_count_query());
        let row = db.query_one(statement).await?;
        let count = match row {
            Some(row) => row.try_get::<i64>("", "num_rows")?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// The unfiltered total, counted once per request and cached.
    pub async fn total_count<C: ConnectionTrait>(&mut self, db: &C) -> EngineResult<u64> {
        if let Some(total) = self.total_records {
            return Ok(total);
        }
        let total = self.count(db).await?;
        self.total_records = Some(total);
        Ok(total)
    }
}
