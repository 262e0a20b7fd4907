//! Global and per-column search compilation.
//!
//! Global search builds one OR group across every searchable column per
//! pass; smart search splits the keyword on whitespace and runs one pass per
//! term, so successive `cond_where` calls narrow the result set term by
//! term. Per-column search AND-combines a single predicate per column.
//!
//! Column dispatch order, identical for both passes: blacklist (an override
//! wins over the blacklist), custom override (callback or named operation),
//! relation probe for eager-loaded dotted references, then plain or
//! JSON-path compilation. Keywords always travel as bound values.

use sea_orm::sea_query::{Cond, Expr, SimpleExpr};

use super::overrides::{self, FilterOverride, OpEffect};
use super::QueryEngine;
use crate::config::EngineConfig;
use crate::errors::EngineResult;

impl QueryEngine {
    /// Global search pass over the free-text keyword.
    pub fn filtering(&mut self) -> EngineResult<()> {
        let keyword = self.request.keyword().to_string();

        if self.config.smart_search {
            let terms: Vec<String> = keyword.split_whitespace().map(str::to_string).collect();
            for term in terms {
                self.global_search(&term)?;
            }
            return Ok(());
        }

        self.global_search(&keyword)
    }

    /// One OR-group pass for a single term.
    fn global_search(&mut self, keyword: &str) -> EngineResult<()> {
        let mut group = Cond::any();
        let mut matched = false;

        for index in self.request.searchable_column_indexes() {
            let column = self.request.column_name(index).to_string();
            if self.is_blacklisted(&column) && !self.has_custom_filter(&column) {
                continue;
            }

            if let Some(def) = self.filter_overrides.get(&column).cloned() {
                if !def.applies_to_global_search() {
                    continue;
                }
                match def {
                    FilterOverride::Callback(callback) => {
                        group = group.add(overrides::nested_scope(&callback, keyword));
                    }
                    FilterOverride::Op { op, params } => {
                        let params = overrides::substitute_keyword(
                            overrides::strip_exemption_marker(&params),
                            keyword,
                        );
                        match op.build(&column, &params, keyword) {
                            Some(OpEffect::Predicate(expr)) => group = group.add(expr),
                            Some(OpEffect::Order(_)) => {
                                tracing::warn!(
                                    column,
                                    "order operation registered as a filter override; skipping"
                                );
                                continue;
                            }
                            None => continue,
                        }
                    }
                }
            } else if let Some((relation, relation_column)) = Self::split_relation(&column) {
                if self.eager_loads.contains(relation) {
                    group = group.add(self.compile_relation_search(
                        relation,
                        relation_column,
                        keyword,
                        index,
                    )?);
                } else {
                    group =
                        group.add(self.compile_query_search(&column, keyword, index, &self.base_table)?);
                }
            } else {
                group =
                    group.add(self.compile_query_search(&column, keyword, index, &self.base_table)?);
            }

            matched = true;
        }

        if matched {
            self.query.cond_where(group);
            self.filter_applied = true;
        }
        Ok(())
    }

    /// Per-column search pass: one AND-combined predicate per column with a
    /// non-empty keyword.
    pub fn column_search(&mut self) -> EngineResult<()> {
        for index in 0..self.request.columns.len() {
            if !self.request.is_column_searchable(index, true) {
                continue;
            }
            let column = self.request.column_name(index).to_string();
            // Overrides and regex columns receive the raw keyword.
            let keyword = self.request.column_keyword(index).to_string();

            if let Some(def) = self.filter_overrides.get(&column).cloned() {
                match def {
                    FilterOverride::Callback(callback) => {
                        let scope = overrides::nested_scope(&callback, &keyword);
                        self.query.cond_where(scope);
                    }
                    FilterOverride::Op { op, params } => {
                        let params = overrides::substitute_keyword(
                            overrides::strip_exemption_marker(&params),
                            &keyword,
                        );
                        match op.build(&column, &params, &keyword) {
                            Some(OpEffect::Predicate(expr)) => {
                                self.query.and_where(expr);
                            }
                            Some(OpEffect::Order(_)) => {
                                tracing::warn!(
                                    column,
                                    "order operation registered as a filter override; skipping"
                                );
                                continue;
                            }
                            None => continue,
                        }
                    }
                }
            } else {
                let mut target = column;
                let relation_parts = Self::split_relation(&target)
                    .map(|(relation, column)| (relation.to_string(), column.to_string()));
                if let Some((relation, relation_column)) = relation_parts {
                    if self.eager_loads.contains(&relation) {
                        target = self.join_eager_loaded_column(&relation, &relation_column)?;
                    }
                }

                if self.request.is_regex(index) {
                    let expr = self.regex_search_expr(&target, &keyword);
                    self.query.and_where(expr);
                } else {
                    let expr =
                        self.compile_query_search(&target, &keyword, index, &self.base_table)?;
                    self.query.and_where(expr);
                }
            }

            self.filter_applied = true;
        }
        Ok(())
    }

    /// Dispatch between plain and JSON-path compilation for one column.
    pub(crate) fn compile_query_search(
        &self,
        column: &str,
        keyword: &str,
        index: usize,
        table: &str,
    ) -> EngineResult<SimpleExpr> {
        match self.request.json_path(index) {
            Some(path) => {
                let path = path.to_string();
                self.compile_json_search(column, keyword, &path, index, table)
            }
            None => Ok(self.compile_normal_search(column, keyword, table)),
        }
    }

    fn compile_normal_search(&self, column: &str, keyword: &str, table: &str) -> SimpleExpr {
        let column = self.dialect.wrap(&Self::qualify(column, table));
        let column = self.dialect.cast_text(&column);
        let sql = if self.config.case_insensitive {
            format!("LOWER({column}) LIKE ?")
        } else {
            format!("{column} LIKE ?")
        };
        Expr::cust_with_values(sql, [prepare_keyword(keyword, &self.config)])
    }

    /// JSON-path search, optionally OR-ed with a declared fallback column.
    /// Binds the prepared keyword once without a fallback, twice with one.
    pub(crate) fn compile_json_search(
        &self,
        column: &str,
        keyword: &str,
        path: &str,
        index: usize,
        table: &str,
    ) -> EngineResult<SimpleExpr> {
        let qualified = Self::qualify(column, table);
        let json_expr = self
            .dialect
            .cast_text(&self.dialect.json_path_expr(&qualified, path)?);
        let json_sql = if self.config.case_insensitive {
            format!("LOWER({json_expr}) LIKE ?")
        } else {
            format!("{json_expr} LIKE ?")
        };
        let prepared = prepare_keyword(keyword, &self.config);

        match self.request.fallback(index) {
            None => Ok(Expr::cust_with_values(json_sql, [prepared])),
            Some(fallback) => {
                let fallback_expr = self.dialect.cast_text(&self.dialect.wrap(fallback));
                let fallback_sql = if self.config.case_insensitive {
                    format!("LOWER({fallback_expr}) LIKE ?")
                } else {
                    format!("{fallback_expr} LIKE ?")
                };
                Ok(Expr::cust_with_values(
                    format!("({json_sql} OR {fallback_sql})"),
                    [prepared.clone(), prepared],
                ))
            }
        }
    }

    /// Regex predicate in the dialect's syntax, keyword bound.
    pub(crate) fn regex_search_expr(&self, column: &str, keyword: &str) -> SimpleExpr {
        let wrapped = self.dialect.wrap(&Self::qualify(column, &self.base_table));
        let (sql, bound) =
            self.dialect
                .regex_predicate(&wrapped, keyword, self.config.case_insensitive);
        Expr::cust_with_values(sql, [bound])
    }
}

/// Prepare a search keyword: case folding, then wildcard expansion, then
/// smart-search substring wrapping. The three flags compose independently.
pub(crate) fn prepare_keyword(keyword: &str, config: &EngineConfig) -> String {
    let mut keyword = keyword.to_string();
    if config.case_insensitive {
        keyword = keyword.to_lowercase();
    }
    if config.wildcards {
        keyword = expand_wildcards(&keyword);
    }
    if config.smart_search {
        keyword = format!("%{keyword}%");
    }
    keyword
}

/// Translate user-facing wildcards into SQL pattern syntax.
fn expand_wildcards(keyword: &str) -> String {
    keyword.replace('*', "%").replace('?', "_")
}
