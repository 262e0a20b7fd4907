//! Order compilation for the single active sort field.
//!
//! Resolution order: the engine-wide order callback wins outright; then the
//! blacklist (an order override wins over it); then per-column overrides;
//! then relation resolution for dotted references; finally JSON-path,
//! NULLS-LAST or plain emission. Any direction value other than the literal
//! `"asc"` sorts descending.

use sea_orm::sea_query::{Expr, NullOrdering, Order};

use super::overrides::{self, OpEffect, OrderOverride};
use super::{QueryEngine, column_expr};
use crate::errors::EngineResult;

impl QueryEngine {
    /// Compile the ORDER BY clause for the request's sort spec.
    pub fn ordering(&mut self) -> EngineResult<()> {
        if let Some(callback) = self.order_callback.clone() {
            callback(&mut self.query);
            return Ok(());
        }

        let Some(orderable) = self.request.orderable() else {
            return Ok(());
        };
        let column = orderable.column.clone();
        let direction = orderable.direction();
        let order = if direction == "asc" {
            Order::Asc
        } else {
            Order::Desc
        };

        if self.is_blacklisted(&column) && !self.order_overrides.contains_key(&column) {
            return Ok(());
        }

        if let Some(def) = self.order_overrides.get(&column).cloned() {
            match def {
                OrderOverride::Callback(callback) => callback(&mut self.query, direction),
                OrderOverride::Op { op, params } => {
                    let params = overrides::substitute_keyword(
                        overrides::strip_exemption_marker(&params),
                        direction,
                    );
                    match op.build(&column, &params, direction) {
                        Some(OpEffect::Order(expr)) => {
                            self.query.order_by_expr(expr, order);
                        }
                        // Predicate operations behave exactly as they do in
                        // filter dispatch.
                        Some(OpEffect::Predicate(expr)) => {
                            self.query.and_where(expr);
                        }
                        None => {}
                    }
                }
            }
            return Ok(());
        }

        let mut target = column;
        let relation_parts = Self::split_relation(&target)
            .map(|(relation, column)| (relation.to_string(), column.to_string()));
        if let Some((relation, relation_column)) = relation_parts {
            if self.eager_loads.contains(&relation) {
                // Join-based resolution applies when at least one path
                // segment is not polymorphic-many-to-many; a path made only
                // of polymorphic segments cannot be ordered and is skipped.
                let chain = self.relation_chain(&relation)?;
                if chain.iter().any(|def| !def.is_morph_to_many()) {
                    target = self.join_eager_loaded_column(&relation, &relation_column)?;
                } else {
                    tracing::debug!(
                        column = target,
                        "sort path resolves only through polymorphic relations; skipping order"
                    );
                    return Ok(());
                }
            }
        }

        if let Some(json_path) = orderable.json.as_deref() {
            let json_expr = Expr::cust(self.dialect.json_path_expr(&target, json_path)?);
            self.query.order_by_expr(json_expr, order.clone());
            if let Some(fallback) = orderable.fallback.as_deref() {
                self.query
                    .order_by_expr(Expr::cust(self.dialect.wrap(fallback)), order);
            }
        } else if self.config.nulls_last {
            self.query
                .order_by_expr_with_nulls(column_expr(&target).into(), order, NullOrdering::Last);
        } else {
            self.query.order_by_expr(column_expr(&target).into(), order);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::QueryEngine;
    use crate::engine::overrides::{BuilderOp, OrderOverride};
    use crate::models::GridRequest;
    use crate::{EngineConfig, RelationDef};
    use sea_orm::DatabaseBackend;
    use sea_orm::sea_query::{
        Alias, Asterisk, MysqlQueryBuilder, PostgresQueryBuilder, Query, SelectStatement,
    };
    use std::sync::Arc;

    fn engine_sorting(columns: &str, sort: &str, backend: DatabaseBackend) -> QueryEngine {
        let mut base = Query::select();
        base.column(Asterisk).from(Alias::new("users"));
        let request = GridRequest::from_params(columns, Some(sort), None, None);
        QueryEngine::new(base, "users", request, backend, EngineConfig::default())
    }

    const AGE: &str = r#"[{"name": "age", "data": "age", "searchable": false}]"#;
    const AGE_DESC: &str = r#"{"sortBy": "age", "descending": true, "page": 1, "rowsPerPage": 10}"#;

    #[test]
    fn plain_sort_emits_column_and_direction() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::MySql);
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(sql.contains("ORDER BY `age` DESC"), "unexpected sql: {sql}");
    }

    #[test]
    fn non_asc_direction_reads_as_descending() {
        let sort = r#"{"sortBy": "age", "descending": false, "page": 1, "rowsPerPage": 10}"#;
        let mut engine = engine_sorting(AGE, sort, DatabaseBackend::MySql);
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(sql.contains("ORDER BY `age` ASC"), "unexpected sql: {sql}");
    }

    #[test]
    fn nulls_last_emission_on_postgres() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::Postgres);
        engine.config.nulls_last = true;
        engine.ordering().unwrap();
        let sql = engine.query().to_string(PostgresQueryBuilder);
        assert!(
            sql.contains(r#"ORDER BY "age" DESC NULLS LAST"#),
            "unexpected sql: {sql}"
        );
    }

    #[test]
    fn json_sort_with_fallback_orders_both_in_direction() {
        let columns = r#"[{"name": "city", "data": "meta",
            "json": "address.city", "fallback": "city_plain"}]"#;
        let sort = r#"{"sortBy": "city", "descending": true, "page": 1, "rowsPerPage": 10}"#;
        let mut engine = engine_sorting(columns, sort, DatabaseBackend::MySql);
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(
            sql.contains("ORDER BY `city`->'$.address.city' DESC, `city_plain` DESC"),
            "unexpected sql: {sql}"
        );
    }

    #[test]
    fn blacklisted_sort_column_is_skipped_without_override() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::MySql);
        engine.blacklist_column("age");
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn order_override_beats_the_blacklist() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::MySql);
        engine.blacklist_column("age").order_column(
            "age",
            OrderOverride::Op {
                op: BuilderOp::OrderByExpr,
                params: vec![serde_json::json!("LENGTH(`age`)")],
            },
        );
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(
            sql.contains("ORDER BY LENGTH(`age`) DESC"),
            "unexpected sql: {sql}"
        );
    }

    #[test]
    fn order_callback_overrides_everything() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::MySql);
        engine.order_callback(Arc::new(|query: &mut SelectStatement| {
            query.order_by_expr(
                sea_orm::sea_query::Expr::cust("RANDOM()"),
                sea_orm::sea_query::Order::Asc,
            );
        }));
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(sql.contains("ORDER BY RANDOM() ASC"));
        assert!(!sql.contains("`age` DESC"));
    }

    #[test]
    fn order_callback_receives_direction() {
        let mut engine = engine_sorting(AGE, AGE_DESC, DatabaseBackend::MySql);
        engine.order_column(
            "age",
            OrderOverride::Callback(Arc::new(|query: &mut SelectStatement, direction: &str| {
                assert_eq!(direction, "desc");
                query.order_by_expr(
                    sea_orm::sea_query::Expr::cust("`age` IS NULL"),
                    sea_orm::sea_query::Order::Asc,
                );
            })),
        );
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(sql.contains("`age` IS NULL"));
    }

    #[test]
    fn eager_relation_sort_joins_and_qualifies() {
        let columns = r#"[{"name": "customer.name", "data": "customer.name"}]"#;
        let sort =
            r#"{"sortBy": "customer.name", "descending": false, "page": 1, "rowsPerPage": 10}"#;
        let mut engine = engine_sorting(columns, sort, DatabaseBackend::MySql);
        engine
            .relation(
                "customer",
                RelationDef::belongs_to("customers", "customer_id", "id"),
            )
            .eager_load("customer");
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(sql.contains("LEFT JOIN `customers`"));
        assert!(
            sql.contains("ORDER BY `customers`.`name` ASC"),
            "unexpected sql: {sql}"
        );
    }

    #[test]
    fn purely_polymorphic_sort_path_is_skipped() {
        let columns = r#"[{"name": "tags.label", "data": "tags.label"}]"#;
        let sort = r#"{"sortBy": "tags.label", "descending": false, "page": 1, "rowsPerPage": 10}"#;
        let mut engine = engine_sorting(columns, sort, DatabaseBackend::MySql);
        engine
            .relation(
                "tags",
                crate::RelationDef {
                    table: "tags".to_string(),
                    kind: crate::RelationKind::MorphToMany {
                        pivot_table: "taggables".to_string(),
                        pivot_foreign_key: "taggable_id".to_string(),
                        parent_key: "id".to_string(),
                        pivot_related_key: "tag_id".to_string(),
                        related_key: "id".to_string(),
                        morph_type_column: "taggable_type".to_string(),
                        morph_class: "users".to_string(),
                    },
                },
            )
            .eager_load("tags");
        engine.ordering().unwrap();
        let sql = engine.query().to_string(MysqlQueryBuilder);
        assert!(!sql.contains("ORDER BY"), "unexpected sql: {sql}");
        assert!(!sql.contains("LEFT JOIN"));
    }
}
