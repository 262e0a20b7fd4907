//! Per-column override registration and dispatch.
//!
//! An override replaces the automatic predicate (or ORDER BY clause) for one
//! column. It is either an opaque callback, or a named query-builder
//! operation drawn from the closed [`BuilderOp`] set with a parameter
//! template. Dispatch goes through an explicit match; there is no
//! string-keyed method invocation anywhere.
//!
//! Inside a parameter template the literal `"$1"` stands for the current
//! keyword (the sort direction, for order overrides). A trailing literal
//! `false` marks a filter override as exempt from global search.

use sea_orm::sea_query::{Cond, Condition, Expr, ExprTrait, SelectStatement, SimpleExpr, Value};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::column_expr;

/// Filter callback: receives a fresh predicate scope and the keyword,
/// returns the populated scope.
pub type FilterFn = Arc<dyn Fn(Condition, &str) -> Condition + Send + Sync>;

/// Order callback: receives the query handle and the requested direction.
pub type OrderFn = Arc<dyn Fn(&mut SelectStatement, &str) + Send + Sync>;

/// Manual-filter / global-order callback over the whole query handle.
pub type QueryFn = Arc<dyn Fn(&mut SelectStatement) + Send + Sync>;

/// Override for a column's search compilation.
#[derive(Clone)]
pub enum FilterOverride {
    Callback(FilterFn),
    Op { op: BuilderOp, params: Vec<JsonValue> },
}

impl FilterOverride {
    /// Global search applies unless the parameter template trails a literal
    /// `false`.
    #[must_use]
    pub fn applies_to_global_search(&self) -> bool {
        match self {
            Self::Callback(_) => true,
            Self::Op { params, .. } => {
                params.is_empty() || params.last() != Some(&JsonValue::Bool(false))
            }
        }
    }
}

/// Override for a column's order compilation.
#[derive(Clone)]
pub enum OrderOverride {
    Callback(OrderFn),
    Op { op: BuilderOp, params: Vec<JsonValue> },
}

/// Closed set of query-builder operations a named override may invoke.
///
/// `Or*` variants exist so registrations can state their combinator intent;
/// the enclosing compilation pass decides the actual combinator (OR groups
/// for global search, AND for per-column search).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderOp {
    Where,
    OrWhere,
    WhereRaw,
    OrWhereRaw,
    WhereIn,
    OrWhereIn,
    WhereNull,
    OrWhereNull,
    WhereNotNull,
    OrWhereNotNull,
    OrderByExpr,
}

/// What a named operation contributes to the query.
pub enum OpEffect {
    /// A predicate to combine into the active scope.
    Predicate(SimpleExpr),
    /// An ORDER BY expression; the direction is appended by the order
    /// compiler from the sort spec.
    Order(SimpleExpr),
}

impl BuilderOp {
    /// Resolve an operation token. Accepts the builder-style camelCase
    /// spelling and the snake_case one.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "where" => Some(Self::Where),
            "orWhere" | "or_where" => Some(Self::OrWhere),
            "whereRaw" | "where_raw" => Some(Self::WhereRaw),
            "orWhereRaw" | "or_where_raw" => Some(Self::OrWhereRaw),
            "whereIn" | "where_in" => Some(Self::WhereIn),
            "orWhereIn" | "or_where_in" => Some(Self::OrWhereIn),
            "whereNull" | "where_null" => Some(Self::WhereNull),
            "orWhereNull" | "or_where_null" => Some(Self::OrWhereNull),
            "whereNotNull" | "where_not_null" => Some(Self::WhereNotNull),
            "orWhereNotNull" | "or_where_not_null" => Some(Self::OrWhereNotNull),
            "orderByExpr" | "order_by_expr" | "orderByRaw" | "order_by_raw" => {
                Some(Self::OrderByExpr)
            }
            _ => None,
        }
    }

    /// Maximum parameter count the operation accepts (the column itself is
    /// implicit and not counted).
    #[must_use]
    pub fn max_params(self) -> usize {
        match self {
            Self::Where | Self::OrWhere | Self::WhereRaw | Self::OrWhereRaw => 2,
            Self::WhereIn | Self::OrWhereIn | Self::OrderByExpr => 1,
            Self::WhereNull | Self::OrWhereNull | Self::WhereNotNull | Self::OrWhereNotNull => 0,
        }
    }

    /// Build the operation's effect for `column` with the already
    /// keyword-substituted `params`.
    ///
    /// Malformed templates (arity overflow, wrong parameter shapes) are
    /// logged and yield `None`; compilation of the remaining columns
    /// proceeds.
    #[must_use]
    pub fn build(self, column: &str, params: &[JsonValue], keyword: &str) -> Option<OpEffect> {
        if params.len() > self.max_params() {
            tracing::warn!(
                op = ?self,
                column,
                given = params.len(),
                max = self.max_params(),
                "override parameter count exceeds the operation arity; skipping"
            );
            return None;
        }

        match self {
            Self::Where | Self::OrWhere => build_where(column, params, keyword),
            Self::WhereRaw | Self::OrWhereRaw => build_raw(column, params),
            Self::WhereIn | Self::OrWhereIn => build_in(column, params),
            Self::WhereNull | Self::OrWhereNull => {
                Some(OpEffect::Predicate(column_expr(column).is_null()))
            }
            Self::WhereNotNull | Self::OrWhereNotNull => {
                Some(OpEffect::Predicate(column_expr(column).is_not_null()))
            }
            Self::OrderByExpr => {
                let Some(JsonValue::String(sql)) = params.first() else {
                    tracing::warn!(column, "order override template must be a SQL string");
                    return None;
                };
                Some(OpEffect::Order(Expr::cust(sql.clone())))
            }
        }
    }
}

fn build_where(column: &str, params: &[JsonValue], keyword: &str) -> Option<OpEffect> {
    let column = column_expr(column);
    let expr = match params {
        [] => column.eq(keyword),
        [value] => column.eq(bind_value(value)),
        [JsonValue::String(operator), value] => {
            let value = bind_value(value);
            match operator.as_str() {
                "=" => column.eq(value),
                "<>" | "!=" => column.ne(value),
                ">" => column.gt(value),
                ">=" => column.gte(value),
                "<" => column.lt(value),
                "<=" => column.lte(value),
                "like" => column.like(like_operand(value)?),
                "not like" => column.not_like(like_operand(value)?),
                other => {
                    tracing::warn!(operator = other, "unknown comparison in where override");
                    return None;
                }
            }
        }
        _ => {
            tracing::warn!("where override expects (operator, value) parameters");
            return None;
        }
    };
    Some(OpEffect::Predicate(expr))
}

fn build_raw(column: &str, params: &[JsonValue]) -> Option<OpEffect> {
    let Some(JsonValue::String(sql)) = params.first() else {
        tracing::warn!(column, "raw override requires a SQL template string");
        return None;
    };
    let expr = match params.get(1) {
        None => Expr::cust(sql.clone()),
        Some(JsonValue::Array(bindings)) => {
            Expr::cust_with_values(sql.clone(), bindings.iter().map(bind_value))
        }
        Some(single) => Expr::cust_with_values(sql.clone(), [bind_value(single)]),
    };
    Some(OpEffect::Predicate(expr))
}

fn build_in(column: &str, params: &[JsonValue]) -> Option<OpEffect> {
    let Some(JsonValue::Array(values)) = params.first() else {
        tracing::warn!(column, "whereIn override requires an array parameter");
        return None;
    };
    Some(OpEffect::Predicate(
        column_expr(column).is_in(values.iter().map(bind_value)),
    ))
}

fn like_operand(value: Value) -> Option<String> {
    match value {
        Value::String(Some(s)) => Some(*s),
        _ => {
            tracing::warn!("like override requires a string pattern");
            None
        }
    }
}

/// Convert a JSON template value into a bound query value.
pub(crate) fn bind_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::String(s) => s.clone().into(),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => n
            .as_i64()
            .map_or_else(|| n.as_f64().unwrap_or_default().into(), Into::into),
        JsonValue::Null => Value::String(None),
        other => {
            tracing::warn!(value = %other, "unsupported override parameter; binding as text");
            other.to_string().into()
        }
    }
}

/// Replace the `"$1"` keyword placeholder throughout a parameter template,
/// recursing into arrays (binding lists).
#[must_use]
pub fn substitute_keyword(params: &[JsonValue], keyword: &str) -> Vec<JsonValue> {
    params
        .iter()
        .map(|param| substitute_one(param, keyword))
        .collect()
}

fn substitute_one(param: &JsonValue, keyword: &str) -> JsonValue {
    match param {
        JsonValue::String(s) if s.contains("$1") => {
            JsonValue::String(s.replace("$1", keyword))
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| substitute_one(item, keyword))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Drop the trailing `false` search-exemption marker before dispatch.
#[must_use]
pub fn strip_exemption_marker(params: &[JsonValue]) -> &[JsonValue] {
    match params.split_last() {
        Some((JsonValue::Bool(false), rest)) => rest,
        _ => params,
    }
}

/// A nested predicate scope built by a filter callback, attached into the
/// caller's group.
#[must_use]
pub fn nested_scope(callback: &FilterFn, keyword: &str) -> Condition {
    callback(Cond::all(), keyword)
}
