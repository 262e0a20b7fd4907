//! Nested multi-field filter compilation.
//!
//! The request may carry an arbitrary-depth tree of AND/OR groups over leaf
//! comparisons. Groups become nested predicate scopes; leaves go through a
//! closed operator table. A malformed leaf or an unknown leaf operator is
//! logged and dropped while its siblings compile; an unknown *logic* token
//! aborts the request, since a group whose combinator cannot be resolved
//! would silently change the query's meaning.

use sea_orm::sea_query::{Cond, Condition, ExprTrait, SimpleExpr};
use serde_json::Value as JsonValue;

use super::overrides::bind_value;
use super::{QueryEngine, column_expr};
use crate::errors::{EngineError, EngineResult};

/// One node of the filter tree, lifted out of the raw request JSON.
#[derive(Debug, Clone)]
pub enum FilterNode {
    Group {
        logic: String,
        filters: Vec<FilterNode>,
    },
    Leaf {
        field: Option<String>,
        operator: Option<String>,
        value: Option<JsonValue>,
    },
}

impl FilterNode {
    /// Lift a JSON object into a node. An object carrying both `logic` and
    /// `filters` keys is a group; anything else is treated as a leaf and
    /// validated at compile time.
    #[must_use]
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        if object.contains_key("logic") && object.contains_key("filters") {
            let logic = object
                .get("logic")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string();
            let filters = object
                .get("filters")
                .and_then(JsonValue::as_array)
                .map(|children| children.iter().filter_map(Self::from_value).collect())
                .unwrap_or_default();
            Some(Self::Group { logic, filters })
        } else {
            Some(Self::Leaf {
                field: object
                    .get("field")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string),
                operator: object
                    .get("operator")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string),
                value: object.get("value").filter(|v| !v.is_null()).cloned(),
            })
        }
    }
}

impl QueryEngine {
    /// Compile the request's filter tree into the query, when present.
    ///
    /// A top-level structure without both `logic` and `filters` keys skips
    /// the whole tree, matching how grid clients omit the widget state.
    pub fn multi_column_filter(&mut self) -> EngineResult<()> {
        let Some(raw) = self.request.filters.clone() else {
            return Ok(());
        };
        let Some(node) = FilterNode::from_value(&raw) else {
            tracing::debug!("filter parameter is not an object; skipping");
            return Ok(());
        };
        if matches!(node, FilterNode::Leaf { .. }) {
            tracing::debug!("filter parameter has no logic/filters keys; skipping");
            return Ok(());
        }

        if let Some(compiled) = Self::compile_node(&node)? {
            self.query.cond_where(compiled.attach(Cond::all()));
            self.filter_applied = true;
        }
        Ok(())
    }

    /// Recursively compile one node. Returns `None` when the node (or an
    /// entire group) contributed nothing.
    pub(crate) fn compile_node(node: &FilterNode) -> EngineResult<Option<CompiledFilter>> {
        match node {
            FilterNode::Group { logic, filters } => {
                let mut scope = match logic.trim() {
                    "and" => Cond::all(),
                    "or" => Cond::any(),
                    other => return Err(EngineError::unknown_logic(other)),
                };
                let mut matched = false;
                for child in filters {
                    if let Some(compiled) = Self::compile_node(child)? {
                        scope = compiled.attach(scope);
                        matched = true;
                    }
                }
                Ok(matched.then_some(CompiledFilter::Scope(scope)))
            }
            FilterNode::Leaf {
                field,
                operator,
                value,
            } => Ok(compile_leaf(
                field.as_deref(),
                operator.as_deref(),
                value.as_ref(),
            )
            .map(CompiledFilter::Predicate)),
        }
    }
}

/// A compiled subtree: either a nested predicate scope or a single leaf
/// predicate.
pub(crate) enum CompiledFilter {
    Scope(Condition),
    Predicate(SimpleExpr),
}

impl CompiledFilter {
    fn attach(self, parent: Condition) -> Condition {
        match self {
            Self::Scope(scope) => parent.add(scope),
            Self::Predicate(expr) => parent.add(expr),
        }
    }
}

/// The closed leaf-operator table. Unknown operators and incomplete leaves
/// yield `None` plus a logged error, never a failure.
fn compile_leaf(
    field: Option<&str>,
    operator: Option<&str>,
    value: Option<&JsonValue>,
) -> Option<SimpleExpr> {
    let (Some(field), Some(operator), Some(value)) = (field, operator, value) else {
        tracing::error!("filter line is missing its field, operator or value; skipping");
        return None;
    };

    let column = column_expr(field);
    let text = match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };

    let expr = match operator.trim() {
        "eq" => column.eq(bind_value(value)),
        "neq" => column.ne(bind_value(value)),
        "gt" => column.gt(bind_value(value)),
        "gte" => column.gte(bind_value(value)),
        "lt" => column.lt(bind_value(value)),
        "lte" => column.lte(bind_value(value)),
        "startswith" => column.like(format!("{text}%")),
        "contains" => column.like(format!("%{text}%")),
        "doesnotcontain" => column.not_like(format!("%{text}%")),
        "endswith" => column.like(format!("%{text}")),
        "isnull" => column.is_null(),
        "isnotnull" => column.is_not_null(),
        "isempty" => column.eq(""),
        "isnotempty" => column.ne(""),
        other => {
            tracing::error!(operator = other, "unknown filter operator; skipping line");
            return None;
        }
    };
    Some(expr)
}
