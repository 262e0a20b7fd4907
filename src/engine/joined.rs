//! Relation metadata and join resolution for dotted column references.
//!
//! A dotted reference (`orders.customer.name`) names a relation path and a
//! trailing column. Each path prefix must be registered as a [`RelationDef`]
//! and marked eager-loaded before the engine will touch it; an eager path
//! with no metadata is a fatal configuration error, while a non-eager path
//! is simply treated as a plain (qualified) column by the callers.
//!
//! Two resolution strategies exist, matching how the compilation passes use
//! relations:
//!
//! - [`join_eager_loaded_column`](super::QueryEngine::join_eager_loaded_column)
//!   emits deduplicated LEFT JOINs and returns the qualified column, for
//!   per-column search and ordering.
//! - [`compile_relation_search`](super::QueryEngine::compile_relation_search)
//!   builds a correlated `EXISTS` chain (one level per path segment) so the
//!   global-search OR group can probe the relation without multiplying rows.

use sea_orm::sea_query::{Alias, Cond, Expr, ExprTrait, JoinType, Query, SimpleExpr};

use super::QueryEngine;
use crate::errors::{EngineError, EngineResult};

/// How a relation connects to its parent, carrying exactly the keys join
/// synthesis needs.
#[derive(Debug, Clone)]
pub enum RelationKind {
    /// Parent holds the foreign key; the related row owns the primary key.
    BelongsTo {
        /// Key column on the parent table.
        foreign_key: String,
        /// Key column on the related table.
        owner_key: String,
    },
    /// Related rows hold a foreign key back to the parent.
    HasOneOrMany {
        /// Key column on the related table.
        foreign_key: String,
        /// Key column on the parent table.
        local_key: String,
    },
    /// Many-to-many through a pivot table.
    BelongsToMany {
        pivot_table: String,
        /// Pivot column pointing at the parent.
        pivot_foreign_key: String,
        /// Key column on the parent table.
        parent_key: String,
        /// Pivot column pointing at the related table.
        pivot_related_key: String,
        /// Key column on the related table.
        related_key: String,
    },
    /// Polymorphic many-to-many: a pivot constrained by a type column.
    MorphToMany {
        pivot_table: String,
        pivot_foreign_key: String,
        parent_key: String,
        pivot_related_key: String,
        related_key: String,
        morph_type_column: String,
        /// Type discriminator value identifying the parent model.
        morph_class: String,
    },
}

/// A registered relation: the related table plus its [`RelationKind`].
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub table: String,
    pub kind: RelationKind,
}

impl RelationDef {
    #[must_use]
    pub fn belongs_to(
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            kind: RelationKind::BelongsTo {
                foreign_key: foreign_key.into(),
                owner_key: owner_key.into(),
            },
        }
    }

    #[must_use]
    pub fn has_one_or_many(
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            kind: RelationKind::HasOneOrMany {
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
        }
    }

    #[must_use]
    pub fn belongs_to_many(
        table: impl Into<String>,
        pivot_table: impl Into<String>,
        pivot_foreign_key: impl Into<String>,
        parent_key: impl Into<String>,
        pivot_related_key: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            kind: RelationKind::BelongsToMany {
                pivot_table: pivot_table.into(),
                pivot_foreign_key: pivot_foreign_key.into(),
                parent_key: parent_key.into(),
                pivot_related_key: pivot_related_key.into(),
                related_key: related_key.into(),
            },
        }
    }

    pub(crate) fn is_morph_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::MorphToMany { .. })
    }
}

impl QueryEngine {
    /// Split a dotted reference into its relation path and trailing column.
    pub(crate) fn split_relation(reference: &str) -> Option<(&str, &str)> {
        reference.rsplit_once('.')
    }

    /// Resolve every prefix of `relation` against the registered metadata,
    /// in path order. An unregistered prefix aborts compilation.
    pub(crate) fn relation_chain(&self, relation: &str) -> EngineResult<Vec<RelationDef>> {
        let mut chain = Vec::new();
        let mut path = String::new();
        for segment in relation.split('.') {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            let def = self
                .relations
                .get(&path)
                .ok_or_else(|| EngineError::unknown_relation(&path))?;
            chain.push(def.clone());
        }
        Ok(chain)
    }

    /// Join every segment of an eager-loaded relation path onto the query
    /// and return the fully qualified `table.column` reference.
    pub(crate) fn join_eager_loaded_column(
        &mut self,
        relation: &str,
        column: &str,
    ) -> EngineResult<String> {
        let chain = self.relation_chain(relation)?;
        let mut parent = self.base_table.clone();

        for def in &chain {
            match &def.kind {
                RelationKind::BelongsTo {
                    foreign_key,
                    owner_key,
                } => {
                    let on = Expr::col((Alias::new(&parent), Alias::new(foreign_key)))
                        .equals((Alias::new(&def.table), Alias::new(owner_key)));
                    self.perform_join(&def.table, on);
                }
                RelationKind::HasOneOrMany {
                    foreign_key,
                    local_key,
                } => {
                    let on = Expr::col((Alias::new(&def.table), Alias::new(foreign_key)))
                        .equals((Alias::new(&parent), Alias::new(local_key)));
                    self.perform_join(&def.table, on);
                }
                RelationKind::BelongsToMany {
                    pivot_table,
                    pivot_foreign_key,
                    parent_key,
                    pivot_related_key,
                    related_key,
                }
                | RelationKind::MorphToMany {
                    pivot_table,
                    pivot_foreign_key,
                    parent_key,
                    pivot_related_key,
                    related_key,
                    ..
                } => {
                    let pivot_on =
                        Expr::col((Alias::new(pivot_table), Alias::new(pivot_foreign_key)))
                            .equals((Alias::new(&parent), Alias::new(parent_key)));
                    self.perform_join(pivot_table, pivot_on);

                    // The related column must be selectable once the pivot
                    // fans rows out.
                    self.query
                        .column((Alias::new(&def.table), Alias::new(column)));

                    let related_on =
                        Expr::col((Alias::new(pivot_table), Alias::new(pivot_related_key)))
                            .equals((Alias::new(&def.table), Alias::new(related_key)));
                    self.perform_join(&def.table, related_on);
                }
            }
            parent = def.table.clone();
        }

        Ok(format!("{parent}.{column}"))
    }

    /// LEFT JOIN `table` unless it is already part of the query.
    fn perform_join(&mut self, table: &str, on: SimpleExpr) {
        if self.joined.contains(table) {
            return;
        }
        self.joined.insert(table.to_string());
        self.query.join(JoinType::LeftJoin, Alias::new(table), on);
    }

    /// Compile a global-search probe into an eager-loaded relation as a
    /// correlated EXISTS chain, searching on the final segment only.
    pub(crate) fn compile_relation_search(
        &self,
        relation: &str,
        column: &str,
        keyword: &str,
        index: usize,
    ) -> EngineResult<SimpleExpr> {
        let chain = self.relation_chain(relation)?;
        self.exists_chain(&chain, &self.base_table, column, keyword, index)
    }

    fn exists_chain(
        &self,
        chain: &[RelationDef],
        parent: &str,
        column: &str,
        keyword: &str,
        index: usize,
    ) -> EngineResult<SimpleExpr> {
        let def = &chain[0];
        let mut sub = Query::select();
        sub.expr(Expr::cust("1")).from(Alias::new(&def.table));

        match &def.kind {
            RelationKind::BelongsTo {
                foreign_key,
                owner_key,
            } => {
                sub.and_where(
                    Expr::col((Alias::new(&def.table), Alias::new(owner_key)))
                        .equals((Alias::new(parent), Alias::new(foreign_key))),
                );
            }
            RelationKind::HasOneOrMany {
                foreign_key,
                local_key,
            } => {
                sub.and_where(
                    Expr::col((Alias::new(&def.table), Alias::new(foreign_key)))
                        .equals((Alias::new(parent), Alias::new(local_key))),
                );
            }
            RelationKind::BelongsToMany {
                pivot_table,
                pivot_foreign_key,
                parent_key,
                pivot_related_key,
                related_key,
            } => {
                sub.join(
                    JoinType::InnerJoin,
                    Alias::new(pivot_table),
                    Expr::col((Alias::new(&def.table), Alias::new(related_key)))
                        .equals((Alias::new(pivot_table), Alias::new(pivot_related_key))),
                );
                sub.and_where(
                    Expr::col((Alias::new(pivot_table), Alias::new(pivot_foreign_key)))
                        .equals((Alias::new(parent), Alias::new(parent_key))),
                );
            }
            RelationKind::MorphToMany {
                pivot_table,
                pivot_foreign_key,
                parent_key,
                pivot_related_key,
                related_key,
                morph_type_column,
                morph_class,
            } => {
                sub.join(
                    JoinType::InnerJoin,
                    Alias::new(pivot_table),
                    Cond::all()
                        .add(
                            Expr::col((Alias::new(&def.table), Alias::new(related_key))).equals((
                                Alias::new(pivot_table),
                                Alias::new(pivot_related_key),
                            )),
                        )
                        .add(
                            Expr::col((Alias::new(pivot_table), Alias::new(morph_type_column)))
                                .eq(morph_class.as_str()),
                        ),
                );
                sub.and_where(
                    Expr::col((Alias::new(pivot_table), Alias::new(pivot_foreign_key)))
                        .equals((Alias::new(parent), Alias::new(parent_key))),
                );
            }
        }

        if chain.len() == 1 {
            sub.and_where(self.compile_query_search(column, keyword, index, &def.table)?);
        } else {
            sub.and_where(self.exists_chain(&chain[1..], &def.table, column, keyword, index)?);
        }

        Ok(Expr::exists(sub))
    }
}
