//! Dialect-specific SQL fragment synthesis.
//!
//! Sea-query renders the bulk of the query through its backend builders; the
//! pieces it cannot express generically (JSON-path access, regex operators,
//! identifier wrapping inside raw fragments) are synthesized here per
//! dialect. Raw fragments built by this module always carry their keyword as
//! a bound value, never spliced into the SQL text.

use crate::errors::{EngineError, EngineResult};
use sea_orm::DatabaseBackend;

/// SQL syntax family of the target database.
///
/// Derived from the Sea-ORM backend, except for Oracle which has no backend
/// and is opted into through [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
    Oracle,
}

impl Dialect {
    #[must_use]
    pub fn from_backend(backend: DatabaseBackend) -> Self {
        match backend {
            DatabaseBackend::MySql => Self::MySql,
            DatabaseBackend::Postgres => Self::Postgres,
            DatabaseBackend::Sqlite => Self::Sqlite,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "pgsql",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
        }
    }

    /// Wrap an identifier, handling qualified `table.column` references by
    /// wrapping each part separately.
    #[must_use]
    pub fn wrap(self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| self.wrap_part(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn wrap_part(self, part: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", part.replace('`', "``")),
            Self::Postgres | Self::Sqlite | Self::Oracle => {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        }
    }

    /// Quote a string literal for inline use in a raw fragment.
    #[must_use]
    pub fn quote_str(self, literal: &str) -> String {
        format!("'{}'", literal.replace('\'', "''"))
    }

    /// Cast a column expression to text where comparisons require it.
    #[must_use]
    pub fn cast_text(self, expression: &str) -> String {
        match self {
            Self::Postgres => format!("CAST({expression} as TEXT)"),
            _ => expression.to_string(),
        }
    }

    /// Synthesize a JSON-path access expression for `column` (unwrapped,
    /// possibly `table.column`-qualified) at the dot-separated `path`.
    ///
    /// MySQL emits `col->'$.path'`; Postgres emits `col#>>'{seg,seg}'`.
    /// Every other dialect is a fatal configuration error.
    pub fn json_path_expr(self, column: &str, path: &str) -> EngineResult<String> {
        let wrapped = self.wrap(column);
        match self {
            Self::MySql => {
                let json_path = self.quote_str(&format!("$.{path}"));
                Ok(format!("{wrapped}->{json_path}"))
            }
            Self::Postgres => {
                let segments = path.split('.').collect::<Vec<_>>().join(",");
                let json_path = self.quote_str(&format!("{{{segments}}}"));
                Ok(format!("{wrapped}#>>{json_path}"))
            }
            other => Err(EngineError::unsupported_dialect(other.name())),
        }
    }

    /// Build a regex predicate over `column_sql` with the keyword as a bound
    /// value. Returns the raw SQL (with a single `?` placeholder) and the
    /// value to bind.
    #[must_use]
    pub fn regex_predicate(
        self,
        column_sql: &str,
        keyword: &str,
        case_insensitive: bool,
    ) -> (String, String) {
        match self {
            Self::Oracle => {
                let sql = if case_insensitive {
                    format!("REGEXP_LIKE( LOWER({column_sql}) , ?, 'i' )")
                } else {
                    format!("REGEXP_LIKE( {column_sql} , ? )")
                };
                (sql, keyword.to_string())
            }
            Self::Postgres => {
                let sql = if case_insensitive {
                    format!("{column_sql} ~* ?")
                } else {
                    format!("{column_sql} ~ ?")
                };
                (sql, keyword.to_string())
            }
            // MySQL REGEXP matching is case-insensitive on the default
            // collations either way; the keyword is lower-cased to line up
            // with the LOWER() applied on the column side.
            Self::MySql | Self::Sqlite => {
                let sql = if case_insensitive {
                    format!("LOWER({column_sql}) REGEXP ?")
                } else {
                    format!("{column_sql} REGEXP ?")
                };
                (sql, keyword.to_lowercase())
            }
        }
    }
}
