//! # Error Handling
//!
//! Compilation errors fall into two groups:
//!
//! - **Fatal configuration errors** abort the request and unwind out of the
//!   compiling call: an unknown logic token in a filter group, a dialect that
//!   cannot express JSON-path access, an unresolvable relation segment, or a
//!   request missing its column structure.
//! - **Skippable errors** (malformed filter leaves, unknown leaf operators,
//!   over-arity override registrations) are recorded through the `tracing`
//!   side channel and the offending piece is omitted; the rest of the query
//!   compiles normally. They never surface as an `Err`.
//!
//! Database errors from the execution boundary are wrapped verbatim and
//! never retried.

use sea_orm::DbErr;
use std::fmt;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal errors raised while compiling or executing a grid query.
#[derive(Debug)]
pub enum EngineError {
    /// A filter group carried a logic token other than `and` / `or`.
    UnknownLogic {
        /// The offending token, trimmed.
        token: String,
    },

    /// JSON-path compilation was requested on a dialect without a known
    /// JSON access syntax.
    UnsupportedDialect {
        /// Name of the dialect that cannot express the operation.
        dialect: String,
    },

    /// A dotted field referenced a relation segment with no registered
    /// metadata.
    UnknownRelation {
        /// The relation path that failed to resolve.
        relation: String,
    },

    /// The request carried no column structure to compile against.
    InsufficientParameters,

    /// Error surfaced by the database driver while executing the compiled
    /// query (details preserved, never retried).
    Database(DbErr),
}

impl EngineError {
    pub fn unknown_logic(token: impl Into<String>) -> Self {
        Self::UnknownLogic {
            token: token.into(),
        }
    }

    pub fn unsupported_dialect(dialect: impl Into<String>) -> Self {
        Self::UnsupportedDialect {
            dialect: dialect.into(),
        }
    }

    pub fn unknown_relation(relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            relation: relation.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLogic { token } => {
                write!(f, "{token} is an unknown logic operator")
            }
            Self::UnsupportedDialect { dialect } => {
                write!(f, "{dialect} is unknown for this kind of operation")
            }
            Self::UnknownRelation { relation } => {
                write!(f, "relation {relation} is not registered")
            }
            Self::InsufficientParameters => write!(f, "insufficient request parameters"),
            Self::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}
