//! Engine configuration.
//!
//! One immutable struct passed to [`QueryEngine::new`](crate::QueryEngine::new)
//! instead of process-global lookups. Everything here is read at engine
//! construction and never mutated afterwards, so a single `EngineConfig` can
//! be shared across requests freely.

/// Static configuration for a [`QueryEngine`](crate::QueryEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lower-case both the searched column and the keyword before matching.
    pub case_insensitive: bool,

    /// Expand user-supplied wildcards in keywords (`*` → `%`, `?` → `_`).
    pub wildcards: bool,

    /// Split multi-word global keywords into independent per-word search
    /// passes, each wrapped in `%…%` for substring matching.
    pub smart_search: bool,

    /// Emit `NULLS LAST` ordering for the active sort column.
    pub nulls_last: bool,

    /// Treat the connection as an Oracle-family database when synthesizing
    /// regex predicates. Sea-ORM has no Oracle backend, so this cannot be
    /// derived from the connection itself.
    pub oracle: bool,

    /// Column names excluded from automatic global search and ordering
    /// unless a per-column override is registered.
    pub blacklist: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            wildcards: false,
            smart_search: true,
            nulls_last: false,
            oracle: false,
            blacklist: Vec::new(),
        }
    }
}
