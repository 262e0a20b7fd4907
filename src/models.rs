//! Request model for grid queries.
//!
//! The client ships four independently JSON-encoded parameters (`columns`,
//! `sort`, `search`, `filter`) that [`GridRequest::from_params`] decodes
//! into one read-only value object. Invalid JSON in any part degrades to that
//! part's default rather than failing the request; a request with no columns
//! at all is rejected later by [`GridRequest::check_parameters`].
//!
//! Everything here is immutable once parsed. Column identity is the position
//! index within the request; the effective column name falls back to the
//! `data` key when `name` is absent or empty.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Per-column search state carried inside a [`ColumnSpec`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSearch {
    /// Per-column keyword; empty means the column is not being searched.
    #[serde(default)]
    pub value: String,
    /// Interpret [`value`](Self::value) as a regular expression.
    #[serde(default)]
    pub regex: bool,
}

/// One requested grid column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSpec {
    /// Display name; falls back to [`data`](Self::data) when empty.
    #[serde(default, deserialize_with = "string_or_none")]
    pub name: Option<String>,
    /// Data key: a column name, or a dotted `relation.column` reference.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub orderable: bool,
    /// JSON path inside the column, when the column stores a JSON document.
    #[serde(default, deserialize_with = "string_or_none")]
    pub json: Option<String>,
    /// Plain column consulted as an OR-fallback for JSON search/order.
    #[serde(default, deserialize_with = "string_or_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub search: ColumnSearch,
}

/// Sort and pagination parameters (one active sort field per request).
#[derive(Debug, Clone, Deserialize)]
pub struct SortSpec {
    #[serde(default, rename = "sortBy")]
    pub sort_by: String,
    #[serde(default)]
    pub descending: bool,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size; `0` means "no explicit size" and defaults at the pager.
    #[serde(default, rename = "rowsPerPage")]
    pub rows_per_page: u64,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            sort_by: String::new(),
            descending: false,
            page: 1,
            rows_per_page: 0,
        }
    }
}

/// Global free-text search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalSearch {
    #[serde(default)]
    pub value: String,
}

/// The active sort resolved against the column list.
#[derive(Debug, Clone)]
pub struct Orderable {
    pub column: String,
    pub json: Option<String>,
    pub fallback: Option<String>,
    pub descending: bool,
}

impl Orderable {
    #[must_use]
    pub fn direction(&self) -> &'static str {
        if self.descending { "desc" } else { "asc" }
    }
}

/// A parsed, read-only grid request.
#[derive(Debug, Clone, Default)]
pub struct GridRequest {
    pub columns: Vec<ColumnSpec>,
    pub sort: Option<SortSpec>,
    pub search: GlobalSearch,
    /// Raw nested filter tree, compiled by the filter-tree pass.
    pub filters: Option<JsonValue>,
}

impl GridRequest {
    /// Decode the four JSON-encoded request parameters.
    ///
    /// Invalid JSON in a part degrades to the part's default, mirroring how
    /// the grid clients behave when a widget has nothing to send.
    #[must_use]
    pub fn from_params(
        columns: &str,
        sort: Option<&str>,
        search: Option<&str>,
        filter: Option<&str>,
    ) -> Self {
        Self {
            columns: decode_part(columns, "columns").unwrap_or_default(),
            sort: sort.and_then(|raw| decode_part(raw, "sort")),
            search: search
                .and_then(|raw| decode_part(raw, "search"))
                .unwrap_or_default(),
            filters: filter
                .and_then(|raw| decode_part::<JsonValue>(raw, "filter"))
                .filter(|value| !value.is_null()),
        }
    }

    /// Caller-input validation: a request without columns cannot be
    /// compiled.
    pub fn check_parameters(&self) -> Result<(), crate::errors::EngineError> {
        if self.columns.is_empty() {
            return Err(crate::errors::EngineError::InsufficientParameters);
        }
        Ok(())
    }

    /// Effective name of the column at `index` (`name`, else `data`).
    #[must_use]
    pub fn column_name(&self, index: usize) -> &str {
        let Some(column) = self.columns.get(index) else {
            return "";
        };
        match &column.name {
            Some(name) if !name.is_empty() => name,
            _ => &column.data,
        }
    }

    /// Whether the column takes part in search. With `column_search` set,
    /// the column must also carry a non-empty per-column keyword.
    #[must_use]
    pub fn is_column_searchable(&self, index: usize, column_search: bool) -> bool {
        let Some(column) = self.columns.get(index) else {
            return false;
        };
        if column_search {
            column.searchable && !column.search.value.is_empty()
        } else {
            column.searchable
        }
    }

    /// Indexes of every globally searchable column, in request order.
    #[must_use]
    pub fn searchable_column_indexes(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|index| self.is_column_searchable(*index, false))
            .collect()
    }

    #[must_use]
    pub fn column_keyword(&self, index: usize) -> &str {
        self.columns
            .get(index)
            .map_or("", |column| column.search.value.as_str())
    }

    #[must_use]
    pub fn is_regex(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|column| column.search.regex)
    }

    /// JSON path of the column at `index`, when declared.
    #[must_use]
    pub fn json_path(&self, index: usize) -> Option<&str> {
        self.columns.get(index)?.json.as_deref()
    }

    #[must_use]
    pub fn fallback(&self, index: usize) -> Option<&str> {
        self.columns.get(index)?.fallback.as_deref()
    }

    /// Global search keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.search.value
    }

    /// Whether anything asks for filtering at all.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        !self.search.value.is_empty() || self.filters.is_some()
    }

    #[must_use]
    pub fn is_orderable(&self) -> bool {
        self.sort
            .as_ref()
            .is_some_and(|sort| !sort.sort_by.is_empty())
    }

    #[must_use]
    pub fn is_paginationable(&self) -> bool {
        self.sort.is_some()
    }

    /// Resolve the active sort field against the column list, pulling the
    /// matched column's JSON path and fallback along.
    #[must_use]
    pub fn orderable(&self) -> Option<Orderable> {
        let sort = self.sort.as_ref()?;
        if sort.sort_by.is_empty() {
            return None;
        }
        let matched = (0..self.columns.len())
            .find(|index| self.column_name(*index) == sort.sort_by)
            .map(|index| &self.columns[index]);

        Some(Orderable {
            column: sort.sort_by.clone(),
            json: matched.and_then(|column| column.json.clone()),
            fallback: matched.and_then(|column| column.fallback.clone()),
            descending: sort.descending,
        })
    }

    #[must_use]
    pub fn page(&self) -> u64 {
        self.sort.as_ref().map_or(1, |sort| sort.page)
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.sort.as_ref().map_or(0, |sort| sort.rows_per_page)
    }
}

fn decode_part<T: serde::de::DeserializeOwned>(raw: &str, part: &'static str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(part, error = %err, "discarding undecodable request part");
            None
        }
    }
}

/// Accept a string, or treat `false`/`null` as absent; grid clients send
/// `false` for "no JSON path" on plain columns.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) if !s.is_empty() => Ok(Some(s)),
        _ => Ok(None),
    }
}

const fn default_true() -> bool {
    true
}

const fn default_page() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GridRequest {
        GridRequest::from_params(
            r#"[
                {"name": "name", "data": "name", "searchable": true,
                 "search": {"value": "", "regex": false}},
                {"name": "", "data": "email", "searchable": true,
                 "search": {"value": "ali", "regex": false}},
                {"name": "age", "data": "age", "searchable": false, "json": false},
                {"name": "city", "data": "meta", "searchable": true,
                 "json": "address.city", "fallback": "city_plain",
                 "search": {"value": "", "regex": false}}
            ]"#,
            Some(r#"{"sortBy": "age", "descending": true, "page": 2, "rowsPerPage": 10}"#),
            Some(r#"{"value": "alice bob"}"#),
            None,
        )
    }

    #[test]
    fn column_name_falls_back_to_data_key() {
        let request = request();
        assert_eq!(request.column_name(0), "name");
        assert_eq!(request.column_name(1), "email");
    }

    #[test]
    fn searchable_indexes_ignore_per_column_keywords() {
        assert_eq!(request().searchable_column_indexes(), vec![0, 1, 3]);
    }

    #[test]
    fn column_search_requires_a_keyword() {
        let request = request();
        assert!(!request.is_column_searchable(0, true));
        assert!(request.is_column_searchable(1, true));
        assert!(!request.is_column_searchable(2, true));
    }

    #[test]
    fn json_false_reads_as_no_path() {
        let request = request();
        assert_eq!(request.json_path(2), None);
        assert_eq!(request.json_path(3), Some("address.city"));
        assert_eq!(request.fallback(3), Some("city_plain"));
    }

    #[test]
    fn orderable_picks_up_the_matched_column() {
        let orderable = request().orderable().unwrap();
        assert_eq!(orderable.column, "age");
        assert_eq!(orderable.direction(), "desc");
        assert_eq!(orderable.json, None);
    }

    #[test]
    fn undecodable_parts_degrade_to_defaults() {
        let request = GridRequest::from_params("not json", Some("{broken"), None, None);
        assert!(request.columns.is_empty());
        assert!(request.sort.is_none());
        assert!(request.check_parameters().is_err());
    }

    #[test]
    fn searchable_when_filter_tree_present() {
        let request =
            GridRequest::from_params("[]", None, None, Some(r#"{"logic": "and", "filters": []}"#));
        assert!(request.is_searchable());
    }
}
