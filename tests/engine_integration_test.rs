//! End-to-end tests: compile a grid request and execute it against an
//! in-memory SQLite database.

use gridcrate::{EngineConfig, GridRequest, QueryEngine, RelationDef};
use sea_orm::sea_query::{Alias, Asterisk, Query, SelectStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection};

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared(
        "CREATE TABLE companies (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    )
    .await
    .unwrap();
    db.execute_unprepared(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            age INTEGER NOT NULL,
            company_id INTEGER NOT NULL
        )",
    )
    .await
    .unwrap();

    db.execute_unprepared("INSERT INTO companies (id, name) VALUES (1, 'Acme'), (2, 'Globex')")
        .await
        .unwrap();

    // alpha 01..10 work at Acme (ages 21..30), beta 01..15 at Globex
    // (ages 31..45).
    let mut rows = Vec::new();
    for i in 1..=10 {
        rows.push(format!(
            "({i}, 'alpha {i:02}', 'alpha{i:02}@example.com', {}, 1)",
            20 + i
        ));
    }
    for i in 1..=15 {
        rows.push(format!(
            "({}, 'beta {i:02}', 'beta{i:02}@example.com', {}, 2)",
            10 + i,
            30 + i
        ));
    }
    db.execute_unprepared(&format!(
        "INSERT INTO users (id, name, email, age, company_id) VALUES {}",
        rows.join(", ")
    ))
    .await
    .unwrap();

    db
}

fn base_query() -> SelectStatement {
    let mut query = Query::select();
    query.column(Asterisk).from(Alias::new("users"));
    query
}

const COLUMNS: &str = r#"[
    {"name": "name", "data": "name", "searchable": true,
     "search": {"value": "", "regex": false}},
    {"name": "email", "data": "email", "searchable": true,
     "search": {"value": "", "regex": false}}
]"#;

fn engine_with(sort: Option<&str>, search: Option<&str>, filter: Option<&str>) -> QueryEngine {
    let request = GridRequest::from_params(COLUMNS, sort, search, filter);
    QueryEngine::new(
        base_query(),
        "users",
        request,
        DatabaseBackend::Sqlite,
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn fetch_searches_sorts_and_paginates() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 4}"#),
        Some(r#"{"value": "alpha"}"#),
        None,
    );

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.filtered, 10);
    assert_eq!(page.rows.len(), 4);
    let first: String = page.rows[0].try_get("", "name").unwrap();
    assert_eq!(first, "alpha 01");
}

#[tokio::test]
async fn smart_search_narrows_term_by_term() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        Some(r#"{"value": "beta 1"}"#),
        None,
    );

    let page = engine.fetch(&db).await.unwrap();
    // Both terms must match: beta 01 plus beta 10..15.
    assert_eq!(page.filtered, 7);
}

#[tokio::test]
async fn descending_sort_reverses_the_page() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": true, "page": 1, "rowsPerPage": 5}"#),
        None,
        None,
    );

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.filtered, 25);
    let first: String = page.rows[0].try_get("", "name").unwrap();
    assert_eq!(first, "beta 15");
}

#[tokio::test]
async fn second_page_continues_where_the_first_ended() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 2, "rowsPerPage": 10}"#),
        None,
        None,
    );

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.rows.len(), 10);
    let first: String = page.rows[0].try_get("", "name").unwrap();
    assert_eq!(first, "beta 01");
}

#[tokio::test]
async fn filter_tree_restricts_the_result_set() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        None,
        Some(
            r#"{"logic": "and", "filters": [
                {"field": "age", "operator": "gte", "value": 40},
                {"field": "name", "operator": "startswith", "value": "beta"}
            ]}"#,
        ),
    );

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.filtered, 6);
}

#[tokio::test]
async fn nested_filter_groups_combine_with_or() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        None,
        Some(
            r#"{"logic": "or", "filters": [
                {"field": "name", "operator": "eq", "value": "alpha 01"},
                {"logic": "and", "filters": [
                    {"field": "age", "operator": "gt", "value": 43},
                    {"field": "name", "operator": "contains", "value": "beta"}
                ]}
            ]}"#,
        ),
    );

    let page = engine.fetch(&db).await.unwrap();
    // alpha 01 plus beta 14 and beta 15.
    assert_eq!(page.filtered, 3);
}

#[tokio::test]
async fn global_search_probes_eager_relations() {
    let db = setup_db().await;
    let columns = r#"[
        {"name": "name", "data": "name", "searchable": true,
         "search": {"value": "", "regex": false}},
        {"name": "company.name", "data": "company.name", "searchable": true,
         "search": {"value": "", "regex": false}}
    ]"#;
    let request = GridRequest::from_params(
        columns,
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        Some(r#"{"value": "Acme"}"#),
        None,
    );
    let mut engine = QueryEngine::new(
        base_query(),
        "users",
        request,
        DatabaseBackend::Sqlite,
        EngineConfig::default(),
    );
    engine
        .relation(
            "company",
            RelationDef::belongs_to("companies", "company_id", "id"),
        )
        .eager_load("company");

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.filtered, 10);
    let first: String = page.rows[0].try_get("", "name").unwrap();
    assert!(first.starts_with("alpha"));
}

#[tokio::test]
async fn per_column_search_joins_the_relation() {
    let db = setup_db().await;
    let columns = r#"[
        {"name": "company.name", "data": "company.name", "searchable": true,
         "search": {"value": "Globex", "regex": false}}
    ]"#;
    let request = GridRequest::from_params(
        columns,
        Some(r#"{"sortBy": "", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        None,
        None,
    );
    let mut engine = QueryEngine::new(
        base_query(),
        "users",
        request,
        DatabaseBackend::Sqlite,
        EngineConfig::default(),
    );
    engine
        .relation(
            "company",
            RelationDef::belongs_to("companies", "company_id", "id"),
        )
        .eager_load("company");

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.filtered, 15);
}

#[tokio::test]
async fn manual_filter_callback_replaces_automatic_search() {
    use sea_orm::sea_query::{Expr, ExprTrait};
    use std::sync::Arc;

    let db = setup_db().await;
    let mut engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        Some(r#"{"value": "alpha"}"#),
        None,
    );
    engine.filter(
        Arc::new(|query: &mut SelectStatement| {
            query.and_where(Expr::col((Alias::new("users"), Alias::new("age"))).gte(44));
        }),
        false,
    );

    let page = engine.fetch(&db).await.unwrap();
    // The keyword is ignored; only the callback's predicate applies.
    assert_eq!(page.filtered, 2);
}

#[tokio::test]
async fn unsearchable_request_keeps_total_and_filtered_equal() {
    let db = setup_db().await;
    let engine = engine_with(
        Some(r#"{"sortBy": "name", "descending": false, "page": 1, "rowsPerPage": 50}"#),
        None,
        None,
    );

    let page = engine.fetch(&db).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.filtered, 25);
}

#[tokio::test]
async fn count_runs_against_the_compiled_state() {
    let db = setup_db().await;
    let request = GridRequest::from_params(COLUMNS, None, Some(r#"{"value": "BETA"}"#), None);
    let config = EngineConfig {
        case_insensitive: true,
        ..Default::default()
    };
    let mut engine = QueryEngine::new(
        base_query(),
        "users",
        request,
        DatabaseBackend::Sqlite,
        config,
    );

    engine.filtering().unwrap();
    let filtered = engine.count(&db).await.unwrap();
    // The keyword is lower-cased and both sides case-folded.
    assert_eq!(filtered, 15);
}
