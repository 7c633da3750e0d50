use super::*;
use crate::error::{ShapeError, ShapeResult};
use crate::value::Value;
use filter::FilterRule;
use std::sync::Mutex;
use tokio_postgres::types::ToSql;

/// Answers `EXPLAIN` with a canned plan and records what it was asked.
struct PlanClient {
    plan: Vec<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl PlanClient {
    fn returning_rows(rows: u64) -> Self {
        Self::with_plan(vec![format!(
            "Seq Scan on articles  (cost=0.00..1.05 rows=5 width=36) (actual time=0.005..0.006 rows={rows} loops=1)"
        )])
    }

    fn with_plan(plan: Vec<String>) -> Self {
        Self {
            plan,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for PlanClient {
    async fn query(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        Err(ShapeError::execution("rows are not available in tests"))
    }

    async fn query_plan(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<String>> {
        self.calls.lock().unwrap().push((sql.to_string(), params.len()));
        Ok(self.plan.clone())
    }
}

fn article_rules() -> FilterRules {
    let mut rules = FilterRules::new();
    rules.insert("isPublished".into(), FilterRule::eq("data.articles", "is_published"));
    rules.insert(
        "authorName".into(),
        FilterRule::custom("data.authors", "name", "data.authors.name ILIKE :value"),
    );
    rules
}

fn filters(pairs: &[(&str, Value)]) -> Filters {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn published_articles_with_default_ordering() {
    let rules = article_rules();
    let client = PlanClient::returning_rows(42);

    let prepared = prepare_query("SELECT * FROM data.articles", Vec::new())
        .sorting_table("data.articles")
        .filters(filters(&[("isPublished", Value::Bool(true))]), &rules)
        .prepare(&client)
        .await
        .unwrap();

    assert!(prepared.query.ends_with(
        " WHERE (data.articles.is_published = :isPublished) ORDER BY data.articles.id DESC, data.articles.created_at DESC OFFSET :offset LIMIT :perPage"
    ));
    assert_eq!(
        prepared.bindings,
        Bindings::new()
            .with("isPublished", true)
            .with("offset", 0)
            .with("perPage", 25)
    );
    assert_eq!(prepared.total_count, 42);
}

#[tokio::test]
async fn count_runs_before_paging_is_appended() {
    let rules = article_rules();
    let client = PlanClient::returning_rows(3);

    prepare_query("SELECT * FROM data.articles", Vec::new())
        .sorting_table("data.articles")
        .filters(filters(&[("isPublished", Value::Bool(true))]), &rules)
        .prepare(&client)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    let (sql, param_count) = &calls[0];
    assert_eq!(
        sql,
        "EXPLAIN ANALYZE SELECT * FROM data.articles WHERE (data.articles.is_published = $1)"
    );
    assert_eq!(*param_count, 1);
}

#[tokio::test]
async fn unknown_filter_fails_before_any_database_call() {
    let rules = article_rules();
    let client = PlanClient::returning_rows(1);

    let err = prepare_query("SELECT * FROM data.articles", Vec::new())
        .filters(filters(&[("isDeleted", Value::Bool(true))]), &rules)
        .prepare(&client)
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn invalid_order_fails_before_any_database_call() {
    let client = PlanClient::returning_rows(1);

    let err = prepare_query("SELECT * FROM data.articles", Vec::new())
        .meta(MetaParams::new().order("sideways"))
        .prepare(&client)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn unparseable_plan_is_execution_error() {
    let client = PlanClient::with_plan(vec!["Seq Scan on articles  (cost=0.00..1.05 rows=5 width=36)".into()]);

    let err = prepare_query("SELECT * FROM data.articles", Vec::new())
        .prepare(&client)
        .await
        .unwrap_err();

    assert!(err.is_execution());
}

#[tokio::test]
async fn grouping_is_counted_and_precedes_ordering() {
    let client = PlanClient::returning_rows(7);

    let prepared = prepare_query(
        "SELECT a.author_id, count(*) FROM data.articles a",
        vec![ConditionFragment::new("a.is_published")],
    )
    .group_by("GROUP BY a.author_id")
    .order_raw("count(*) DESC")
    .prepare(&client)
    .await
    .unwrap();

    assert_eq!(
        prepared.query,
        "SELECT a.author_id, count(*) FROM data.articles a WHERE (a.is_published) GROUP BY a.author_id ORDER BY count(*) DESC OFFSET :offset LIMIT :perPage"
    );
    assert_eq!(
        client.calls()[0].0,
        "EXPLAIN ANALYZE SELECT a.author_id, count(*) FROM data.articles a WHERE (a.is_published) GROUP BY a.author_id"
    );
    assert_eq!(prepared.total_count, 7);
}

#[test]
fn base_where_gets_and_clauses() {
    let rules = article_rules();
    let compiled = prepare_query(
        "SELECT * FROM data.articles JOIN data.authors ON data.authors.id = data.articles.author_id WHERE data.articles.deleted_at IS NULL",
        Vec::new(),
    )
    .do_not_add_where()
    .filters(filters(&[("authorName", Value::from("%ann%"))]), &rules)
    .build()
    .unwrap();

    assert!(compiled.query.contains(
        "WHERE data.articles.deleted_at IS NULL AND (data.authors.name ILIKE :authorName) OFFSET"
    ));
}

#[test]
fn base_conditions_precede_filters_and_search() {
    let rules = article_rules();
    let compiled = prepare_query(
        "SELECT * FROM data.articles",
        vec![ConditionFragment::new("data.articles.tenant_id = :tenant").bind("tenant", 9)],
    )
    .filters(filters(&[("isPublished", Value::Bool(false))]), &rules)
    .search(["data.articles.title"], "rust")
    .meta(MetaParams::new().per_page(10).offset(30).order_by("title").order("asc"))
    .sorting_table("data.articles")
    .build()
    .unwrap();

    assert_eq!(
        compiled.query,
        "SELECT * FROM data.articles WHERE (data.articles.tenant_id = :tenant) AND (data.articles.is_published = :isPublished) AND (data.articles.title ILIKE :search) ORDER BY data.articles.title ASC OFFSET :offset LIMIT :perPage"
    );
    assert_eq!(compiled.bindings.get("tenant"), Some(&Value::Int(9)));
    assert_eq!(compiled.bindings.get("search"), Some(&Value::from("%rust%")));
    assert_eq!(compiled.bindings.get("perPage"), Some(&Value::Int(10)));
    assert_eq!(compiled.bindings.get("offset"), Some(&Value::Int(30)));
}

#[test]
fn no_conditions_no_table_only_paging() {
    let compiled = prepare_query("SELECT 1", Vec::new()).build().unwrap();
    assert_eq!(compiled.query, "SELECT 1 OFFSET :offset LIMIT :perPage");
    assert_eq!(compiled.bindings.len(), 2);
}

#[test]
fn compiled_query_rewrites_to_positional() {
    let rules = article_rules();
    let compiled = prepare_query("SELECT * FROM data.articles", Vec::new())
        .filters(filters(&[("isPublished", Value::Bool(true))]), &rules)
        .build()
        .unwrap();

    let (sql, values) = compiled.bindings.to_positional(&compiled.query).unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM data.articles WHERE (data.articles.is_published = $1) OFFSET $2 LIMIT $3"
    );
    assert_eq!(values, vec![&Value::Bool(true), &Value::Int(0), &Value::Int(25)]);
}
