//! End-to-end tests against a live PostgreSQL server
//!
//! Skipped unless `PGDUMPER_TEST_DATABASE_URL` is set. Every test creates and
//! drops its own schema.

use pg_dumper::schema::{FilterPredicate, ForeignKey, QuerySpec, SortOrder};
use pg_dumper::{
    encode, BrowserLimits, ConnectionResolver, ConnectionTarget, DatabaseProvider, Error,
    ExportFormat, PostgresProvider,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::atomic::{AtomicU32, Ordering};

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

struct Fixture {
    pool: PgPool,
    schema: String,
    provider: PostgresProvider,
}

impl Fixture {
    /// Run extra DDL/DML; `{schema}` is replaced with the quoted test schema
    async fn execute(&self, statements: &[&str]) {
        for statement in statements {
            let sql = statement.replace("{schema}", &format!("\"{}\"", self.schema));
            sqlx::query(&sql).execute(&self.pool).await.unwrap();
        }
    }

    async fn teardown(self) {
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

async fn fixture(limits: BrowserLimits) -> Option<Fixture> {
    let Ok(url) = std::env::var("PGDUMPER_TEST_DATABASE_URL") else {
        eprintln!("PGDUMPER_TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let target = ConnectionTarget::from_url(&url).unwrap();
    let pool = ConnectionResolver::new(target).connect().await.unwrap();

    let schema = format!(
        "pgdumper_test_{}_{}",
        std::process::id(),
        SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    let statements = [
        format!("CREATE SCHEMA \"{schema}\""),
        format!(
            "CREATE TABLE \"{schema}\".orders (
                id INTEGER PRIMARY KEY,
                note TEXT,
                amount NUMERIC(10, 2),
                placed_at TIMESTAMPTZ,
                shipped BOOLEAN
            )"
        ),
        format!(
            "INSERT INTO \"{schema}\".orders
             SELECT n,
                    CASE WHEN n % 4 = 0 THEN NULL ELSE 'order ' || n END,
                    n * 2.50,
                    TIMESTAMPTZ '2024-01-01 00:00:00+00' + n * INTERVAL '1 day',
                    n % 2 = 0
             FROM generate_series(1, 12) AS n"
        ),
        format!("UPDATE \"{schema}\".orders SET note = '100% refund' WHERE id = 1"),
        format!(
            "CREATE TABLE \"{schema}\".metrics (
                id INTEGER PRIMARY KEY,
                reading DOUBLE PRECISION,
                taken_on DATE
            )"
        ),
        format!(
            "INSERT INTO \"{schema}\".metrics
             SELECT n, n / 4.0, DATE '2024-03-01' + n FROM generate_series(1, 7) AS n"
        ),
        format!(
            "CREATE TABLE \"{schema}\".order_items (
                id INTEGER PRIMARY KEY,
                order_id INTEGER REFERENCES \"{schema}\".orders (id),
                sku VARCHAR(32)
            )"
        ),
    ];

    for statement in &statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    Some(Fixture {
        provider: PostgresProvider::new(pool.clone(), schema.clone(), limits),
        pool,
        schema,
    })
}

#[tokio::test]
async fn test_first_page_and_count() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let spec = QuerySpec::new("orders").with_page(0, 5);
    let page = fixture.provider.query_page(&spec).await.unwrap();
    assert_eq!(page.rows.len(), 5);
    assert_eq!(page.total, 12);
    assert_eq!(fixture.provider.count_matching(&spec).await.unwrap(), 12);

    // Ordered by primary key; numerics decode as numbers
    assert_eq!(page.rows[0]["id"], json!(1));
    assert_eq!(page.rows[0]["amount"], json!(2.5));
    assert_eq!(page.rows[0]["shipped"], json!(false));
    assert_eq!(page.rows[0]["placed_at"], json!("2024-01-02T00:00:00Z"));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_pages_cover_every_row_once() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let mut seen = Vec::new();
    for page in 0..4 {
        let result = fixture
            .provider
            .query_page(&QuerySpec::new("orders").with_page(page, 5))
            .await
            .unwrap();
        seen.extend(result.rows.iter().map(|row| row["id"].as_i64().unwrap()));
    }

    assert_eq!(seen, (1..=12).collect::<Vec<_>>());
    fixture.teardown().await;
}

#[tokio::test]
async fn test_search_without_text_columns_is_a_no_op() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let plain = fixture.provider.query_page(&QuerySpec::new("metrics")).await.unwrap();
    let searched = fixture
        .provider
        .query_page(&QuerySpec::new("metrics").with_search("refund"))
        .await
        .unwrap();

    assert_eq!(plain.total, 7);
    assert_eq!(searched.total, 7);
    assert_eq!(plain.rows, searched.rows);
    assert_eq!(searched.rows[0]["taken_on"], json!("2024-03-02"));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_search_is_literal_and_injection_safe() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let percent = QuerySpec::new("orders").with_search("%");
    assert_eq!(fixture.provider.count_matching(&percent).await.unwrap(), 1);

    let case_insensitive = QuerySpec::new("orders").with_search("ORDER 1");
    // order 10, order 11 (order 1 was renamed, order 12 is null)
    assert_eq!(fixture.provider.count_matching(&case_insensitive).await.unwrap(), 2);

    let hostile = QuerySpec::new("orders").with_search("'; DROP TABLE orders; --");
    assert_eq!(fixture.provider.count_matching(&hostile).await.unwrap(), 0);
    assert_eq!(
        fixture.provider.count_matching(&QuerySpec::new("orders")).await.unwrap(),
        12
    );

    fixture.teardown().await;
}

#[tokio::test]
async fn test_filters_and_sort() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let spec = QuerySpec::new("orders")
        .with_filter(
            "amount",
            FilterPredicate::Range {
                min: Some("10".into()),
                max: Some("20".into()),
            },
        )
        .with_filter("shipped", FilterPredicate::Equals { value: "true".into() })
        .with_sort("amount", SortOrder::Descending)
        .with_columns(vec!["id".into(), "amount".into()]);

    let result = fixture.provider.query_page(&spec).await.unwrap();
    let ids: Vec<i64> = result.rows.iter().map(|row| row["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![8, 6, 4]);
    assert_eq!(result.column_names(), vec!["id", "amount"]);

    let malformed = QuerySpec::new("orders")
        .with_filter("placed_at", FilterPredicate::Equals { value: "yesterday".into() });
    assert!(matches!(
        fixture.provider.query_page(&malformed).await,
        Err(Error::Validation(_))
    ));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_unknown_identifiers() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    assert!(matches!(
        fixture.provider.describe_table("nope").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        fixture.provider.query_page(&QuerySpec::new("orders").with_sort("nope", SortOrder::Ascending)).await,
        Err(Error::Validation(_))
    ));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_schema_inspection() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let tables = fixture.provider.list_tables().await.unwrap();
    let names: Vec<&str> = tables.iter().map(|table| table.name.as_str()).collect();
    assert_eq!(names, vec!["metrics", "order_items", "orders"]);

    let items = fixture.provider.describe_table("order_items").await.unwrap();
    assert_eq!(items.primary_key, Some(vec!["id".to_string()]));
    assert_eq!(items.foreign_keys.len(), 1);
    assert_eq!(items.foreign_keys[0].references_table, "orders");
    assert_eq!(items.columns[2].formatted_type(), "CHARACTER VARYING(32)");

    let summaries = fixture.provider.table_summaries().await.unwrap();
    let orders = summaries.iter().find(|summary| summary.name == "orders").unwrap();
    assert_eq!(orders.row_count, 12);
    assert_eq!(orders.column_count, 5);
    assert!(orders.size_bytes > 0);

    let relationships = fixture.provider.relationships().await.unwrap();
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0].source_column, "order_id");

    let overview = fixture.provider.database_overview().await.unwrap();
    assert_eq!(overview.total_tables, 3);
    assert_eq!(overview.total_rows, 19);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_table_stats_match_page_stats_for_whole_table() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    let spec = QuerySpec::new("orders").with_page(0, 100);
    let table_stats = fixture.provider.table_stats(&spec).await.unwrap();
    let page = fixture.provider.query_page(&spec).await.unwrap();
    let page_stats = pg_dumper::compute_stats(&page);

    let amount = |stats: &[pg_dumper::ColumnStats]| {
        stats.iter().find(|stats| stats.column == "amount").cloned().unwrap()
    };
    let (from_table, from_page) = (amount(&table_stats), amount(&page_stats));
    assert_eq!(from_table.count, 12);
    assert_eq!(from_table.mean, from_page.mean);
    assert_eq!(from_table.min, Some(2.5));
    assert_eq!(from_table.max, Some(30.0));

    let note = table_stats.iter().find(|stats| stats.column == "note").unwrap();
    assert_eq!(note.null_count, 3);
    assert_eq!(note.distinct_count, 9);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_export_is_capped() {
    let limits = BrowserLimits {
        max_page_size: 500,
        max_export_rows: 10,
    };
    let Some(fixture) = fixture(limits).await else {
        return;
    };

    let result = fixture.provider.query_all(&QuerySpec::new("orders")).await.unwrap();
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.total, 12);

    fixture.teardown().await;
}

fn foreign_key(column: &str, table: &str, referenced: &str) -> ForeignKey {
    ForeignKey {
        column: column.to_string(),
        references_table: table.to_string(),
        references_column: referenced.to_string(),
    }
}

#[tokio::test]
async fn test_foreign_keys_pair_columns_within_each_constraint() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    fixture
        .execute(&[
            "CREATE TABLE {schema}.parent (a INTEGER, b INTEGER, PRIMARY KEY (a, b))",
            "CREATE TABLE {schema}.child (
                id INTEGER PRIMARY KEY,
                pa INTEGER,
                pb INTEGER,
                CONSTRAINT owner_fk FOREIGN KEY (pa, pb) REFERENCES {schema}.parent (a, b)
            )",
            "CREATE TABLE {schema}.audit (
                id INTEGER PRIMARY KEY,
                order_id INTEGER,
                CONSTRAINT owner_fk FOREIGN KEY (order_id) REFERENCES {schema}.orders (id)
            )",
        ])
        .await;

    let child = fixture.provider.describe_table("child").await.unwrap();
    assert_eq!(
        child.foreign_keys,
        vec![foreign_key("pa", "parent", "a"), foreign_key("pb", "parent", "b")]
    );

    let audit = fixture.provider.describe_table("audit").await.unwrap();
    assert_eq!(audit.foreign_keys, vec![foreign_key("order_id", "orders", "id")]);

    let relationships = fixture.provider.relationships().await.unwrap();
    assert_eq!(relationships.len(), 4);
    let from_audit: Vec<_> = relationships
        .iter()
        .filter(|relationship| relationship.source_table == "audit")
        .collect();
    assert_eq!(from_audit.len(), 1);
    assert_eq!(from_audit[0].target_table, "orders");
    assert_eq!(from_audit[0].constraint_name, "owner_fk");

    fixture.teardown().await;
}

#[tokio::test]
async fn test_exact_numerics_keep_every_digit() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    fixture
        .execute(&[
            "CREATE TABLE {schema}.ledger (id INTEGER PRIMARY KEY, amount NUMERIC(30, 4))",
            "INSERT INTO {schema}.ledger VALUES (1, 1234567890123456.7891), (2, 12.5)",
        ])
        .await;

    let page = fixture.provider.query_page(&QuerySpec::new("ledger")).await.unwrap();
    assert_eq!(page.rows[0]["amount"], json!("1234567890123456.7891"));
    assert_eq!(page.rows[1]["amount"], json!(12.5));

    let csv = String::from_utf8(encode(&page, ExportFormat::Csv).unwrap()).unwrap();
    assert!(csv.contains("1,1234567890123456.7891"), "{csv}");

    let stats = pg_dumper::compute_stats(&page);
    let amount = stats.iter().find(|stats| stats.column == "amount").unwrap();
    assert_eq!(amount.max, "1234567890123456.7891".parse::<f64>().ok());

    fixture.teardown().await;
}

#[tokio::test]
async fn test_table_without_columns_is_listed() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    fixture.execute(&["CREATE TABLE {schema}.placeholder ()"]).await;

    let tables = fixture.provider.list_tables().await.unwrap();
    let placeholder = tables.iter().find(|table| table.name == "placeholder").unwrap();
    assert!(placeholder.columns.is_empty());
    assert_eq!(tables.len(), 4);

    let page = fixture.provider.query_page(&QuerySpec::new("placeholder")).await.unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 0);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_fixed_width_and_text_projected_types() {
    let Some(fixture) = fixture(BrowserLimits::default()).await else {
        return;
    };

    fixture
        .execute(&[
            "CREATE TABLE {schema}.shifts (code CHAR(3) PRIMARY KEY, opens TIMETZ, elapsed INTERVAL)",
            "INSERT INTO {schema}.shifts VALUES ('AB', '10:00:00+02', '2 days'), ('CD', '11:00:00+00', '3 hours')",
        ])
        .await;

    let page = fixture.provider.query_page(&QuerySpec::new("shifts")).await.unwrap();
    assert_eq!(page.rows[0]["code"], json!("AB "));
    assert_eq!(page.rows[0]["opens"], json!("10:00:00+02"));
    assert_eq!(page.rows[0]["elapsed"], json!("2 days"));

    let long_shifts = QuerySpec::new("shifts").with_filter(
        "elapsed",
        FilterPredicate::Range {
            min: Some("1 day".into()),
            max: None,
        },
    );
    assert_eq!(fixture.provider.count_matching(&long_shifts).await.unwrap(), 1);

    let opening = QuerySpec::new("shifts")
        .with_filter("opens", FilterPredicate::Equals { value: "10:00:00+02".into() });
    assert_eq!(fixture.provider.count_matching(&opening).await.unwrap(), 1);

    let malformed = QuerySpec::new("shifts")
        .with_filter("elapsed", FilterPredicate::Equals { value: "a while".into() });
    assert!(matches!(
        fixture.provider.count_matching(&malformed).await,
        Err(Error::Validation(_))
    ));

    fixture.teardown().await;
}
