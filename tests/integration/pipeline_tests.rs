//! Integration tests for the fetch pipeline
//!
//! These tests use wiremock to stand in for the directory and exercise
//! batches, the department enumeration cache and output shaping end-to-end.

use sinta_harvest::cache::{CacheStore, JsonFileCache, SqliteCache};
use sinta_harvest::config::{CacheBackend, Config};
use sinta_harvest::{Identifier, Identifiers, Output, OutputFormat, SintaClient, SintaError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTHOR_PAGE: &str = include_str!("../fixtures/author.html");
const AFFILIATION_PAGE: &str = include_str!("../fixtures/affiliation.html");
const DEPARTMENT_PAGE: &str = include_str!("../fixtures/department.html");
const LISTING_PAGE_1: &str = include_str!("../fixtures/listing_page1.html");
const LISTING_PAGE_2: &str = include_str!("../fixtures/listing_page2.html");
const LISTING_EMPTY: &str = include_str!("../fixtures/listing_empty.html");

const LISTING_PATH: &str = "/affiliations/departments/404/001002";

/// Creates a test configuration pointed at the mock server, caching in `dir`
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::for_domain(server.uri());
    config.fetcher.request_timeout_secs = 5;
    config.fetcher.max_concurrent_fetches = 4;
    config.cache.directory = Some(dir.to_path_buf());
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mounts the affiliation profile and the given listing pages, each expected once
async fn mount_listing_pages(server: &MockServer, pages: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/affiliations/profile/404"))
        .respond_with(html(AFFILIATION_PAGE))
        .expect(1)
        .mount(server)
        .await;

    for (page, body) in pages {
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("page", *page))
            .respond_with(html(body))
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Mounts a three-page listing plus department profiles
async fn mount_listing(server: &MockServer) {
    mount_listing_pages(
        server,
        &[("1", LISTING_PAGE_1), ("2", LISTING_PAGE_2), ("3", LISTING_EMPTY)],
    )
    .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/departments/profile/404/ab12cd/[a-z0-9]+$"))
        .respond_with(html(DEPARTMENT_PAGE))
        .mount(server)
        .await;
}

fn affiliation_404() -> Identifier {
    Identifier::from(404u64)
}

#[tokio::test]
async fn test_author_batch_drops_failed_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/authors/profile/1", AUTHOR_PAGE).await;
    mount_page(&server, "/authors/profile/3", AUTHOR_PAGE).await;
    mount_page(&server, "/authors/profile/4", "<html><body>gone</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/authors/profile/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let ids = Identifiers::parse(["1", "2", "3", "4"]).unwrap();

    let report = client.authors_report(ids).await;

    let fetched: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(fetched, vec!["1", "3"]);
    assert_eq!(report.failed_ids(), vec!["2", "4"]);
    assert_eq!(report.attempted(), 4);
    assert!(!report.is_complete());
    assert_eq!(report.records[0].name, "Siti Rahmawati");
}

#[tokio::test]
async fn test_duplicate_ids_fetch_twice() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/authors/profile/7"))
        .respond_with(html(AUTHOR_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let output = client
        .authors(Identifiers::parse(["7", "7"]).unwrap(), OutputFormat::List)
        .await
        .unwrap();

    let records = output.into_records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}

#[tokio::test]
async fn test_dict_format_unwraps_single_affiliation() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/affiliations/profile/404", AFFILIATION_PAGE).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();

    let single = client
        .affiliations(affiliation_404(), OutputFormat::Dict)
        .await
        .unwrap();
    match single {
        Output::Single(record) => {
            assert_eq!(record.id, "404");
            assert_eq!(record.code, "001002");
            assert_eq!(record.univ_abbrev, "UC");
        }
        other => panic!("expected a single record, got {} records", other.len()),
    }

    let listed = client
        .affiliations(affiliation_404(), OutputFormat::List)
        .await
        .unwrap();
    assert!(matches!(listed, Output::List(ref records) if records.len() == 1));
}

#[tokio::test]
async fn test_table_format_columns() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/affiliations/profile/404", AFFILIATION_PAGE).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let output = client
        .affiliations(affiliation_404(), OutputFormat::Table)
        .await
        .unwrap();

    match output {
        Output::Table(table) => {
            assert_eq!(
                table.columns(),
                ["id", "code", "name", "univ_abbrev", "location", "url"]
            );
            assert_eq!(table.len(), 1);
        }
        other => panic!("expected a table, got {} records", other.len()),
    }
}

#[tokio::test]
async fn test_department_crawl_stops_at_empty_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let table = client.enumerate_departments(&affiliation_404()).await.unwrap();

    assert_eq!(table.len(), 3);
    let entry = table.get("ef34gh").unwrap();
    assert_eq!(entry.department_id, "55201");
    assert_eq!(entry.univ_id_hash, "ab12cd");
    assert_eq!(entry.full_name, "Teknik Informatika (S1)");
    assert_eq!(entry.affiliation.code, "001002");
    assert_eq!(table.get("mn78op").unwrap().level, "S2");

    // The table is persisted as one JSON file per affiliation
    assert!(dir.path().join("404.json").exists());

    // A second call is served from the cache and returns the same table
    let again = client.enumerate_departments(&affiliation_404()).await.unwrap();
    assert_eq!(again, table);
}

#[tokio::test]
async fn test_empty_listing_is_not_cached() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing_pages(&server, &[("1", LISTING_EMPTY)]).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let parent = affiliation_404();

    let result = client.enumerate_departments(&parent).await;
    assert!(matches!(result, Err(SintaError::EmptyEnumeration { ref parent }) if parent == "404"));
    assert!(JsonFileCache::new(dir.path()).get("404").unwrap().is_none());

    // Once the listing recovers the next call crawls again
    server.verify().await;
    server.reset().await;
    mount_listing(&server).await;

    let output = client
        .departments(
            Identifiers::parse(["55201"]).unwrap(),
            &parent,
            OutputFormat::List,
            None,
        )
        .await
        .unwrap();
    assert_eq!(output.len(), 1);
}

#[tokio::test]
async fn test_crawl_tolerates_gaps_up_to_streak() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing_pages(
        &server,
        &[
            ("1", LISTING_PAGE_1),
            ("2", LISTING_EMPTY),
            ("3", LISTING_PAGE_2),
            ("4", LISTING_EMPTY),
            ("5", LISTING_EMPTY),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "6"))
        .respond_with(html(LISTING_PAGE_2))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawl.empty_pages_to_stop = 2;

    let client = SintaClient::new(&config).unwrap();
    let table = client.enumerate_departments(&affiliation_404()).await.unwrap();

    let hashes: Vec<&str> = table
        .entries()
        .map(|e| e.department_id_hash.as_str())
        .collect();
    assert_eq!(hashes, vec!["ef34gh", "ij56kl", "mn78op"]);
}

#[tokio::test]
async fn test_crawl_stops_at_page_cap() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing_pages(&server, &[("1", LISTING_PAGE_1)]).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(LISTING_PAGE_2))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawl.max_pages = Some(1);

    let client = SintaClient::new(&config).unwrap();
    let table = client.enumerate_departments(&affiliation_404()).await.unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.get("mn78op").is_none());
}

#[tokio::test]
async fn test_concurrent_enumerations_share_one_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let parent = affiliation_404();

    let (a, b) = tokio::join!(
        client.enumerate_departments(&parent),
        client.enumerate_departments(&parent)
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_departments_use_cached_enumeration() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let parent = affiliation_404();

    let first = client
        .departments_report(Identifiers::parse(["55201", "61201"]).unwrap(), &parent, None)
        .await
        .unwrap();
    assert!(first.is_complete());
    let ids: Vec<&str> = first.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ef34gh", "mn78op"]);
    assert_eq!(first.records[0].name, "Teknik Informatika");
    assert_eq!(first.records[0].affiliation.id, serde_json::json!(404));

    // Served from the cache; the listing mocks expect exactly one hit each
    let second = client
        .departments(
            Identifiers::parse(["57201"]).unwrap(),
            &parent,
            OutputFormat::Dict,
            None,
        )
        .await
        .unwrap();
    match second {
        Output::Single(record) => {
            assert_eq!(record.id, "ij56kl");
            assert!(record.url.ends_with("/departments/profile/404/ab12cd/ij56kl"));
        }
        other => panic!("expected a single record, got {} records", other.len()),
    }
}

#[tokio::test]
async fn test_unknown_department_is_an_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let result = client
        .departments(
            Identifiers::parse(["Z"]).unwrap(),
            &affiliation_404(),
            OutputFormat::List,
            None,
        )
        .await;

    match result {
        Err(SintaError::NoMatchingEntries { parent, ids }) => {
            assert_eq!(parent, "404");
            assert_eq!(ids, vec!["Z"]);
        }
        Err(other) => panic!("expected NoMatchingEntries, got {}", other),
        Ok(output) => panic!("expected an error, got {} records", output.len()),
    }
}

#[tokio::test]
async fn test_cache_dir_override() {
    let server = MockServer::start().await;
    let configured = TempDir::new().unwrap();
    let override_dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let client = SintaClient::new(&create_test_config(&server, configured.path())).unwrap();
    client
        .departments(
            Identifiers::parse(["55201"]).unwrap(),
            &affiliation_404(),
            OutputFormat::List,
            Some(override_dir.path()),
        )
        .await
        .unwrap();

    let store = JsonFileCache::new(override_dir.path());
    assert_eq!(store.get("404").unwrap().unwrap().len(), 3);
    assert!(!configured.path().join("404.json").exists());
}

#[tokio::test]
async fn test_failed_crawl_persists_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/affiliations/profile/404", AFFILIATION_PAGE).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(LISTING_PAGE_1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = SintaClient::new(&create_test_config(&server, dir.path())).unwrap();
    let result = client.enumerate_departments(&affiliation_404()).await;

    assert!(matches!(result, Err(SintaError::Fetch(_))));
    assert!(JsonFileCache::new(dir.path()).get("404").unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_backend() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server).await;

    let db_path = dir.path().join("departments.db");
    let mut config = create_test_config(&server, &db_path);
    config.cache.backend = CacheBackend::Sqlite;

    let client = SintaClient::new(&config).unwrap();
    let parent = affiliation_404();
    let table = client.enumerate_departments(&parent).await.unwrap();
    assert_eq!(table.len(), 3);

    let reopened = SqliteCache::open(&db_path).unwrap();
    assert_eq!(reopened.get("404").unwrap(), Some(table));
    assert!(reopened.cached_at("404").unwrap().is_some());

    assert!(client.forget_departments(&parent).unwrap());
    assert!(reopened.get("404").unwrap().is_none());
}

#[tokio::test]
async fn test_batch_deadline_drops_slow_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/authors/profile/1", AUTHOR_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/authors/profile/2"))
        .respond_with(html(AUTHOR_PAGE).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.fetcher.batch_deadline_secs = 1;

    let client = SintaClient::new(&config).unwrap();
    let report = client
        .authors_report(Identifiers::parse(["1", "2"]).unwrap())
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].id, "1");
    assert_eq!(report.failed_ids(), vec!["2"]);
}
