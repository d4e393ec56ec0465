//! Integration tests for the crawl loop
//!
//! Listing pages are served by wiremock; records land in SQLite sinks.

use crate::common::{card, cards_for_page, fast_fetcher, listing, page_path, InstrumentedSink};
use chrono::Utc;
use shelf_harvest::config::Config;
use shelf_harvest::crawler::{crawl, CrawlSettings, FetchError, Orchestrator};
use shelf_harvest::record::PersistableRecord;
use shelf_harvest::storage::{RecordSink, SinkError, SqliteSink};
use shelf_harvest::{HarvestError, Price};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(min_saved: u64) -> CrawlSettings {
    CrawlSettings {
        min_saved,
        page_delay: Duration::ZERO,
    }
}

/// Mounts one listing page per entry, each linking to the next
async fn mount_pages(server: &MockServer, pages: &[Vec<String>]) -> String {
    for (i, cards) in pages.iter().enumerate() {
        let n = i + 1;
        let next = format!("page-{}.html", n + 1);
        let next_href = (n < pages.len()).then_some(next.as_str());

        Mock::given(method("GET"))
            .and(path(page_path(n)))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(cards, next_href)))
            .mount(server)
            .await;
    }

    format!("{}{}", server.uri(), page_path(1))
}

#[tokio::test]
async fn test_crawl_walks_all_pages() {
    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[cards_for_page(1, 3), cards_for_page(2, 2)]).await;

    let mut sink = SqliteSink::open_in_memory().unwrap();
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(100))
        .run(&start)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.saved, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(sink.count_records().unwrap(), 5);

    let record = sink
        .find_by_product_url(&format!("{}/catalogue/book-1-2/index.html", mock_server.uri()))
        .unwrap()
        .expect("Record should be stored under its absolute URL");
    assert_eq!(record.title, "Book 2 of page 1");
    assert_eq!(record.price, Price::from_cents(1201));
    assert!(record.in_stock);
    assert_eq!(
        record.image_url,
        Some(format!("{}/media/book-1-2.jpg", mock_server.uri()))
    );
}

#[tokio::test]
async fn test_second_run_saves_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("books.db");

    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[cards_for_page(1, 4), cards_for_page(2, 4)]).await;

    let first = {
        let sink = SqliteSink::open(&db_path).unwrap();
        Orchestrator::new(fast_fetcher(), sink, settings(100))
            .run(&start)
            .await
            .unwrap()
    };
    assert_eq!(first.saved, 8);

    let sink = SqliteSink::open(&db_path).unwrap();
    let mut orchestrator = Orchestrator::new(fast_fetcher(), sink, settings(100));
    let second = orchestrator.run(&start).await.unwrap();

    assert_eq!(second.saved, 0);
    assert_eq!(second.skipped, 8);
    assert_eq!(second.duplicate, 8);
    assert_eq!(orchestrator.sink().count_records().unwrap(), 8);
}

#[tokio::test]
async fn test_target_stops_mid_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(page_path(1)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&cards_for_page(1, 20), Some("page-2.html"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(page_path(2)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&cards_for_page(2, 20), Some("page-3.html"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(page_path(3)))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&cards_for_page(3, 20), None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut sink = InstrumentedSink::new();
    let start = format!("{}{}", mock_server.uri(), page_path(1));
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(25))
        .run(&start)
        .await
        .unwrap();

    assert_eq!(summary.saved, 25);
    assert_eq!(summary.skipped, 0);
    // Cards after the 25th are never looked at
    assert_eq!(sink.save_calls(), 25);
    assert_eq!(sink.lookups(), 25);
}

#[tokio::test]
async fn test_broken_cards_never_reach_sink() {
    let mock_server = MockServer::start().await;

    let cards = vec![
        card("no-title", "", "£10.00", "In stock"),
        card("good", "Good Book", "£12.50", "In stock"),
        card("no-price", "Priceless", "", "In stock"),
        r#"<li><article class="product_pod"><h3><a title="Nowhere">Nowhere</a></h3><p class="price_color">£1.00</p></article></li>"#.to_string(),
    ];
    let start = mount_pages(&mock_server, &[cards]).await;

    let mut sink = InstrumentedSink::new();
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(10))
        .run(&start)
        .await
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.broken, 3);
    assert_eq!(summary.skipped, 3);
    assert_eq!(sink.save_calls(), 1);
    assert_eq!(sink.lookups(), 1);

    let stored = sink.inner().all_records().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Good Book");
    assert_eq!(stored[0].price, Price::from_cents(1250));
}

#[tokio::test]
async fn test_duplicates_skip_persistence() {
    let mock_server = MockServer::start().await;

    let cards = vec![
        card("seen", "Seen Before", "£5.00", "In stock"),
        card("fresh", "Fresh", "£6.00", "Out of stock"),
        card("fresh", "Fresh Again", "£6.00", "Out of stock"),
    ];
    let start = mount_pages(&mock_server, &[cards]).await;

    let mut sink = InstrumentedSink::new();
    sink.inner_mut()
        .save(&PersistableRecord {
            title: "Seen Before".to_string(),
            price: Price::from_cents(500),
            in_stock: true,
            product_url: format!("{}/catalogue/seen/index.html", mock_server.uri()),
            image_url: None,
            created_at: Utc::now(),
        })
        .unwrap();

    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(10))
        .run(&start)
        .await
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.duplicate, 2);
    assert_eq!(summary.skipped, 2);
    // Only the fresh card is offered to the sink
    assert_eq!(sink.save_calls(), 1);
    assert_eq!(sink.inner().count_records().unwrap(), 2);

    let fresh = sink
        .find_by_product_url(&format!("{}/catalogue/fresh/index.html", mock_server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(fresh.title, "Fresh");
    assert!(!fresh.in_stock);
}

#[tokio::test]
async fn test_transient_failure_skips_one_record() {
    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[cards_for_page(1, 20)]).await;

    let mut sink = InstrumentedSink::new()
        .failing_on(7, SinkError::Transient("database is locked".to_string()));
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(100))
        .run(&start)
        .await
        .unwrap();

    assert_eq!(summary.saved, 19);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(sink.save_calls(), 20);

    let missing = format!("{}/catalogue/book-1-7/index.html", mock_server.uri());
    assert!(sink.find_by_product_url(&missing).unwrap().is_none());
    assert_eq!(sink.inner().count_records().unwrap(), 19);
}

#[tokio::test]
async fn test_unusable_sink_aborts_crawl() {
    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[cards_for_page(1, 5), cards_for_page(2, 5)]).await;

    let mut sink =
        InstrumentedSink::new().failing_on(3, SinkError::Unusable("disk I/O error".to_string()));
    let result = Orchestrator::new(fast_fetcher(), &mut sink, settings(100))
        .run(&start)
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Sink(SinkError::Unusable(_)))
    ));
    assert_eq!(sink.save_calls(), 3);
    assert_eq!(sink.inner().count_records().unwrap(), 2);
}

#[tokio::test]
async fn test_fetch_failure_aborts_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(page_path(1)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&cards_for_page(1, 3), Some("page-2.html"))),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(page_path(2)))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&mock_server)
        .await;

    let mut sink = SqliteSink::open_in_memory().unwrap();
    let start = format!("{}{}", mock_server.uri(), page_path(1));
    let result = Orchestrator::new(fast_fetcher(), &mut sink, settings(100))
        .run(&start)
        .await;

    match result {
        Err(HarvestError::Fetch(FetchError::Exhausted { url, attempts, .. })) => {
            assert_eq!(url, format!("{}{}", mock_server.uri(), page_path(2)));
            assert_eq!(attempts, 5);
        }
        other => panic!("Expected fetch failure, got {:?}", other),
    }

    // Records committed before the failure stay committed
    assert_eq!(sink.count_records().unwrap(), 3);
}

#[tokio::test]
async fn test_zero_target_fetches_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&cards_for_page(1, 3), None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut sink = InstrumentedSink::new();
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(0))
        .run(&format!("{}{}", mock_server.uri(), page_path(1)))
        .await
        .unwrap();

    assert_eq!(summary, Default::default());
    assert_eq!(sink.lookups(), 0);
}

#[tokio::test]
async fn test_page_without_cards_ends_crawl() {
    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[vec![]]).await;

    let mut sink = InstrumentedSink::new();
    let summary = Orchestrator::new(fast_fetcher(), &mut sink, settings(10))
        .run(&start)
        .await
        .unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn test_delay_between_pages() {
    let mock_server = MockServer::start().await;
    let start = mount_pages(
        &mock_server,
        &[cards_for_page(1, 1), cards_for_page(2, 1), cards_for_page(3, 1)],
    )
    .await;

    let delay = Duration::from_millis(100);
    let mut sink = SqliteSink::open_in_memory().unwrap();
    let started = Instant::now();
    let summary = Orchestrator::new(
        fast_fetcher(),
        &mut sink,
        CrawlSettings {
            min_saved: 10,
            page_delay: delay,
        },
    )
    .run(&start)
    .await
    .unwrap();

    assert_eq!(summary.saved, 3);
    // Two page transitions, no pause after the last page
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test]
async fn test_crawl_into_database_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");

    let mock_server = MockServer::start().await;
    let start = mount_pages(&mock_server, &[cards_for_page(1, 3)]).await;

    let mut config = Config::default();
    config.crawler.page_delay_ms = 0;
    config.output.database_path = db_path.to_string_lossy().into_owned();

    let summary = crawl(&config, &start).await.expect("Crawl failed");
    assert_eq!(summary.saved, 3);

    let sink = SqliteSink::open(&db_path).unwrap();
    assert_eq!(sink.count_records().unwrap(), 3);
}

#[tokio::test]
async fn test_crawl_rejects_non_http_start_url() {
    let result = crawl(&Config::default(), "ftp://books.example/index.html").await;
    assert!(matches!(result, Err(HarvestError::Config(_))));
}
