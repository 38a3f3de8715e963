//! Concurrent watches sharing one probe, one submitter and one shutdown token.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use stoplimit_bot::{exit_code, run_watches, AppConfig, Application};
use stoplimit_core::{InstrumentFilters, OrderSide, Price, Size, Symbol};
use stoplimit_executor::MockOrderSubmitter;
use stoplimit_market::{BoxFuture, MarketDataProbe, MarketDataResult, MockMarketDataProbe};
use stoplimit_watcher::{WatchError, WatchOutcome, WatchParams, WatchRequest, WatchState};
use tokio_util::sync::CancellationToken;

fn probe(prices: &[rust_decimal::Decimal]) -> Arc<MockMarketDataProbe> {
    let probe = MockMarketDataProbe::with_prices(prices.iter().copied().map(Price::new));
    probe.set_filters(Ok(InstrumentFilters::new(
        Some(Size::new(dec!(0.001))),
        Some(Price::new(dec!(0.01))),
    )));
    Arc::new(probe)
}

fn request(
    symbol: &str,
    side: OrderSide,
    stop: rust_decimal::Decimal,
    timeout_secs: u64,
) -> WatchRequest {
    WatchParams {
        symbol: symbol.to_string(),
        side,
        stop_price: Price::new(stop),
        limit_price: Price::new(stop),
        quantity: Size::new(dec!(1)),
        check_interval: Duration::from_secs(1),
        timeout: Duration::from_secs(timeout_secs),
        dry_run: true,
    }
    .validate()
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_reports_follow_request_order() {
    let probe = probe(&[dec!(100)]);
    let submitter = Arc::new(MockOrderSubmitter::new());

    let requests = vec![
        // Never triggers: price stays above the buy stop.
        request("AAAUSDT", OrderSide::Buy, dec!(150), 3),
        // Triggers on the first poll.
        request("BBBUSDT", OrderSide::Buy, dec!(95), 0),
        // Price already at or below the sell stop.
        request("CCCUSDT", OrderSide::Sell, dec!(105), 0),
    ];

    let reports = run_watches(
        probe.clone(),
        submitter.clone(),
        requests,
        CancellationToken::new(),
    )
    .await;

    let symbols: Vec<_> = reports.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, ["AAAUSDT", "BBBUSDT", "CCCUSDT"]);

    assert_eq!(reports[0].outcome.state(), WatchState::TimedOut);
    assert_eq!(reports[1].outcome.state(), WatchState::Triggered);
    assert_eq!(reports[2].outcome.state(), WatchState::Triggered);
    assert_eq!(submitter.submission_count(), 2);
    assert_eq!(exit_code(&reports), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_every_watch() {
    let probe = probe(&[dec!(100)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let shutdown = CancellationToken::new();

    let requests = vec![
        request("AAAUSDT", OrderSide::Buy, dec!(150), 0),
        request("BBBUSDT", OrderSide::Sell, dec!(50), 0),
    ];

    let handle = tokio::spawn(run_watches(
        probe.clone(),
        submitter.clone(),
        requests,
        shutdown.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(3500)).await;
    shutdown.cancel();

    let reports = handle.await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| r.outcome.state() == WatchState::Cancelled));
    assert_eq!(submitter.submission_count(), 0);
    assert_eq!(exit_code(&reports), 1);
}

/// Panics on price fetches for one symbol and delegates everything else.
struct PanickingFeed {
    inner: Arc<MockMarketDataProbe>,
    broken: &'static str,
}

impl MarketDataProbe for PanickingFeed {
    fn fetch_last_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, MarketDataResult<Price>> {
        if symbol.as_str() == self.broken {
            panic!("feed for {symbol} blew up");
        }
        self.inner.fetch_last_price(symbol)
    }

    fn fetch_filters<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, MarketDataResult<InstrumentFilters>> {
        self.inner.fetch_filters(symbol)
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_watch_does_not_drop_the_others() {
    let feed = Arc::new(PanickingFeed {
        inner: probe(&[dec!(100)]),
        broken: "BBBUSDT",
    });
    let submitter = Arc::new(MockOrderSubmitter::new());

    let requests = vec![
        request("AAAUSDT", OrderSide::Buy, dec!(150), 3),
        request("BBBUSDT", OrderSide::Buy, dec!(95), 0),
        request("CCCUSDT", OrderSide::Sell, dec!(105), 0),
    ];

    let reports = run_watches(feed, submitter.clone(), requests, CancellationToken::new()).await;

    let symbols: Vec<_> = reports.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, ["AAAUSDT", "BBBUSDT", "CCCUSDT"]);
    assert_eq!(reports[0].outcome.state(), WatchState::TimedOut);
    match &reports[1].outcome {
        WatchOutcome::Failed {
            error: WatchError::Task(msg),
        } => assert!(msg.contains("panic"), "{msg}"),
        other => panic!("expected task failure, got {other:?}"),
    }
    assert_eq!(reports[1].side, OrderSide::Buy);
    assert_eq!(reports[1].stats.polls, 0);
    assert_eq!(reports[2].outcome.state(), WatchState::Triggered);
    assert_eq!(submitter.submission_count(), 1);
    assert_eq!(exit_code(&reports), 1);
}

#[test]
fn test_application_requires_a_watch() {
    assert!(Application::new(AppConfig::default(), Vec::new()).is_err());
}

#[test]
fn test_dry_run_needs_no_credentials() {
    let app = Application::new(
        AppConfig::default(),
        vec![request("AAAUSDT", OrderSide::Buy, dec!(1), 0)],
    )
    .unwrap();
    assert!(!app.needs_credentials());
}
