//! Watch loop behaviour against a scripted price feed.
//!
//! All tests run on paused tokio time, so intervals and timeouts elapse
//! instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use stoplimit_core::{InstrumentFilters, OrderSide, OrderStatus, Price, Size};
use stoplimit_executor::{MockOrderSubmitter, OrderError};
use stoplimit_market::{MarketDataError, MockMarketDataProbe};
use stoplimit_watcher::{WatchController, WatchError, WatchOutcome, WatchParams, WatchState};
use tokio_util::sync::CancellationToken;

fn btc_filters() -> InstrumentFilters {
    InstrumentFilters::new(Some(Size::new(dec!(0.00001))), Some(Price::new(dec!(0.01))))
}

fn sell_params() -> WatchParams {
    WatchParams {
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Sell,
        stop_price: Price::new(dec!(60000)),
        limit_price: Price::new(dec!(59900)),
        quantity: Size::new(dec!(0.001)),
        check_interval: Duration::from_secs(1),
        timeout: Duration::from_secs(5),
        dry_run: true,
    }
}

fn prices(values: &[rust_decimal::Decimal]) -> Arc<MockMarketDataProbe> {
    let probe = MockMarketDataProbe::with_prices(values.iter().copied().map(Price::new));
    probe.set_filters(Ok(btc_filters()));
    Arc::new(probe)
}

fn controller(
    probe: &Arc<MockMarketDataProbe>,
    submitter: &Arc<MockOrderSubmitter>,
    cancel: CancellationToken,
) -> WatchController {
    WatchController::new(probe.clone(), submitter.clone(), cancel)
}

#[tokio::test(start_paused = true)]
async fn test_sell_stop_triggers_on_third_poll() {
    let probe = prices(&[dec!(60500), dec!(60200), dec!(59999)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    match &report.outcome {
        WatchOutcome::Triggered {
            trigger_price,
            order,
        } => {
            assert_eq!(*trigger_price, Price::new(dec!(59999)));
            let order = order.as_ref().unwrap();
            assert_eq!(order.status, OrderStatus::DryRun);
            assert_eq!(order.quantity, Size::new(dec!(0.001)));
            assert_eq!(order.price, Price::new(dec!(59900)));
        }
        other => panic!("expected Triggered, got {other:?}"),
    }
    assert!(report.outcome.is_success());
    assert_eq!(report.stats.polls, 3);
    assert_eq!(report.stats.orders_submitted, 1);
    assert_eq!(report.stats.market_data_errors, 0);
    assert!(report.stats.elapsed >= Duration::from_secs(2));
    assert!(report.stats.elapsed < Duration::from_secs(3));

    let submissions = submitter.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].side, OrderSide::Sell);
    assert!(submissions[0].dry_run);
    assert_eq!(probe.filter_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_without_submitting() {
    let probe = prices(&[dec!(61000)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert!(matches!(report.outcome, WatchOutcome::TimedOut));
    assert!(report.outcome.is_success());
    assert_eq!(submitter.submission_count(), 0);
    assert_eq!(report.stats.orders_submitted, 0);
    // Polls at t = 0..=4s; the deadline lands with the wake-up at t = 5s.
    assert_eq!(report.stats.polls, 5);
    assert!(report.stats.elapsed >= Duration::from_secs(5));
    assert!(report.stats.elapsed < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_fetch_ends_at_deadline() {
    let feed = prices(&[dec!(59000)]);
    feed.set_latency(Duration::from_secs(100));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&feed, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert!(matches!(report.outcome, WatchOutcome::TimedOut));
    assert_eq!(report.stats.polls, 0);
    assert_eq!(feed.price_calls(), 0);
    assert!(report.stats.elapsed >= Duration::from_secs(5));
    assert!(report.stats.elapsed < Duration::from_secs(6));
    assert_eq!(submitter.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_long_interval_ends_at_deadline() {
    let feed = prices(&[dec!(61000)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = WatchParams {
        check_interval: Duration::from_secs(60),
        ..sell_params()
    }
    .validate()
    .unwrap();

    let report = controller(&feed, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert!(matches!(report.outcome, WatchOutcome::TimedOut));
    assert_eq!(report.stats.polls, 1);
    assert!(report.stats.elapsed >= Duration::from_secs(5));
    assert!(report.stats.elapsed < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_transient_fetch_failure_is_retried() {
    let probe = prices(&[]);
    probe.push_error(MarketDataError::HttpClient("connection reset".to_string()));
    probe.push_price(Price::new(dec!(59000)));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert_eq!(report.outcome.state(), WatchState::Triggered);
    assert_eq!(report.outcome.trigger_price(), Some(Price::new(dec!(59000))));
    assert_eq!(report.stats.market_data_errors, 1);
    assert_eq!(report.stats.orders_submitted, 1);
    assert_eq!(report.stats.polls, 2);
}

#[tokio::test(start_paused = true)]
async fn test_buy_stop_triggers_at_boundary() {
    let probe = prices(&[dec!(99.99), dec!(100)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = WatchParams {
        symbol: "ethusdt".to_string(),
        side: OrderSide::Buy,
        stop_price: Price::new(dec!(100)),
        limit_price: Price::new(dec!(100.505)),
        quantity: Size::new(dec!(1.234567)),
        dry_run: false,
        ..sell_params()
    }
    .validate()
    .unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert_eq!(report.outcome.trigger_price(), Some(Price::new(dec!(100))));
    let adjusted = report.adjusted.unwrap();
    assert_eq!(adjusted.quantity, Size::new(dec!(1.23456)));
    assert_eq!(adjusted.limit_price, Price::new(dec!(100.5)));

    let order = report.outcome.order().unwrap().as_ref().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert!(order.order_id.is_some());
    assert!(!submitter.submissions()[0].dry_run);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_sleep() {
    let probe = prices(&[dec!(61000)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = WatchParams {
        timeout: Duration::ZERO,
        ..sell_params()
    }
    .validate()
    .unwrap();
    let cancel = CancellationToken::new();
    let watch = controller(&probe, &submitter, cancel.clone());

    let handle = tokio::spawn(async move { watch.run(&request).await });
    tokio::time::sleep(Duration::from_millis(2500)).await;
    cancel.cancel();
    let report = handle.await.unwrap();

    assert!(matches!(report.outcome, WatchOutcome::Cancelled));
    assert!(!report.outcome.is_success());
    assert_eq!(report.stats.polls, 3);
    assert_eq!(submitter.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_inflight_fetch() {
    let probe = prices(&[dec!(59000)]);
    probe.set_latency(Duration::from_secs(10));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();
    let cancel = CancellationToken::new();
    let watch = controller(&probe, &submitter, cancel.clone());

    let handle = tokio::spawn(async move { watch.run(&request).await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    let report = handle.await.unwrap();

    assert!(matches!(report.outcome, WatchOutcome::Cancelled));
    assert_eq!(report.stats.polls, 0);
    assert_eq!(submitter.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_skips_initialization() {
    let probe = prices(&[dec!(59000)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = controller(&probe, &submitter, cancel).run(&request).await;

    assert!(matches!(report.outcome, WatchOutcome::Cancelled));
    assert_eq!(probe.filter_calls(), 0);
    assert!(report.adjusted.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_quantity_rounding_to_zero_fails_before_polling() {
    let probe = prices(&[dec!(59000)]);
    probe.set_filters(Ok(InstrumentFilters::new(
        Some(Size::new(dec!(0.01))),
        Some(Price::new(dec!(0.01))),
    )));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    match &report.outcome {
        WatchOutcome::Failed {
            error: WatchError::Configuration(msg),
        } => assert!(msg.contains("quantity"), "{msg}"),
        other => panic!("expected configuration failure, got {other:?}"),
    }
    assert_eq!(report.stats.polls, 0);
    assert_eq!(probe.price_calls(), 0);
    assert_eq!(submitter.submission_count(), 0);
    assert_eq!(report.adjusted.map(|a| a.quantity), Some(Size::ZERO));
}

#[tokio::test(start_paused = true)]
async fn test_limit_price_rounding_to_zero_fails_before_polling() {
    let feed = prices(&[dec!(0.1)]);
    feed.set_filters(Ok(InstrumentFilters::new(
        Some(Size::new(dec!(0.00001))),
        Some(Price::new(dec!(1))),
    )));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = WatchParams {
        stop_price: Price::new(dec!(0.6)),
        limit_price: Price::new(dec!(0.5)),
        ..sell_params()
    }
    .validate()
    .unwrap();

    let report = controller(&feed, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    match &report.outcome {
        WatchOutcome::Failed {
            error: WatchError::Configuration(msg),
        } => assert!(msg.contains("limit price"), "{msg}"),
        other => panic!("expected configuration failure, got {other:?}"),
    }
    assert_eq!(report.stats.polls, 0);
    assert_eq!(feed.price_calls(), 0);
    assert_eq!(submitter.submission_count(), 0);
    let adjusted = report.adjusted.unwrap();
    assert_eq!(adjusted.quantity, Size::new(dec!(0.001)));
    assert_eq!(adjusted.limit_price, Price::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_huge_quantity_at_fine_step_is_kept_exact() {
    let feed = prices(&[dec!(59000)]);
    feed.set_filters(Ok(InstrumentFilters::new(
        Some(Size::new(dec!(0.00000001))),
        Some(Price::new(dec!(0.01))),
    )));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let quantity = Size::new(dec!(100000000000000000000000));
    let request = WatchParams {
        quantity,
        ..sell_params()
    }
    .validate()
    .unwrap();

    let report = controller(&feed, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    assert_eq!(report.adjusted.map(|a| a.quantity), Some(quantity));
    assert_eq!(submitter.submissions()[0].quantity, quantity);
}

#[tokio::test(start_paused = true)]
async fn test_unlisted_symbol_fails_fast() {
    let probe = prices(&[dec!(59000)]);
    probe.set_filters(Err(MarketDataError::SymbolNotFound("BTCUSDT".to_string())));
    let submitter = Arc::new(MockOrderSubmitter::new());
    let request = sell_params().validate().unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    assert!(matches!(
        report.outcome,
        WatchOutcome::Failed {
            error: WatchError::MarketData(MarketDataError::SymbolNotFound(_))
        }
    ));
    assert_eq!(report.stats.polls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_order_rejection_is_terminal() {
    let probe = prices(&[dec!(59000), dec!(58000)]);
    let submitter = Arc::new(MockOrderSubmitter::new());
    submitter.set_error(OrderError::Rejected {
        status: 400,
        code: -2010,
        msg: "insufficient balance".to_string(),
    });
    let request = WatchParams {
        dry_run: false,
        ..sell_params()
    }
    .validate()
    .unwrap();

    let report = controller(&probe, &submitter, CancellationToken::new())
        .run(&request)
        .await;

    match report.outcome.order() {
        Some(Err(err)) => assert!(err.is_rejection()),
        other => panic!("expected rejected order, got {other:?}"),
    }
    assert!(!report.outcome.is_success());
    assert_eq!(report.stats.orders_submitted, 1);
    assert_eq!(submitter.submission_count(), 1);
    assert_eq!(report.stats.polls, 1);
}
