//! Main application orchestration.
//!
//! Builds the shared exchange context (HTTP client, request throttle,
//! credentials) once and runs every configured watch as its own task.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;
use stoplimit_executor::{ApiCredentials, DynOrderSubmitter, RequestSigner, RestOrderSubmitter};
use stoplimit_market::{
    build_http_client, BinanceMarketClient, DynMarketDataProbe, RequestThrottle, ThrottleConfig,
};
use stoplimit_telemetry::Metrics;
use stoplimit_watcher::{
    WatchController, WatchError, WatchOutcome, WatchReport, WatchRequest, WatchStats,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    requests: Vec<WatchRequest>,
    shutdown: CancellationToken,
}

impl Application {
    /// Create a new application.
    ///
    /// # Errors
    /// `AppError::Config` if there is nothing to watch.
    pub fn new(config: AppConfig, requests: Vec<WatchRequest>) -> AppResult<Self> {
        if requests.is_empty() {
            return Err(AppError::Config(
                "no watches configured: pass --symbol or add [[watches]] to the config".to_string(),
            ));
        }
        Ok(Self {
            config,
            requests,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that cancels every watch.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether any watch will place real orders.
    pub fn needs_credentials(&self) -> bool {
        self.requests.iter().any(|r| !r.dry_run())
    }

    /// Run all watches to completion. Reports are returned in request order.
    pub async fn run(self) -> AppResult<Vec<WatchReport>> {
        let base_url = self.config.rest_base_url();
        let http = build_http_client(self.config.http_timeout())?;
        let throttle = Arc::new(RequestThrottle::new(ThrottleConfig::from(
            &self.config.throttle,
        )));
        let market = Arc::new(BinanceMarketClient::new(
            http.clone(),
            base_url.clone(),
            Arc::clone(&throttle),
        ));

        let signer = if self.needs_credentials() {
            Some(self.load_signer(&market).await?)
        } else {
            info!("All watches are dry runs, skipping credential loading");
            None
        };

        let submitter: DynOrderSubmitter = Arc::new(RestOrderSubmitter::new(
            http,
            base_url.clone(),
            signer,
            throttle,
        ));

        info!(
            network = ?self.config.network,
            base_url = %base_url,
            watches = self.requests.len(),
            "Starting watches"
        );

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, cancelling watches");
                shutdown.cancel();
            }
        });

        Ok(run_watches(market, submitter, self.requests, self.shutdown).await)
    }

    async fn load_signer(&self, market: &BinanceMarketClient) -> AppResult<Arc<RequestSigner>> {
        let creds = &self.config.credentials;
        let credentials =
            ApiCredentials::load(&creds.api_key_source(), &creds.api_secret_source())?;
        let signer = Arc::new(RequestSigner::new(credentials, self.config.recv_window_ms));

        match market.fetch_server_time().await {
            Ok(server_time) => signer.sync_server_time(server_time),
            Err(e) => warn!(error = %e, "Server time sync failed, using local clock"),
        }
        Ok(signer)
    }
}

/// Run `requests` concurrently against shared collaborators.
///
/// Each watch gets a child of `shutdown`, so cancelling it stops all of them.
/// A watch whose task panics is reported as failed; the others keep running.
/// Reports come back in request order.
pub async fn run_watches(
    probe: DynMarketDataProbe,
    submitter: DynOrderSubmitter,
    requests: Vec<WatchRequest>,
    shutdown: CancellationToken,
) -> Vec<WatchReport> {
    let count = requests.len();
    let mut tasks = JoinSet::new();
    let mut spawned = HashMap::with_capacity(count);

    for (idx, request) in requests.into_iter().enumerate() {
        let controller = WatchController::new(
            Arc::clone(&probe),
            Arc::clone(&submitter),
            shutdown.child_token(),
        );
        let task_request = request.clone();
        let handle = tasks.spawn(async move { controller.run(&task_request).await });
        spawned.insert(handle.id(), (idx, request));
    }

    let mut reports = Vec::with_capacity(count);
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, report) = match joined {
            Ok((id, report)) => (id, report),
            Err(join_err) => {
                let id = join_err.id();
                let Some((_, request)) = spawned.get(&id) else {
                    error!(error = %join_err, "Unknown watch task failed");
                    continue;
                };
                error!(symbol = %request.symbol(), error = %join_err, "Watch task failed");
                Metrics::watch_finished("failed");
                (id, task_failure_report(request, &join_err))
            }
        };
        if let Some((idx, _)) = spawned.remove(&id) {
            reports.push((idx, report));
        }
    }
    reports.sort_by_key(|(idx, _)| *idx);
    reports.into_iter().map(|(_, report)| report).collect()
}

fn task_failure_report(request: &WatchRequest, join_err: &tokio::task::JoinError) -> WatchReport {
    WatchReport {
        symbol: request.symbol().clone(),
        side: request.side(),
        stop_price: request.stop_price(),
        outcome: WatchOutcome::Failed {
            error: WatchError::Task(join_err.to_string()),
        },
        stats: WatchStats::default(),
        adjusted: None,
    }
}
