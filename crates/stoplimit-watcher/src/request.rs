//! Watch request validation.

use std::time::Duration;

use stoplimit_core::{OrderSide, Price, Size, Symbol};

use crate::error::{WatchError, WatchResult};

/// Default poll interval.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Default watch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Unvalidated watch parameters as read from the command line or config.
#[derive(Debug, Clone)]
pub struct WatchParams {
    pub symbol: String,
    pub side: OrderSide,
    pub stop_price: Price,
    pub limit_price: Price,
    pub quantity: Size,
    pub check_interval: Duration,
    /// Zero disables the timeout.
    pub timeout: Duration,
    pub dry_run: bool,
}

impl WatchParams {
    /// Validate into an immutable [`WatchRequest`].
    ///
    /// # Errors
    /// [`WatchError::Configuration`] naming the first invalid field.
    pub fn validate(self) -> WatchResult<WatchRequest> {
        let symbol = Symbol::new(&self.symbol)?;

        require_positive("stop price", self.stop_price.is_positive(), self.stop_price)?;
        require_positive("limit price", self.limit_price.is_positive(), self.limit_price)?;
        require_positive("quantity", self.quantity.is_positive(), self.quantity)?;
        if self.check_interval.is_zero() {
            return Err(WatchError::Configuration(
                "check interval must be greater than zero".to_string(),
            ));
        }

        Ok(WatchRequest {
            symbol,
            side: self.side,
            stop_price: self.stop_price,
            limit_price: self.limit_price,
            quantity: self.quantity,
            check_interval: self.check_interval,
            timeout: (!self.timeout.is_zero()).then_some(self.timeout),
            dry_run: self.dry_run,
        })
    }
}

fn require_positive(field: &str, ok: bool, value: impl std::fmt::Display) -> WatchResult<()> {
    if ok {
        Ok(())
    } else {
        Err(WatchError::Configuration(format!(
            "{field} must be greater than zero, got {value}"
        )))
    }
}

impl TryFrom<WatchParams> for WatchRequest {
    type Error = WatchError;

    fn try_from(params: WatchParams) -> Result<Self, Self::Error> {
        params.validate()
    }
}

/// A validated stop-limit watch. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    symbol: Symbol,
    side: OrderSide,
    stop_price: Price,
    limit_price: Price,
    quantity: Size,
    check_interval: Duration,
    timeout: Option<Duration>,
    dry_run: bool,
}

impl WatchRequest {
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn stop_price(&self) -> Price {
        self.stop_price
    }

    pub fn limit_price(&self) -> Price {
        self.limit_price
    }

    pub fn quantity(&self) -> Size {
        self.quantity
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// `None` when the watch runs until triggered or cancelled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
