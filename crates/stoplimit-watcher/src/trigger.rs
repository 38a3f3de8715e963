//! Stop trigger evaluation.

use stoplimit_core::{OrderSide, Price};

/// Whether `last` has crossed `stop` for an order on `side`.
///
/// A sell stop fires when the price falls to or below the stop; a buy stop
/// fires when it rises to or above it. The boundary is inclusive.
#[inline]
pub fn is_triggered(side: OrderSide, stop: Price, last: Price) -> bool {
    match side {
        OrderSide::Sell => last <= stop,
        OrderSide::Buy => last >= stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_triggered_table() {
        let cases = [
            (OrderSide::Sell, dec!(100), dec!(100), true),
            (OrderSide::Sell, dec!(100), dec!(100.01), false),
            (OrderSide::Sell, dec!(100), dec!(99.99), true),
            (OrderSide::Buy, dec!(100), dec!(100), true),
            (OrderSide::Buy, dec!(100), dec!(99.99), false),
            (OrderSide::Buy, dec!(100), dec!(100.01), true),
            (OrderSide::Sell, dec!(60000), dec!(59999), true),
            (OrderSide::Sell, dec!(60000), dec!(60200), false),
        ];
        for (side, stop, last, expected) in cases {
            assert_eq!(
                is_triggered(side, Price::new(stop), Price::new(last)),
                expected,
                "{side} stop={stop} last={last}"
            );
        }
    }

    #[test]
    fn test_trailing_zeros_do_not_matter() {
        assert!(is_triggered(
            OrderSide::Sell,
            Price::new(dec!(100.00)),
            Price::new(dec!(100))
        ));
    }
}
