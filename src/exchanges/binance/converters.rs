use crate::core::errors::ExchangeError;
use crate::core::types::{PriceStats, Snapshot, WalletBalances};
use crate::exchanges::binance::types::{
    BinanceTicker24h, BinanceTickerPrice, BinanceWalletBalance,
};
use std::collections::BTreeMap;

/// Parse one of the exchange's decimal-as-string fields. A field that fails
/// to parse means a malformed body, which classifies as retriable.
fn parse_decimal(field: &str, value: &str) -> Result<f64, ExchangeError> {
    value
        .parse::<f64>()
        .map_err(|_| ExchangeError::Malformed(format!("non-numeric {field}: {value:?}")))
}

pub fn ticker_price(ticker: &BinanceTickerPrice) -> Result<f64, ExchangeError> {
    parse_decimal("price", &ticker.price)
}

pub fn ticker_to_snapshot(ticker: &BinanceTicker24h) -> Result<Snapshot, ExchangeError> {
    Ok(Snapshot::price(PriceStats {
        last_price: parse_decimal("lastPrice", &ticker.last_price)?,
        change_percent_24h: parse_decimal("priceChangePercent", &ticker.price_change_percent)?,
        high_24h: parse_decimal("highPrice", &ticker.high_price)?,
        low_24h: parse_decimal("lowPrice", &ticker.low_price)?,
    }))
}

/// Aggregate the per-wallet balances, converting the BTC-denominated totals
/// to USDT via the reference price fetched in the same cycle.
pub fn wallet_to_snapshot(
    balances: &[BinanceWalletBalance],
    btc_usdt_price: f64,
) -> Result<Snapshot, ExchangeError> {
    let mut balances_btc = BTreeMap::new();
    let mut total_btc = 0.0;

    for entry in balances {
        let balance = parse_decimal("balance", &entry.balance)?;
        total_btc += balance;
        balances_btc.insert(entry.wallet_name.clone(), balance);
    }

    Ok(Snapshot::wallet(WalletBalances {
        balances_btc,
        total_btc,
        total_usdt: total_btc * btc_usdt_price,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SnapshotData;

    fn ticker(last: &str) -> BinanceTicker24h {
        BinanceTicker24h {
            symbol: "BTCUSDT".to_string(),
            last_price: last.to_string(),
            price_change_percent: "-1.25".to_string(),
            high_price: "61000.00".to_string(),
            low_price: "59000.00".to_string(),
        }
    }

    #[test]
    fn ticker_fields_are_parsed() {
        let snapshot = ticker_to_snapshot(&ticker("60000.50")).unwrap();
        let stats = snapshot.as_price().unwrap();
        assert_eq!(stats.last_price, 60000.50);
        assert_eq!(stats.change_percent_24h, -1.25);
        assert_eq!(stats.high_24h, 61000.0);
        assert_eq!(stats.low_24h, 59000.0);
    }

    #[test]
    fn garbage_price_is_malformed_not_fatal() {
        let err = ticker_to_snapshot(&ticker("not-a-number")).unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    #[test]
    fn wallet_totals_convert_via_reference_price() {
        let balances = vec![
            BinanceWalletBalance {
                wallet_name: "Spot".to_string(),
                activate: true,
                balance: "0.5".to_string(),
            },
            BinanceWalletBalance {
                wallet_name: "Funding".to_string(),
                activate: true,
                balance: "0.25".to_string(),
            },
        ];

        let snapshot = wallet_to_snapshot(&balances, 60_000.0).unwrap();
        match &snapshot.data {
            SnapshotData::Wallet(wallet) => {
                assert_eq!(wallet.total_btc, 0.75);
                assert_eq!(wallet.total_usdt, 45_000.0);
                assert_eq!(wallet.balances_btc["Spot"], 0.5);
                assert_eq!(wallet.balances_btc["Funding"], 0.25);
            }
            SnapshotData::Price(_) => panic!("expected wallet snapshot"),
        }
    }
}
