use serde::{Deserialize, Serialize};

/// 24h rolling ticker statistics. The spot (`/api/v3/ticker/24hr`) and
/// futures (`/fapi/v1/ticker/24hr`) payloads share these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceTicker24h {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    pub high_price: String,
    pub low_price: String,
}

/// Single-symbol price from `/api/v3/ticker/price`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceTickerPrice {
    pub symbol: String,
    pub price: String,
}

/// One entry of `/sapi/v1/asset/wallet/balance`. Balances are denominated
/// in BTC regardless of wallet contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceWalletBalance {
    pub wallet_name: String,
    pub activate: bool,
    pub balance: String,
}
