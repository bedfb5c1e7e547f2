use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kizashi_core::common::TimeFrame;
use kizashi_core::config::GatewayConfig;
use kizashi_core::market::entity::{Candle, Ticker};
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataGateway;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// 计价货币
const QUOTE_ASSET: &str = "USDT";
/// 单次 K 线请求上限
const MAX_KLINE_LIMIT: usize = 1000;
/// 交易所返回的"无效交易对"错误码
const INVALID_SYMBOL_CODE: i64 = -1121;

/// # Summary
/// Binance 现货 REST 行情网关。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端通讯，每个请求受配置的超时约束。
/// - 不做重试；限流响应映射为 `MarketError::RateLimited`。
#[derive(Clone)]
pub struct BinanceGateway {
    // 内部使用的 HTTP 客户端
    client: Client,
    // 接口根地址，不含末尾斜杠
    base_url: String,
}

impl BinanceGateway {
    /// # Summary
    /// 创建网关实例。
    ///
    /// # Logic
    /// 1. 按配置设置请求超时。
    /// 2. 初始化 reqwest 客户端。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Unknown`。
    pub fn new(config: &GatewayConfig) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MarketError::Unknown(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 发起 GET 请求并返回响应正文
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(map_status(status, &body))
        }
    }

    /// 全部 24h 行情中的 USDT 交易对
    async fn usdt_tickers(&self) -> Result<Vec<Ticker>, MarketError> {
        let body = self.get_text("/api/v3/ticker/24hr", &[]).await?;
        parse_tickers(&body)
    }
}

/// # Summary
/// 将非成功状态码映射为领域错误。
///
/// # Logic
/// 1. 429 / 418 视为限流。
/// 2. 响应体为交易所错误且错误码为无效交易对时返回 `NotFound`。
/// 3. 5xx 视为网络错误，其他情况归为未知错误。
fn map_status(status: StatusCode, body: &str) -> MarketError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        return MarketError::RateLimited(format!("HTTP {}", status));
    }
    if let Ok(api) = serde_json::from_str::<ApiError>(body) {
        if api.code == INVALID_SYMBOL_CODE {
            return MarketError::NotFound;
        }
        return MarketError::Unknown(format!("HTTP {}: {} ({})", status, api.msg, api.code));
    }
    if status == StatusCode::NOT_FOUND {
        return MarketError::NotFound;
    }
    if status.is_server_error() {
        return MarketError::Network(format!("HTTP {}", status));
    }
    MarketError::Unknown(format!("HTTP {}", status))
}

/// 交易所错误响应
#[derive(Deserialize, Debug)]
struct ApiError {
    code: i64,
    msg: String,
}

/// # Summary
/// K 线数组中的单行。
///
/// # Invariants
/// - 映射自 `/api/v3/klines`：
///   `[开盘时间, 开, 高, 低, 收, 成交量, 收盘时间, 成交额, 笔数, 主动买入量, 主动买入额, 保留字段]`。
#[derive(Deserialize, Debug)]
struct KlineRow(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
);

/// 24h 行情原始结构
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
    volume: String,
}

/// 交易规则原始结构
#[derive(Deserialize, Debug)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    quote_asset: String,
}

/// 解析数值字符串，拒绝非有限值
fn parse_number(field: &str, raw: &str) -> Result<f64, MarketError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| MarketError::Parse(format!("{} is not a number: {:?}", field, raw)))?;
    if !value.is_finite() {
        return Err(MarketError::Parse(format!("{} is not finite: {:?}", field, raw)));
    }
    Ok(value)
}

/// # Summary
/// 解析 `/api/v3/klines` 响应。
///
/// # Logic
/// 1. 逐行解析 OHLCV 数值字符串并校验有限性。
/// 2. 拒绝最高价低于最低价的行。
/// 3. 按开盘时间升序排列。
pub fn parse_klines(body: &str) -> Result<Vec<Candle>, MarketError> {
    let rows: Vec<KlineRow> =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let time = Utc
            .timestamp_millis_opt(row.0)
            .single()
            .ok_or_else(|| MarketError::Parse(format!("Invalid open time: {}", row.0)))?;
        let candle = Candle {
            time,
            open: parse_number("open", &row.1)?,
            high: parse_number("high", &row.2)?,
            low: parse_number("low", &row.3)?,
            close: parse_number("close", &row.4)?,
            volume: parse_number("volume", &row.5)?,
        };
        if candle.high < candle.low {
            return Err(MarketError::Parse(format!(
                "High below low at {}",
                candle.time
            )));
        }
        candles.push(candle);
    }
    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

/// # Summary
/// 解析 `/api/v3/ticker/24hr` 响应，只保留 USDT 计价且有成交价的交易对。
pub fn parse_tickers(body: &str) -> Result<Vec<Ticker>, MarketError> {
    let raw: Vec<RawTicker> =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    let mut tickers = Vec::new();
    for t in raw.into_iter().filter(|t| t.symbol.ends_with(QUOTE_ASSET)) {
        let ticker = Ticker {
            last_price: parse_number("lastPrice", &t.last_price)?,
            price_change_percent: parse_number("priceChangePercent", &t.price_change_percent)?,
            quote_volume: parse_number("quoteVolume", &t.quote_volume)?,
            volume: parse_number("volume", &t.volume)?,
            symbol: t.symbol,
        };
        if ticker.last_price > 0.0 {
            tickers.push(ticker);
        }
    }
    Ok(tickers)
}

/// # Summary
/// 解析 `/api/v3/exchangeInfo` 响应，返回处于交易状态的 USDT 交易对。
pub fn parse_usdt_symbols(body: &str) -> Result<Vec<String>, MarketError> {
    let info: ExchangeInfo =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;
    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING" && s.quote_asset == QUOTE_ASSET)
        .map(|s| s.symbol)
        .collect())
}

#[async_trait]
impl MarketDataGateway for BinanceGateway {
    /// # Summary
    /// 抓取最近 `limit` 根 K 线。
    ///
    /// # Logic
    /// 1. `TimeFrame` 的显示形式即为 interval 参数。
    /// 2. `limit` 截断到接口上限 1000。
    async fn get_kline_data(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let limit = limit.clamp(1, MAX_KLINE_LIMIT);
        let body = self
            .get_text(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_uppercase()),
                    ("interval", timeframe.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let candles = parse_klines(&body)?;
        debug!(
            "Fetched {} {} candles for {}",
            candles.len(),
            timeframe,
            symbol
        );
        Ok(candles)
    }

    async fn get_top_volume_pairs(&self, n: usize) -> Result<Vec<Ticker>, MarketError> {
        let mut tickers = self.usdt_tickers().await?;
        tickers.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));
        tickers.truncate(n);
        Ok(tickers)
    }

    async fn get_all_usdt_pairs(&self) -> Result<Vec<String>, MarketError> {
        let body = self.get_text("/api/v3/exchangeInfo", &[]).await?;
        parse_usdt_symbols(&body)
    }

    async fn get_top_gainers(&self, n: usize) -> Result<Vec<Ticker>, MarketError> {
        let mut tickers = self.usdt_tickers().await?;
        tickers.sort_by(|a, b| b.price_change_percent.total_cmp(&a.price_change_percent));
        tickers.truncate(n);
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, ""),
            MarketError::RateLimited(_)
        ));
        assert!(map_status(StatusCode::from_u16(418).unwrap(), "").is_transient());
        assert_eq!(
            map_status(
                StatusCode::BAD_REQUEST,
                r#"{"code":-1121,"msg":"Invalid symbol."}"#
            ),
            MarketError::NotFound
        );
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "<html>"),
            MarketError::Network(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, r#"{"code":-1100,"msg":"Illegal characters"}"#),
            MarketError::Unknown(_)
        ));
    }
}
