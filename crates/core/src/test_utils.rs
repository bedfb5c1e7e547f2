//! 测试辅助：可编排的内存行情网关与 K 线构造函数。

use crate::common::TimeFrame;
use crate::market::entity::{Candle, Ticker};
use crate::market::error::MarketError;
use crate::market::port::MarketDataGateway;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// # Summary
/// 由收盘价序列构造等间隔 K 线。
///
/// # Logic
/// 开盘价取前一根收盘价（首根取自身），高低点在开收之外各留 0.5% 影线。
pub fn candle_series(timeframe: TimeFrame, closes: &[f64], volume: f64) -> Vec<Candle> {
    let start: DateTime<Utc> = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    let step = Duration::seconds(timeframe.seconds());
    let mut prev = closes.first().copied().unwrap_or(0.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut time = start;
    for &close in closes {
        let open = prev;
        out.push(Candle {
            time,
            open,
            high: open.max(close) * 1.005,
            low: open.min(close) * 0.995,
            close,
            volume,
        });
        prev = close;
        time += step;
    }
    out
}

/// # Summary
/// 内存模拟网关，按 (交易对, 周期) 返回预置 K 线并统计抓取次数。
#[derive(Default)]
pub struct MockGateway {
    klines: DashMap<(String, TimeFrame), Vec<Candle>>,
    tickers: RwLock<Vec<Ticker>>,
    // 设置后所有 K 线请求返回该错误
    kline_error: RwLock<Option<MarketError>>,
    // 设置后所有列表请求返回该错误
    universe_error: RwLock<Option<MarketError>>,
    // 设置后仅排行请求返回该错误，全量交易对列表不受影响
    ranking_error: RwLock<Option<MarketError>>,
    kline_fetches: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_klines(&self, symbol: &str, timeframe: TimeFrame, candles: Vec<Candle>) {
        self.klines
            .insert((symbol.to_uppercase(), timeframe), candles);
    }

    pub fn set_tickers(&self, tickers: Vec<Ticker>) {
        *self.tickers.write().unwrap_or_else(|e| e.into_inner()) = tickers;
    }

    pub fn set_kline_error(&self, error: Option<MarketError>) {
        *self.kline_error.write().unwrap_or_else(|e| e.into_inner()) = error;
    }

    pub fn set_universe_error(&self, error: Option<MarketError>) {
        *self.universe_error.write().unwrap_or_else(|e| e.into_inner()) = error;
    }

    pub fn set_ranking_error(&self, error: Option<MarketError>) {
        *self.ranking_error.write().unwrap_or_else(|e| e.into_inner()) = error;
    }

    /// 累计的 K 线请求次数（含失败请求）
    pub fn kline_fetches(&self) -> usize {
        self.kline_fetches.load(Ordering::SeqCst)
    }

    fn universe(&self) -> Result<Vec<Ticker>, MarketError> {
        if let Some(err) = self
            .universe_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(err);
        }
        Ok(self
            .tickers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn ranking(&self) -> Result<Vec<Ticker>, MarketError> {
        if let Some(err) = self
            .ranking_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(err);
        }
        self.universe()
    }
}

#[async_trait]
impl MarketDataGateway for MockGateway {
    async fn get_kline_data(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        self.kline_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .kline_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(err);
        }
        let series = self
            .klines
            .get(&(symbol.to_uppercase(), timeframe))
            .ok_or(MarketError::NotFound)?;
        let start = series.len().saturating_sub(limit);
        Ok(series[start..].to_vec())
    }

    async fn get_top_volume_pairs(&self, n: usize) -> Result<Vec<Ticker>, MarketError> {
        let mut tickers = self.ranking()?;
        tickers.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));
        tickers.truncate(n);
        Ok(tickers)
    }

    async fn get_all_usdt_pairs(&self) -> Result<Vec<String>, MarketError> {
        Ok(self.universe()?.into_iter().map(|t| t.symbol).collect())
    }

    async fn get_top_gainers(&self, n: usize) -> Result<Vec<Ticker>, MarketError> {
        let mut tickers = self.ranking()?;
        tickers.sort_by(|a, b| b.price_change_percent.total_cmp(&a.price_change_percent));
        tickers.truncate(n);
        Ok(tickers)
    }
}
