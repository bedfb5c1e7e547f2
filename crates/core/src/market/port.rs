use crate::common::TimeFrame;
use crate::market::entity::{Candle, Ticker};
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 市场行情网关接口（原始数据源）。
///
/// # Invariants
/// - 返回的 K 线按时间升序排列。
/// - 返回的行情均为 USDT 计价交易对，且已通过边界校验。
/// - 实现者只负责单次请求超时，不做重试。
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// # Summary
    /// 获取指定交易对最近 `limit` 根 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 交易对代码。
    /// * `timeframe`: K 线周期。
    /// * `limit`: 请求数量上限。
    ///
    /// # Returns
    /// 成功返回升序 K 线列表。
    async fn get_kline_data(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 按 24h 成交额降序返回前 `n` 个 USDT 交易对。
    async fn get_top_volume_pairs(&self, n: usize) -> Result<Vec<Ticker>, MarketError>;

    /// # Summary
    /// 返回全部处于交易状态的 USDT 交易对代码。
    async fn get_all_usdt_pairs(&self) -> Result<Vec<String>, MarketError>;

    /// # Summary
    /// 按 24h 涨幅降序返回前 `n` 个 USDT 交易对。
    async fn get_top_gainers(&self, n: usize) -> Result<Vec<Ticker>, MarketError>;
}
