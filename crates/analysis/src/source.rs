use kizashi_cache::kline::KlineCache;
use kizashi_core::cache::port::KlineKey;
use kizashi_core::common::TimeFrame;
use kizashi_core::market::entity::Candle;
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataGateway;
use std::sync::Arc;
use tracing::debug;

/// # Summary
/// 先查缓存、未命中再请求网关的 K 线来源。
///
/// # Invariants
/// - 网关成功返回的数据立即写回缓存。
/// - 网关错误原样返回，不做重试。
#[derive(Clone)]
pub struct KlineSource {
    gateway: Arc<dyn MarketDataGateway>,
    cache: KlineCache,
}

impl KlineSource {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, cache: KlineCache) -> Self {
        Self { gateway, cache }
    }

    /// 底层行情网关
    pub fn gateway(&self) -> &Arc<dyn MarketDataGateway> {
        &self.gateway
    }

    /// # Summary
    /// 获取最近 `limit` 根 K 线。
    ///
    /// # Logic
    /// 1. 以 (交易对, 周期, 数量) 构造缓存键并查询缓存。
    /// 2. 未命中时请求网关，成功后写回缓存。
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let key = KlineKey::new(symbol, timeframe, limit);
        if let Some(candles) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(candles);
        }

        let candles = self
            .gateway
            .get_kline_data(&key.symbol, timeframe, limit)
            .await?;
        self.cache.set(&key, &candles).await;
        Ok(candles)
    }
}
