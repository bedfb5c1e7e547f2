use crate::mem::MemCache;
use kizashi_core::cache::port::{Cache, CacheExt, KlineKey};
use kizashi_core::common::time::TimeProvider;
use kizashi_core::config::CacheConfig;
use kizashi_core::market::entity::Candle;
use std::sync::Arc;
use tracing::warn;

/// # Summary
/// K 线缓存的类型化门面。
///
/// # Invariants
/// - 缓存错误只记录日志并按未命中处理，不会向调用方传播。
/// - 同一键并发写入时最后写入者生效。
#[derive(Clone)]
pub struct KlineCache {
    inner: Arc<dyn Cache>,
}

impl KlineCache {
    pub fn new(inner: Arc<dyn Cache>) -> Self {
        Self { inner }
    }

    /// 以 `MemCache` 为后端创建
    pub fn in_memory(clock: Arc<dyn TimeProvider>, config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemCache::from_config(clock, config)))
    }

    /// # Summary
    /// 读取未过期的 K 线序列。
    ///
    /// # Returns
    /// 命中返回 `Some`；未命中、已过期或反序列化失败返回 `None`。
    pub async fn get(&self, key: &KlineKey) -> Option<Vec<Candle>> {
        match self.inner.get::<Vec<Candle>>(&key.to_string()).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Kline cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// 写入 K 线序列，失败时仅记录日志
    pub async fn set(&self, key: &KlineKey, candles: &[Candle]) {
        if let Err(e) = self.inner.set(&key.to_string(), candles).await {
            warn!("Kline cache write failed for {}: {}", key, e);
        }
    }
}
