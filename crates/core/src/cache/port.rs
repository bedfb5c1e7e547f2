use crate::cache::error::CacheError;
use crate::common::TimeFrame;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// # Summary
/// 带过期语义的异步 KV 存储接口 (Port)。
///
/// # Invariants
/// - 处理原始字节，确保 Trait 是对象安全的 (Object Safe)。
/// - 过期条目对 `get_raw` 不可见，物理删除时机由实现决定。
/// - 同一键的并发写入不保证顺序，最后写入者生效。
#[async_trait]
pub trait Cache: Send + Sync {
    /// # Summary
    /// 写入原始字节，并以当前时钟时间作为抓取时间戳。
    ///
    /// # Arguments
    /// * `key`: 唯一键。
    /// * `value`: 原始字节数组。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// # Summary
    /// 读取原始字节。
    ///
    /// # Returns
    /// 存在且未过期则返回 `Some(Vec<u8>)`，否则返回 `None`。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// # Summary
    /// 删除指定键，键不存在时同样返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// # Summary
/// 缓存泛型扩展接口，提供 JSON 序列化支持。
///
/// # Invariants
/// - 自动为所有实现 `Cache` 的类型提供支持。
/// - 浮点数经 JSON 往返后必须逐位相等（依赖 `float_roundtrip`）。
#[async_trait]
pub trait CacheExt: Cache {
    /// # Summary
    /// 存入强类型对象。
    ///
    /// # Logic
    /// 1. 使用 JSON 序列化对象。
    /// 2. 调用底层 `set_raw` 写入。
    async fn set<T: Serialize + Send + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_raw(key, bytes).await
    }

    /// # Summary
    /// 取出强类型对象。
    ///
    /// # Logic
    /// 1. 调用底层 `get_raw` 获取字节。
    /// 2. 使用 JSON 反序列化为目标类型。
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(bytes) => {
                let val = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Deserialize(e.to_string()))?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}

/// # Summary
/// K 线缓存键，由 (交易对, 周期, 数量) 三元组唯一确定。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KlineKey {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub limit: usize,
}

impl KlineKey {
    pub fn new(symbol: &str, timeframe: TimeFrame, limit: usize) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            timeframe,
            limit,
        }
    }
}

impl std::fmt::Display for KlineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "kline:{}:{}:{}", self.symbol, self.timeframe, self.limit)
    }
}
