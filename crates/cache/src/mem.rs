use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use kizashi_core::cache::error::CacheError;
use kizashi_core::cache::port::Cache;
use kizashi_core::common::time::TimeProvider;
use kizashi_core::config::CacheConfig;
use std::sync::Arc;
use tracing::debug;

/// 缓存条目：原始字节与写入时间
struct CacheEntry {
    data: Vec<u8>,
    fetched_at: DateTime<Utc>,
}

/// # Summary
/// 基于 DashMap 的带 TTL 内存缓存实现。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，保证多线程安全。
/// - 条目仅在 `now - fetched_at < ttl` 时可见，当前时间一律取自注入的 `TimeProvider`。
/// - 过期条目惰性清理：仅当写入后条目数超过上限时，清扫一次已过期条目。
pub struct MemCache {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, CacheEntry>,
    // 时钟
    clock: Arc<dyn TimeProvider>,
    ttl: Duration,
    // 触发清扫的条目数上限
    max_entries: usize,
}

impl MemCache {
    /// # Summary
    /// 创建一个新的 MemCache 实例。
    ///
    /// # Arguments
    /// * `clock`: 时间供给器。
    /// * `ttl`: 条目有效期。
    /// * `max_entries`: 超过该数量时写入触发过期清扫。
    pub fn new(clock: Arc<dyn TimeProvider>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            storage: DashMap::new(),
            clock,
            ttl,
            max_entries,
        }
    }

    /// 按配置段创建
    pub fn from_config(clock: Arc<dyn TimeProvider>, config: &CacheConfig) -> Self {
        Self::new(clock, Duration::seconds(config.ttl_secs), config.max_entries)
    }

    /// 当前物理条目数（包含尚未清扫的过期条目）
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at < self.ttl
    }

    /// 删除所有过期条目
    fn sweep(&self, now: DateTime<Utc>) {
        let before = self.storage.len();
        self.storage.retain(|_, entry| now - entry.fetched_at < self.ttl);
        debug!(
            "Cache sweep removed {} expired entries",
            before.saturating_sub(self.storage.len())
        );
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// 写入原始字节数据。
    ///
    /// # Logic
    /// 1. 以当前时钟时间作为 `fetched_at` 插入哈希表，同名 Key 覆盖。
    /// 2. 条目数超过上限时清扫过期条目；未过期条目即使超限也保留。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.storage.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                fetched_at: now,
            },
        );
        if self.storage.len() > self.max_entries {
            self.sweep(now);
        }
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Returns
    /// 存在且未过期则返回克隆的数据，否则返回 None。过期条目不在此处删除。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        Ok(self
            .storage
            .get(key)
            .filter(|entry| self.is_fresh(entry.value(), now))
            .map(|entry| entry.value().data.clone()))
    }

    /// # Summary
    /// 删除指定键，无论键是否存在均返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }
}
