use thiserror::Error;

/// # Summary
/// 缓存域错误枚举。调用方一律将其视为缓存未命中，不向扫描结果传播。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum CacheError {
    // K 线序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    // 缓存内容反序列化失败
    #[error("Deserialize error: {0}")]
    Deserialize(String),
}
