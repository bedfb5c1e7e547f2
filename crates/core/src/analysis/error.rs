use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 单交易对分析错误。
///
/// # Invariants
/// - 网关失败 (`MarketError::is_gateway_failure`) 不会以此错误返回，而是由分析器切换到降级模式。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    // K 线数量不足以满足规则的最低要求
    #[error("Insufficient history: required {required}, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    // 无法识别的周期字符串
    #[error("Invalid timeframe: {0}")]
    InvalidTimeFrame(String),
    // 降级无法覆盖的行情错误，如交易对不存在
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
}
