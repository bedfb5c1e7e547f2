use crate::analysis::error::AnalysisError;
use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 扫描过程中的单交易对错误。
///
/// # Invariants
/// - 只在扫描器内部流转：记录日志后丢弃该交易对，绝不返回给扫描调用方。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    // K 线数量不足
    #[error("Insufficient history for {symbol}: required {required}, got {actual}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        actual: usize,
    },
    // 连交易对列表都无法获取
    #[error("Universe unavailable: {0}")]
    UniverseUnavailable(String),
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

impl ScanError {
    /// 构造历史不足错误
    pub fn insufficient(symbol: &str, required: usize, actual: usize) -> Self {
        ScanError::InsufficientHistory {
            symbol: symbol.to_string(),
            required,
            actual,
        }
    }
}
