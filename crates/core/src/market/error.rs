use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，处理网络、限流、解析及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `Network` 与 `RateLimited` 属于瞬时错误，由上层降级处理而非重试。
/// - `Parse` 表示上游应答不可用，与瞬时错误一样触发降级。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 上游限流 (HTTP 418/429)
    #[error("Rate limited: {0}")]
    RateLimited(String),
    // 数据解析错误，如 JSON 格式不匹配或数值非法
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("Data not found")]
    NotFound,
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl MarketError {
    /// 是否属于瞬时抓取失败
    pub fn is_transient(&self) -> bool {
        matches!(self, MarketError::Network(_) | MarketError::RateLimited(_))
    }

    /// 网关未能给出可用的 K 线：瞬时错误或应答无法解析
    pub fn is_gateway_failure(&self) -> bool {
        self.is_transient() || matches!(self, MarketError::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_failure_classes() {
        assert!(MarketError::Network("reset".into()).is_gateway_failure());
        assert!(MarketError::RateLimited("429".into()).is_gateway_failure());
        assert!(MarketError::Parse("bad json".into()).is_gateway_failure());
        assert!(!MarketError::Parse("bad json".into()).is_transient());
        assert!(!MarketError::NotFound.is_gateway_failure());
        assert!(!MarketError::Unknown("400".into()).is_gateway_failure());
    }
}
