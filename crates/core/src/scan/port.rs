use async_trait::async_trait;

/// # Summary
/// 策略扫描器行为契约。
///
/// # Invariants
/// - `scan` 永不失败：单个交易对的错误在内部消化，无法开始扫描时返回空列表。
/// - 返回结果已按扫描器自身规则排序并截断。
#[async_trait]
pub trait Scanner: Send + Sync {
    /// 扫描参数
    type Params: Send + 'static;
    /// 单条扫描结果
    type Output: Send + 'static;

    /// 扫描器名称，用于日志
    fn name(&self) -> &'static str;

    /// # Summary
    /// 对候选池执行一次完整扫描。
    ///
    /// # Arguments
    /// * `params`: 扫描参数。
    ///
    /// # Returns
    /// 排序后的扫描结果。
    async fn scan(&self, params: Self::Params) -> Vec<Self::Output>;
}
