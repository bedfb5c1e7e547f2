//! 纯函数技术指标库。
//!
//! 所有函数对相同输入给出相同输出；历史长度不足时返回各自文档化的中性默认值，
//! 永远不会返回 NaN。

pub mod average;
pub mod levels;
pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

/// # Summary
/// 将计数转换为浮点数。
///
/// # Invariants
/// - K 线数量远小于 2^52，转换不会丢失精度。
#[allow(clippy::cast_precision_loss)]
pub fn count_f64(n: usize) -> f64 {
    n as f64
}
