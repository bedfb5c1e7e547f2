use crate::count_f64;

/// 算术平均，空切片返回 0
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / count_f64(values.len())
}

/// # Summary
/// 简单移动平均 (SMA)，取最近 `period` 个值。
///
/// # Returns
/// 数据不足时返回最后一个值（空序列返回 0）。
pub fn sma(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return values.last().copied().unwrap_or(0.0);
    }
    mean(&values[values.len() - period..])
}

/// # Summary
/// 指数移动平均序列。
///
/// # Logic
/// 1. 以前 `period` 个值的 SMA 作为种子。
/// 2. 之后按 `k = 2 / (period + 1)` 递推。
///
/// # Returns
/// 长度为 `len - period + 1` 的序列，数据不足时为空。
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (count_f64(period) + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut prev = mean(&values[..period]);
    out.push(prev);
    for v in &values[period..] {
        prev = (v - prev) * k + prev;
        out.push(prev);
    }
    out
}

/// # Summary
/// 最新的 EMA 值。
///
/// # Returns
/// 数据不足时返回最后一个值（空序列返回 0）。
pub fn ema(values: &[f64], period: usize) -> f64 {
    ema_series(values, period)
        .last()
        .copied()
        .unwrap_or_else(|| values.last().copied().unwrap_or(0.0))
}
