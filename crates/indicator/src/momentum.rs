use crate::average::{ema, ema_series, mean};
use crate::count_f64;
use kizashi_core::market::entity::Candle;

/// RSI 数据不足时的中性值
pub const NEUTRAL_RSI: f64 = 50.0;

/// # Summary
/// 相对强弱指数 (RSI)，Wilder 平滑。
///
/// # Logic
/// 1. 计算相邻收盘价差，拆分为涨幅与跌幅。
/// 2. 以前 `period` 个差值的简单平均作为种子。
/// 3. 其后按 `avg = (avg * (period - 1) + new) / period` 递推。
///
/// # Returns
/// 0-100 之间的数值；少于 `period + 1` 个收盘价时返回 50。
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() <= period {
        return NEUTRAL_RSI;
    }
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = count_f64(period);

    let (gain_sum, loss_sum) = changes[..period]
        .iter()
        .fold((0.0, 0.0), |(g, l), c| (g + c.max(0.0), l + (-c).max(0.0)));
    let mut avg_gain = gain_sum / p;
    let mut avg_loss = loss_sum / p;

    for c in &changes[period..] {
        avg_gain = (avg_gain * (p - 1.0) + c.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-c).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        // 完全无波动时视为中性
        return if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD 三元组
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// # Summary
/// MACD = EMA(fast) - EMA(slow)，信号线为 MACD 序列的 EMA(signal)。
///
/// # Logic
/// 1. 以慢线序列为基准对齐快线序列，逐点相减得到 MACD 序列。
/// 2. MACD 序列长度不足 `signal_period` 时，信号线取 MACD 本身，柱状图为 0。
///
/// # Returns
/// 收盘价少于 `slow` 个（或参数非法）时全部为 0。
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    if fast == 0 || fast >= slow || closes.len() < slow {
        return Macd::default();
    }
    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);
    let offset = slow - fast;
    let line: Vec<f64> = slow_series
        .iter()
        .zip(&fast_series[offset..])
        .map(|(s, f)| f - s)
        .collect();

    let Some(&value) = line.last() else {
        return Macd::default();
    };
    let signal = if signal_period > 0 && line.len() >= signal_period {
        ema(&line, signal_period)
    } else {
        value
    };
    Macd {
        macd: value,
        signal,
        histogram: value - signal,
    }
}

/// 随机指标 %K / %D
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// # Summary
/// 随机指标 (Stochastic Oscillator)。
///
/// # Logic
/// 1. %K = (close - 最低价) / (最高价 - 最低价) * 100，区间无波动时取 50。
/// 2. %D = 最近 `d_period` 个 %K 的平均（可用数量不足时取可用部分）。
///
/// # Returns
/// K 线少于 `k_period` 根时返回 (50, 50)。
pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> Stochastic {
    if k_period == 0 || candles.len() < k_period {
        return Stochastic { k: 50.0, d: 50.0 };
    }
    let k_at = |end: usize| -> f64 {
        let window = &candles[end + 1 - k_period..=end];
        let (low, high) = range_of(window);
        if high - low <= 0.0 {
            50.0
        } else {
            (candles[end].close - low) / (high - low) * 100.0
        }
    };

    let last = candles.len() - 1;
    let k = k_at(last);
    let available = candles.len() - k_period + 1;
    let d_count = d_period.clamp(1, available);
    let ks: Vec<f64> = (0..d_count).map(|i| k_at(last - i)).collect();
    Stochastic { k, d: mean(&ks) }
}

/// # Summary
/// 威廉指标 (Williams %R)，取值 -100 到 0。
///
/// # Returns
/// K 线少于 `period` 根或区间无波动时返回 -50。
pub fn williams_r(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return -50.0;
    }
    let window = &candles[candles.len() - period..];
    let (low, high) = range_of(window);
    let close = window[window.len() - 1].close;
    if high - low <= 0.0 {
        return -50.0;
    }
    (high - close) / (high - low) * -100.0
}

/// # Summary
/// 顺势指标 (CCI)。
///
/// # Logic
/// (典型价 - 典型价SMA) / (0.015 * 平均绝对偏差)。
///
/// # Returns
/// K 线少于 `period` 根或偏差为 0 时返回 0。
pub fn cci(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return 0.0;
    }
    let typical: Vec<f64> = candles[candles.len() - period..]
        .iter()
        .map(Candle::typical_price)
        .collect();
    let avg = mean(&typical);
    let deviation = typical.iter().map(|t| (t - avg).abs()).sum::<f64>() / count_f64(period);
    if deviation == 0.0 {
        return 0.0;
    }
    (typical[typical.len() - 1] - avg) / (0.015 * deviation)
}

/// # Summary
/// 资金流量指数 (MFI)。
///
/// # Logic
/// 1. 在最近 `period + 1` 根 K 线上比较相邻典型价。
/// 2. 上涨时典型价 * 成交量计入正向资金流，下跌时计入负向资金流。
///
/// # Returns
/// K 线少于 `period + 1` 根或无资金流时返回 50。
pub fn mfi(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() <= period {
        return 50.0;
    }
    let window = &candles[candles.len() - period - 1..];
    let mut positive = 0.0;
    let mut negative = 0.0;
    for pair in window.windows(2) {
        let prev = pair[0].typical_price();
        let curr = pair[1].typical_price();
        let flow = curr * pair[1].volume;
        if curr > prev {
            positive += flow;
        } else if curr < prev {
            negative += flow;
        }
    }
    if negative == 0.0 {
        return if positive == 0.0 { 50.0 } else { 100.0 };
    }
    100.0 - 100.0 / (1.0 + positive / negative)
}

/// 区间最低价与最高价
pub(crate) fn range_of(candles: &[Candle]) -> (f64, f64) {
    candles.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c.low), hi.max(c.high))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, o: f64, h: f64, l: f64, c: f64, v: f64) -> Candle {
        Candle {
            time: Utc.timestamp_opt(i * 3600, 0).single().unwrap_or_default(),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        }
    }

    #[test]
    fn test_rsi_wilder_extremes() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + f64::from(i)).collect();
        assert_eq!(rsi(&rising, 14), 100.0);
        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert!(rsi(&falling, 14) < 1e-9);
        assert_eq!(rsi(&[1.0; 30], 14), 50.0);
        assert_eq!(rsi(&rising[..14], 14), 50.0);
    }

    #[test]
    fn test_rsi_alternating_is_balanced() {
        let closes: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let value = rsi(&closes, 14);
        assert!(value > 40.0 && value < 60.0, "rsi = {}", value);
    }

    #[test]
    fn test_macd_sign_follows_trend() {
        let rising: Vec<f64> = (0..60).map(|i| 100.0 + f64::from(i)).collect();
        let m = macd(&rising, 12, 26, 9);
        assert!(m.macd > 0.0);
        assert!((m.histogram - (m.macd - m.signal)).abs() < 1e-12);
        assert_eq!(macd(&rising[..20], 12, 26, 9), Macd::default());
    }

    #[test]
    fn test_macd_short_line_uses_macd_as_signal() {
        let closes: Vec<f64> = (0..28).map(|i| 50.0 + f64::from(i) * 0.5).collect();
        let m = macd(&closes, 12, 26, 9);
        assert_eq!(m.signal, m.macd);
        assert_eq!(m.histogram, 0.0);
    }

    #[test]
    fn test_stochastic_and_williams_at_range_top() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let base = 100.0 + f64::from(i);
                candle(i64::from(i), base, base + 1.0, base - 1.0, base + 1.0, 10.0)
            })
            .collect();
        let s = stochastic(&candles, 14, 3);
        assert!((s.k - 100.0).abs() < 1e-9);
        assert!((williams_r(&candles, 14)).abs() < 1e-9);
        let short = &candles[..5];
        assert_eq!(stochastic(short, 14, 3), Stochastic { k: 50.0, d: 50.0 });
        assert_eq!(williams_r(short, 14), -50.0);
    }

    #[test]
    fn test_cci_and_mfi_defaults() {
        let flat: Vec<Candle> = (0..30).map(|i| candle(i, 10.0, 10.0, 10.0, 10.0, 5.0)).collect();
        assert_eq!(cci(&flat, 20), 0.0);
        assert_eq!(mfi(&flat, 14), 50.0);
        assert_eq!(cci(&flat[..3], 20), 0.0);
        assert_eq!(mfi(&flat[..14], 14), 50.0);
    }

    #[test]
    fn test_mfi_all_inflow_is_100() {
        let candles: Vec<Candle> = (0..20i32)
            .map(|i| {
                let p = 10.0 + f64::from(i);
                candle(i64::from(i), p, p, p, p, 100.0)
            })
            .collect();
        assert_eq!(mfi(&candles, 14), 100.0);
    }
}
