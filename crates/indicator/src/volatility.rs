use crate::average::mean;
use crate::count_f64;
use kizashi_core::market::entity::Candle;
use kizashi_core::scan::entity::VolatilityState;

/// 带宽 / 中轨低于该比例视为收口 (squeeze)
pub const SQUEEZE_WIDTH: f64 = 0.10;

/// 布林带
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    // (upper - lower) / middle
    pub width: f64,
    pub squeeze: bool,
}

/// # Summary
/// 布林带 (SMA ± k 倍总体标准差)。
///
/// # Returns
/// 收盘价少于 `period` 个时三轨均为最后收盘价，带宽 0，不判定收口。
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> Bollinger {
    if period == 0 || closes.len() < period {
        let last = closes.last().copied().unwrap_or(0.0);
        return Bollinger {
            upper: last,
            middle: last,
            lower: last,
            width: 0.0,
            squeeze: false,
        };
    }
    let window = &closes[closes.len() - period..];
    let middle = mean(window);
    let variance = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / count_f64(period);
    let deviation = variance.sqrt();
    let upper = middle + multiplier * deviation;
    let lower = middle - multiplier * deviation;
    let width = if middle != 0.0 {
        (upper - lower) / middle
    } else {
        0.0
    };
    Bollinger {
        upper,
        middle,
        lower,
        width,
        squeeze: width < SQUEEZE_WIDTH,
    }
}

/// 单根 K 线的真实波幅
pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    (candle.high - candle.low)
        .max((candle.high - prev_close).abs())
        .max((candle.low - prev_close).abs())
}

/// # Summary
/// 平均真实波幅 (ATR)，Wilder 平滑。
///
/// # Logic
/// 1. 由相邻 K 线计算真实波幅序列。
/// 2. 以前 `period` 个真实波幅的平均作为种子，再做 Wilder 递推。
///
/// # Returns
/// K 线少于 `period + 1` 根时返回 0。
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() <= period {
        return 0.0;
    }
    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect();
    let p = count_f64(period);
    let mut value = mean(&ranges[..period]);
    for tr in &ranges[period..] {
        value = (value * (p - 1.0) + tr) / p;
    }
    value
}

/// # Summary
/// 以 ATR(14) 占价格的百分比划分波动率状态。
///
/// # Logic
/// `<1%` Low，`1%-5%` Healthy，`5%-10%` High，`>10%` Extreme。
///
/// # Returns
/// 数据不足或价格非正时返回 Healthy。
pub fn volatility_state(candles: &[Candle]) -> VolatilityState {
    const PERIOD: usize = 14;
    let Some(last) = candles.last() else {
        return VolatilityState::Healthy;
    };
    if candles.len() <= PERIOD || last.close <= 0.0 {
        return VolatilityState::Healthy;
    }
    let pct = atr(candles, PERIOD) / last.close * 100.0;
    if pct < 1.0 {
        VolatilityState::Low
    } else if pct <= 5.0 {
        VolatilityState::Healthy
    } else if pct <= 10.0 {
        VolatilityState::High
    } else {
        VolatilityState::Extreme
    }
}
