use crate::average::ema;
use kizashi_core::market::entity::Candle;

/// # Summary
/// 成交量加权平均价 (VWAP)，使用典型价格。
///
/// # Returns
/// 总成交量为 0 时返回最后收盘价，空序列返回 0。
pub fn vwap(candles: &[Candle]) -> f64 {
    let Some(last) = candles.last() else {
        return 0.0;
    };
    let total_volume: f64 = candles.iter().map(|c| c.volume).sum();
    if total_volume <= 0.0 {
        return last.close;
    }
    candles
        .iter()
        .map(|c| c.typical_price() * c.volume)
        .sum::<f64>()
        / total_volume
}

/// # Summary
/// 能量潮 (OBV) 序列，首根 K 线记为 0。
pub fn obv_series(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let Some(first) = candles.first() else {
        return out;
    };
    let mut acc = 0.0;
    let mut prev_close = first.close;
    out.push(acc);
    for c in &candles[1..] {
        if c.close > prev_close {
            acc += c.volume;
        } else if c.close < prev_close {
            acc -= c.volume;
        }
        prev_close = c.close;
        out.push(acc);
    }
    out
}

/// 最新 OBV，空序列返回 0
pub fn obv(candles: &[Candle]) -> f64 {
    obv_series(candles).last().copied().unwrap_or(0.0)
}

/// # Summary
/// OBV 在最近 `bars` 根 K 线上的变化量。
///
/// # Returns
/// 数据不足时返回 0。
pub fn obv_slope(candles: &[Candle], bars: usize) -> f64 {
    let series = obv_series(candles);
    if bars == 0 || series.len() <= bars {
        return 0.0;
    }
    series[series.len() - 1] - series[series.len() - 1 - bars]
}

/// # Summary
/// 成交量振荡器：(EMA(short) - EMA(long)) / EMA(long) * 100。
///
/// # Returns
/// 成交量少于 `long` 个、参数非法或长均量为 0 时返回 0。
pub fn volume_oscillator(volumes: &[f64], short: usize, long: usize) -> f64 {
    if short == 0 || short >= long || volumes.len() < long {
        return 0.0;
    }
    let long_avg = ema(volumes, long);
    if long_avg <= 0.0 {
        return 0.0;
    }
    (ema(volumes, short) - long_avg) / long_avg * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: i64, close: f64, volume: f64) -> Candle {
        Candle {
            time: Utc.timestamp_opt(i * 60, 0).single().unwrap_or_default(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let candles = vec![bar(0, 10.0, 1.0), bar(1, 20.0, 3.0)];
        assert!((vwap(&candles) - 17.5).abs() < 1e-12);
        let dry = vec![bar(0, 10.0, 0.0), bar(1, 12.0, 0.0)];
        assert_eq!(vwap(&dry), 12.0);
        assert_eq!(vwap(&[]), 0.0);
    }

    #[test]
    fn test_obv_accumulates_direction() {
        let candles = vec![
            bar(0, 10.0, 5.0),
            bar(1, 11.0, 3.0),
            bar(2, 10.5, 2.0),
            bar(3, 10.5, 9.0),
            bar(4, 12.0, 4.0),
        ];
        assert_eq!(obv_series(&candles), vec![0.0, 3.0, 1.0, 1.0, 5.0]);
        assert_eq!(obv(&candles), 5.0);
        assert_eq!(obv_slope(&candles, 2), 4.0);
        assert_eq!(obv_slope(&candles, 10), 0.0);
    }

    #[test]
    fn test_volume_oscillator_rising_volume_positive() {
        let volumes: Vec<f64> = (1..=30).map(f64::from).collect();
        assert!(volume_oscillator(&volumes, 5, 10) > 0.0);
        assert_eq!(volume_oscillator(&volumes[..5], 5, 10), 0.0);
    }
}
