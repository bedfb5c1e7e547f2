use crate::average::mean;
use kizashi_core::market::entity::Candle;

/// 摆动点两侧各需比较的 K 线数量
pub const SWING_SPAN: usize = 2;
/// 相邻价位相差低于该比例时归入同一流动性区
pub const CLUSTER_THRESHOLD: f64 = 0.005;
/// 软区间的回看窗口
pub const SOFT_ZONE_WINDOW: usize = 20;
/// 合并后相差低于该比例的价位视为同一价位
pub const DEDUP_THRESHOLD: f64 = 0.001;
/// 每侧最多保留的价位数量
pub const MAX_LEVELS: usize = 5;

/// 支撑位（由近及远降序）与阻力位（由近及远升序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Levels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl Levels {
    /// 当前价之上最近的阻力位
    pub fn nearest_resistance(&self) -> Option<f64> {
        self.resistance.first().copied()
    }

    /// 当前价之下最近的支撑位
    pub fn nearest_support(&self) -> Option<f64> {
        self.support.first().copied()
    }
}

/// # Summary
/// 摆动极值：低点严格低于两侧各 `SWING_SPAN` 根为支撑，高点严格高于两侧为阻力。
///
/// # Returns
/// (支撑列表, 阻力列表)，按出现顺序排列。
pub fn swing_levels(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    let mut support = Vec::new();
    let mut resistance = Vec::new();
    if candles.len() < 2 * SWING_SPAN + 1 {
        return (support, resistance);
    }
    for i in SWING_SPAN..candles.len() - SWING_SPAN {
        let neighbours = (i - SWING_SPAN..=i + SWING_SPAN).filter(|&j| j != i);
        let c = &candles[i];
        if neighbours.clone().all(|j| c.low < candles[j].low) {
            support.push(c.low);
        }
        if neighbours.clone().all(|j| c.high > candles[j].high) {
            resistance.push(c.high);
        }
    }
    (support, resistance)
}

/// # Summary
/// 流动性区聚类。
///
/// # Logic
/// 1. 将价位升序排序。
/// 2. 相邻价位相对差小于 `threshold` 时并入当前组，否则开启新组。
/// 3. 成员数不少于 2 的组以均值作为价位输出。
pub fn liquidity_zones(values: &[f64], threshold: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite() && *v > 0.0).collect();
    sorted.sort_by(f64::total_cmp);

    let mut zones = Vec::new();
    let mut group: Vec<f64> = Vec::new();
    for v in sorted {
        if let Some(&prev) = group.last()
            && (v - prev) / prev >= threshold
        {
            if group.len() >= 2 {
                zones.push(mean(&group));
            }
            group.clear();
        }
        group.push(v);
    }
    if group.len() >= 2 {
        zones.push(mean(&group));
    }
    zones
}

/// # Summary
/// 软区间：尾部窗口的最低价、最高价与中点。
///
/// # Logic
/// 中点低于最新收盘价时作为支撑，否则作为阻力。
pub fn soft_zones(candles: &[Candle], window: usize) -> (Vec<f64>, Vec<f64>) {
    let Some(last) = candles.last() else {
        return (Vec::new(), Vec::new());
    };
    if candles.len() < 2 || window == 0 {
        return (Vec::new(), Vec::new());
    }
    let tail = &candles[candles.len().saturating_sub(window)..];
    let low = tail.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = tail.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let mid = (low + high) / 2.0;

    let mut support = vec![low];
    let mut resistance = vec![high];
    if mid < last.close {
        support.push(mid);
    } else {
        resistance.push(mid);
    }
    (support, resistance)
}

/// # Summary
/// 合并三种算法得到的支撑 / 阻力位。
///
/// # Logic
/// 1. 合并摆动极值、流动性区（低点→支撑，高点→阻力）与软区间。
/// 2. 支撑只保留不高于最新收盘价者，阻力只保留不低于最新收盘价者。
/// 3. 按距当前价由近及远排序，相差小于 `DEDUP_THRESHOLD` 的价位合并。
/// 4. 每侧截断为 `MAX_LEVELS` 个。
pub fn support_resistance(candles: &[Candle]) -> Levels {
    let Some(last) = candles.last() else {
        return Levels::default();
    };
    let price = last.close;

    let (mut support, mut resistance) = swing_levels(candles);
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    support.extend(liquidity_zones(&lows, CLUSTER_THRESHOLD));
    resistance.extend(liquidity_zones(&highs, CLUSTER_THRESHOLD));
    let (soft_support, soft_resistance) = soft_zones(candles, SOFT_ZONE_WINDOW);
    support.extend(soft_support);
    resistance.extend(soft_resistance);

    support.retain(|v| v.is_finite() && *v <= price);
    resistance.retain(|v| v.is_finite() && *v >= price);
    support.sort_by(|a, b| b.total_cmp(a));
    resistance.sort_by(f64::total_cmp);

    Levels {
        support: dedupe(support),
        resistance: dedupe(resistance),
    }
}

/// 已排序序列中与上一个保留值过近的价位被丢弃
fn dedupe(sorted: Vec<f64>) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::with_capacity(MAX_LEVELS);
    for v in sorted {
        if out.len() == MAX_LEVELS {
            break;
        }
        match out.last() {
            Some(&kept) if kept != 0.0 && ((v - kept) / kept).abs() < DEDUP_THRESHOLD => {}
            _ => out.push(v),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, low: f64, high: f64, close: f64) -> Candle {
        Candle {
            time: Utc
                .timestamp_opt(i64::try_from(i).unwrap_or(0) * 3600, 0)
                .single()
                .unwrap_or_default(),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_swing_requires_strict_extremes() {
        let lows = [10.0, 9.0, 8.0, 9.0, 10.0, 8.0, 8.5];
        let candles: Vec<Candle> = lows
            .iter()
            .enumerate()
            .map(|(i, &l)| bar(i, l, l + 2.0, l + 1.0))
            .collect();
        let (support, _) = swing_levels(&candles);
        // 索引 2 的低点 8.0 与索引 5 相等但不在其两侧窗口内
        assert_eq!(support, vec![8.0]);
    }

    #[test]
    fn test_liquidity_zone_grouping() {
        let zones = liquidity_zones(&[100.0, 100.2, 100.3, 105.0, 110.0, 110.1], 0.005);
        assert_eq!(zones.len(), 2);
        assert!((zones[0] - 100.1666).abs() < 1e-3);
        assert!((zones[1] - 110.05).abs() < 1e-9);
    }

    #[test]
    fn test_levels_are_capped_sorted_and_sided() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let wave = (f64::from(u32::try_from(i).unwrap_or(0)) * 0.7).sin() * 5.0;
                let c = 100.0 + wave;
                bar(i, c - 1.0, c + 1.0, c)
            })
            .collect();
        let price = candles[candles.len() - 1].close;
        let levels = support_resistance(&candles);
        assert!(levels.support.len() <= MAX_LEVELS);
        assert!(levels.resistance.len() <= MAX_LEVELS);
        assert!(levels.support.iter().all(|s| *s <= price));
        assert!(levels.resistance.iter().all(|r| *r >= price));
        assert!(levels.support.windows(2).all(|w| w[0] > w[1]));
        assert!(levels.resistance.windows(2).all(|w| w[0] < w[1]));
        assert!(!levels.support.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(support_resistance(&[]), Levels::default());
    }
}
