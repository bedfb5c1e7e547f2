use crate::average::mean;
use crate::count_f64;
use crate::volatility::true_range;
use kizashi_core::market::entity::Candle;

/// ADX 及方向指标
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Adx {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// # Summary
/// 平均趋向指数 (ADX)，Wilder 平滑。
///
/// # Logic
/// 1. 由相邻 K 线计算 +DM、-DM 与真实波幅。
/// 2. 三者各以前 `period` 个值的平均为种子做 Wilder 递推，得到 +DI / -DI。
/// 3. DX = |+DI - -DI| / (+DI + -DI) * 100。
/// 4. ADX 以前 `period` 个 DX 的平均为种子，继续 Wilder 递推。
///
/// # Returns
/// K 线少于 `2 * period + 1` 根时全部为 0。
pub fn adx(candles: &[Candle], period: usize) -> Adx {
    if period == 0 || candles.len() < 2 * period + 1 {
        return Adx::default();
    }
    let p = count_f64(period);

    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut ranges = Vec::with_capacity(candles.len() - 1);
    for w in candles.windows(2) {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        ranges.push(true_range(&w[1], w[0].close));
    }

    let mut s_plus = mean(&plus_dm[..period]);
    let mut s_minus = mean(&minus_dm[..period]);
    let mut s_tr = mean(&ranges[..period]);

    let di = |sp: f64, sm: f64, st: f64| -> (f64, f64) {
        if st <= 0.0 {
            (0.0, 0.0)
        } else {
            (sp / st * 100.0, sm / st * 100.0)
        }
    };
    let dx_of = |pdi: f64, mdi: f64| -> f64 {
        if pdi + mdi <= 0.0 {
            0.0
        } else {
            (pdi - mdi).abs() / (pdi + mdi) * 100.0
        }
    };

    let (mut plus_di, mut minus_di) = di(s_plus, s_minus, s_tr);
    let mut dx_values = vec![dx_of(plus_di, minus_di)];
    for i in period..ranges.len() {
        s_plus = (s_plus * (p - 1.0) + plus_dm[i]) / p;
        s_minus = (s_minus * (p - 1.0) + minus_dm[i]) / p;
        s_tr = (s_tr * (p - 1.0) + ranges[i]) / p;
        (plus_di, minus_di) = di(s_plus, s_minus, s_tr);
        dx_values.push(dx_of(plus_di, minus_di));
    }

    let mut value = mean(&dx_values[..period]);
    for dx in &dx_values[period..] {
        value = (value * (p - 1.0) + dx) / p;
    }
    Adx {
        adx: value,
        plus_di,
        minus_di,
    }
}

/// 抛物线转向指标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicSar {
    pub value: f64,
    pub uptrend: bool,
}

/// # Summary
/// 抛物线转向 (Parabolic SAR)。
///
/// # Logic
/// 1. 依据前两根收盘价确定初始方向，SAR 取首根 K 线的低点（上升）或高点（下降）。
/// 2. 每根 K 线 `SAR += AF * (EP - SAR)`，且不得越过前两根 K 线的极值。
/// 3. 价格穿越 SAR 时反转：SAR 置为原极值点，AF 重置为 `step`。
/// 4. 创新极值时 AF 增加 `step`，上限 `max_step`。
///
/// # Returns
/// 少于 2 根 K 线时返回最后收盘价、上升趋势。
pub fn parabolic_sar(candles: &[Candle], step: f64, max_step: f64) -> ParabolicSar {
    if candles.len() < 2 {
        return ParabolicSar {
            value: candles.last().map(|c| c.close).unwrap_or(0.0),
            uptrend: true,
        };
    }
    let first = &candles[0];
    let mut uptrend = candles[1].close >= first.close;
    let mut sar = if uptrend { first.low } else { first.high };
    let mut extreme = if uptrend { first.high } else { first.low };
    let mut af = step;

    for i in 1..candles.len() {
        let c = &candles[i];
        sar += af * (extreme - sar);
        if uptrend {
            sar = sar.min(candles[i - 1].low);
            if i >= 2 {
                sar = sar.min(candles[i - 2].low);
            }
            if c.low < sar {
                uptrend = false;
                sar = extreme;
                extreme = c.low;
                af = step;
            } else if c.high > extreme {
                extreme = c.high;
                af = (af + step).min(max_step);
            }
        } else {
            sar = sar.max(candles[i - 1].high);
            if i >= 2 {
                sar = sar.max(candles[i - 2].high);
            }
            if c.high > sar {
                uptrend = true;
                sar = extreme;
                extreme = c.high;
                af = step;
            } else if c.low < extreme {
                extreme = c.low;
                af = (af + step).min(max_step);
            }
        }
    }
    ParabolicSar {
        value: sar,
        uptrend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn trending(n: i32, slope: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + slope * f64::from(i);
                Candle {
                    time: Utc
                        .timestamp_opt(i64::from(i) * 3600, 0)
                        .single()
                        .unwrap_or_default(),
                    open: c - slope * 0.5,
                    high: c + 0.5,
                    low: c - 0.5,
                    close: c,
                    volume: 100.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let a = adx(&trending(60, 1.0), 14);
        assert!(a.adx > 25.0, "adx = {}", a.adx);
        assert!(a.plus_di > a.minus_di);
        assert_eq!(adx(&trending(20, 1.0), 14), Adx::default());
    }

    #[test]
    fn test_sar_follows_direction() {
        let up = parabolic_sar(&trending(40, 1.0), 0.02, 0.2);
        assert!(up.uptrend);
        assert!(up.value < 100.0 + 39.0);
        let down = parabolic_sar(&trending(40, -1.0), 0.02, 0.2);
        assert!(!down.uptrend);
        let single = parabolic_sar(&trending(1, 1.0), 0.02, 0.2);
        assert_eq!(single.value, 100.0);
    }
}
