use crate::batch::{run_batched, settle};
use crate::context::ScanContext;
use crate::universe::top_volume;
use async_trait::async_trait;
use kizashi_core::common::TimeFrame;
use kizashi_core::config::HighPotentialConfig;
use kizashi_core::market::entity::Candle;
use kizashi_core::scan::entity::{
    CheckItem, HighPotentialParams, HighPotentialResult, LikelyUpside, UpsideConditions,
    VolatilityState,
};
use kizashi_core::scan::error::ScanError;
use kizashi_core::scan::port::Scanner;
use kizashi_indicator::average::{ema, mean};
use kizashi_indicator::levels::support_resistance;
use kizashi_indicator::momentum::{macd, rsi};
use kizashi_indicator::volatility::{atr, volatility_state};
use kizashi_indicator::volume::obv_slope;
use tracing::info;

const NAME: &str = "high_potential";
const VOLUME_WINDOW: usize = 20;
// ATR 与 EMA20 斜率的回看根数
const SLOPE_BARS: usize = 5;
const MACD_LOOKBACK: usize = 3;
const RECENT_VOLUME_BARS: usize = 5;

fn item(name: &str, passed: bool, points: i32) -> CheckItem {
    CheckItem {
        name: name.to_string(),
        passed,
        points: if passed { points } else { 0 },
    }
}

fn closes_of(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// # Summary
/// 成交量检查：最新量不低于 20 根均量的 `ratio`，或上一根量高于均量。
fn volume_healthy(candles: &[Candle], ratio: f64) -> bool {
    let n = candles.len();
    if n < VOLUME_WINDOW + 1 {
        return false;
    }
    let window: Vec<f64> = candles[n - 1 - VOLUME_WINDOW..n - 1]
        .iter()
        .map(|c| c.volume)
        .collect();
    let average = mean(&window);
    average > 0.0 && (candles[n - 1].volume >= average * ratio || candles[n - 2].volume > average)
}

/// # Summary
/// 加权清单，满分 8。
///
/// # Logic
/// 价格 > EMA20 (+1)，EMA20 > EMA50 (+2)，RSI 位于区间 (+1)，MACD 柱 > 0 (+1)，
/// 成交量健康 (+1)，OBV 5 根斜率 > 0 (+1)，波动率 Healthy (+1)。
pub fn checklist(candles: &[Candle], config: &HighPotentialConfig) -> Vec<CheckItem> {
    let closes = closes_of(candles);
    let price = closes.last().copied().unwrap_or(0.0);
    let ema20 = ema(&closes, 20);
    let ema50 = ema(&closes, 50);
    let rsi_value = rsi(&closes, 14);
    vec![
        item("Price above EMA20", price > ema20, 1),
        item("EMA20 above EMA50", ema20 > ema50, 2),
        item(
            "RSI in range",
            (config.rsi_low..=config.rsi_high).contains(&rsi_value),
            1,
        ),
        item("MACD histogram positive", macd(&closes, 12, 26, 9).histogram > 0.0, 1),
        item("Volume healthy", volume_healthy(candles, config.volume_ratio), 1),
        item("OBV rising", obv_slope(candles, SLOPE_BARS) > 0.0, 1),
        item(
            "Healthy volatility",
            volatility_state(candles) == VolatilityState::Healthy,
            1,
        ),
    ]
}

/// # Summary
/// 上行空间的五个独立条件。
///
/// # Logic
/// 1. 波动扩张：当前 ATR(14) 高于 5 根之前。
/// 2. 动能上升：当前 MACD 柱高于 3 根之前。
/// 3. 趋势修复：价格高于 EMA20，或 EMA20 较 5 根之前抬升。
/// 4. 量能改善：最近 5 根均量高于之前 20 根均量。
/// 5. 上方空间：最近阻力位距现价至少 `headroom`，或上方没有阻力位。
pub fn upside_conditions(
    candles: &[Candle],
    nearest_resistance: Option<f64>,
    headroom: f64,
) -> UpsideConditions {
    let n = candles.len();
    if n <= SLOPE_BARS + RECENT_VOLUME_BARS + VOLUME_WINDOW {
        return UpsideConditions::default();
    }
    let closes = closes_of(candles);
    let price = closes[n - 1];

    let earlier = &candles[..n - SLOPE_BARS];
    let volatility_expanding = atr(candles, 14) > atr(earlier, 14);

    let histogram = |c: &[f64]| macd(c, 12, 26, 9).histogram;
    let momentum_rising = histogram(&closes) > histogram(&closes[..n - MACD_LOOKBACK]);

    let ema20 = ema(&closes, 20);
    let trend_recovering = price > ema20 || ema20 > ema(&closes[..n - SLOPE_BARS], 20);

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let split = n - RECENT_VOLUME_BARS;
    let volume_improved =
        mean(&volumes[split..]) > mean(&volumes[split - VOLUME_WINDOW..split]);

    let has_headroom = match nearest_resistance {
        Some(level) if price > 0.0 => (level - price) / price >= headroom,
        Some(_) => false,
        None => true,
    };

    UpsideConditions {
        volatility_expanding,
        momentum_rising,
        trend_recovering,
        volume_improved,
        headroom: has_headroom,
    }
}

/// 至少 `min` 个条件成立时判定为可能上行 10%
pub fn likely_upside(conditions: UpsideConditions, min: u8) -> LikelyUpside {
    let met = conditions.met();
    LikelyUpside {
        likely: met >= min,
        met,
        conditions,
    }
}

/// # Summary
/// 高潜力扫描器：4h 加权清单达标的交易对，附带 10% 上行可能性评估。
pub struct HighPotentialScanner {
    ctx: ScanContext,
    config: HighPotentialConfig,
}

impl HighPotentialScanner {
    pub fn new(ctx: ScanContext, config: HighPotentialConfig) -> Self {
        Self { ctx, config }
    }

    /// 基于给定 K 线计算结果，不足 `min_candles` 时返回 None
    pub fn evaluate_candles(&self, symbol: &str, candles: &[Candle]) -> Option<HighPotentialResult> {
        if candles.len() < self.config.min_candles {
            return None;
        }
        let closes = closes_of(candles);
        let price = closes.last().copied()?;
        let checklist = checklist(candles, &self.config);
        let score: i32 = checklist.iter().map(|c| c.points).sum();
        let nearest_resistance = support_resistance(candles).nearest_resistance();
        let conditions = upside_conditions(candles, nearest_resistance, self.config.headroom);
        Some(HighPotentialResult {
            symbol: symbol.to_string(),
            price,
            score,
            passes: score >= self.config.pass_score,
            checklist,
            rsi: rsi(&closes, 14),
            volatility: volatility_state(candles),
            nearest_resistance,
            likely_10_percent_upside: likely_upside(conditions, self.config.likely_min_conditions),
        })
    }

    async fn evaluate(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> Result<Option<HighPotentialResult>, ScanError> {
        let candles = self
            .ctx
            .source()
            .fetch(symbol, timeframe, self.config.candles)
            .await?;
        if candles.len() < self.config.min_candles {
            return Err(ScanError::insufficient(
                symbol,
                self.config.min_candles,
                candles.len(),
            ));
        }
        Ok(self
            .evaluate_candles(symbol, &candles)
            .filter(|r| r.passes))
    }
}

#[async_trait]
impl Scanner for HighPotentialScanner {
    type Params = HighPotentialParams;
    type Output = HighPotentialResult;

    fn name(&self) -> &'static str {
        NAME
    }

    /// # Summary
    /// 只返回清单达标的交易对，按得分降序。
    async fn scan(&self, params: HighPotentialParams) -> Vec<HighPotentialResult> {
        let universe = top_volume(self.ctx.gateway().as_ref(), params.universe_size, NAME).await;
        info!("[{}] scanning {} symbols", NAME, universe.len());

        let timeframe = params.timeframe;
        let mut results = run_batched(universe, self.ctx.batch(), |ticker| async move {
            settle(NAME, &ticker.symbol, self.evaluate(&ticker.symbol, timeframe).await)
        })
        .await;

        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
        results.truncate(params.limit);
        info!("[{}] {} symbols pass", NAME, results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kizashi_core::test_utils::candle_series;

    fn conditions(flags: [bool; 5]) -> UpsideConditions {
        UpsideConditions {
            volatility_expanding: flags[0],
            momentum_rising: flags[1],
            trend_recovering: flags[2],
            volume_improved: flags[3],
            headroom: flags[4],
        }
    }

    #[test]
    fn test_four_of_five_is_likely() {
        let verdict = likely_upside(conditions([true, true, true, true, false]), 4);
        assert!(verdict.likely);
        assert_eq!(verdict.met, 4);
    }

    #[test]
    fn test_three_of_five_is_not_likely() {
        let verdict = likely_upside(conditions([true, false, true, false, true]), 4);
        assert!(!verdict.likely);
        assert_eq!(verdict.met, 3);
    }

    #[test]
    fn test_headroom_without_resistance() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + f64::from(i)).collect();
        let candles = candle_series(TimeFrame::Hour4, &closes, 10.0);
        assert!(upside_conditions(&candles, None, 0.10).headroom);
        assert!(!upside_conditions(&candles, Some(160.0), 0.10).headroom);
        assert!(upside_conditions(&candles, Some(190.0), 0.10).headroom);
        assert_eq!(upside_conditions(&candles[..20], None, 0.10), UpsideConditions::default());
    }

    #[test]
    fn test_uptrend_scores_trend_items() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let candles = candle_series(TimeFrame::Hour4, &closes, 10.0);
        let items = checklist(&candles, &HighPotentialConfig::default());
        assert_eq!(items.len(), 7);
        assert!(items[0].passed);
        assert_eq!(items[1].points, 2);
        // OBV 在持续上涨中单调递增
        assert!(items[5].passed);
        // 无回调的序列 RSI 为 100，超出区间
        assert!(!items[2].passed);
        let score: i32 = items.iter().map(|i| i.points).sum();
        assert!(score >= HighPotentialConfig::default().pass_score);
    }

    /// 60 根平盘后 10 根 3% 加速上涨，最后 5 根放量
    fn breakout_run() -> Vec<Candle> {
        let mut closes = vec![100.0; 60];
        closes.extend((1..=10).map(|i| 100.0 * 1.03f64.powi(i)));
        let mut candles = candle_series(TimeFrame::Hour4, &closes, 10.0);
        let n = candles.len();
        for c in &mut candles[n - 5..] {
            c.volume = 50.0;
        }
        candles
    }

    /// 60 根 2% 上涨后 10 根平盘，最后 10 根缩量
    fn stalled_run() -> Vec<Candle> {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.02f64.powi(i)).collect();
        let top = closes[59];
        closes.resize(70, top);
        let mut candles = candle_series(TimeFrame::Hour4, &closes, 50.0);
        let n = candles.len();
        for c in &mut candles[n - 10..] {
            c.volume = 10.0;
        }
        candles
    }

    #[test]
    fn test_accelerating_run_meets_every_condition() {
        let candles = breakout_run();
        let met = upside_conditions(&candles, None, 0.10);
        assert!(met.volatility_expanding);
        assert!(met.momentum_rising);
        assert!(met.trend_recovering);
        assert!(met.volume_improved);
        assert!(met.headroom);
        assert_eq!(likely_upside(met, 4).met, 5);
    }

    #[test]
    fn test_capped_run_is_likely_with_four_conditions() {
        let candles = breakout_run();
        let price = candles[candles.len() - 1].close;
        // 阻力位仅在上方 5%，空间条件失败
        let met = upside_conditions(&candles, Some(price * 1.05), 0.10);
        assert!(!met.headroom);
        let verdict = likely_upside(met, 4);
        assert_eq!(verdict.met, 4);
        assert!(verdict.likely);
    }

    #[test]
    fn test_stalled_run_is_not_likely() {
        let candles = stalled_run();
        let price = candles[candles.len() - 1].close;
        let met = upside_conditions(&candles, Some(price * 1.02), 0.10);
        // 平盘 K 线振幅收窄且成交萎缩
        assert!(!met.volatility_expanding);
        assert!(!met.volume_improved);
        assert!(!met.headroom);
        assert!(!likely_upside(met, 4).likely);
    }
}
