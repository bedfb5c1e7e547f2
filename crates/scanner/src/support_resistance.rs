use crate::batch::{run_batched, settle};
use crate::context::ScanContext;
use crate::universe::top_volume;
use async_trait::async_trait;
use kizashi_core::common::TimeFrame;
use kizashi_core::config::SupportResistanceConfig;
use kizashi_core::market::entity::Candle;
use kizashi_core::scan::entity::{
    Badge, LevelKind, SrMode, SupportResistanceParams, SupportResistanceResult,
};
use kizashi_core::scan::error::ScanError;
use kizashi_core::scan::port::Scanner;
use kizashi_indicator::average::mean;
use kizashi_indicator::momentum::rsi;
use std::cmp::Ordering;
use tracing::info;

const NAME: &str = "support_resistance";
/// 判定所需的最少 K 线数量
const MIN_CANDLES: usize = 20;
/// 成交量确认的均量窗口
const VOLUME_WINDOW: usize = 20;
/// 成交量确认倍数
const VOLUME_CONFIRM_MULTIPLE: f64 = 1.5;

/// 价位判定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelHit {
    pub kind: LevelKind,
    pub level: f64,
    // 价格距价位的百分比（绝对值）
    pub distance_percent: f64,
}

/// # Summary
/// 由回看天数确定 K 线周期与数量。
///
/// # Logic
/// 不超过 `intraday_max_days` 天使用 4h（每天 6 根），否则使用日线。
pub fn timeframe_for(lookback_days: usize, config: &SupportResistanceConfig) -> (TimeFrame, usize, f64) {
    if lookback_days <= config.intraday_max_days {
        (TimeFrame::Hour4, lookback_days * 6, config.intraday_tolerance)
    } else {
        (TimeFrame::Day1, lookback_days, config.daily_tolerance)
    }
}

/// # Summary
/// 反弹模式判定。
///
/// # Logic
/// 1. `|price - low| / low < tolerance` 为支撑。
/// 2. 否则 `|high - price| / price < tolerance` 为阻力。
/// 3. 其余不判定。
pub fn classify_bounce(price: f64, period_low: f64, period_high: f64, tolerance: f64) -> Option<LevelHit> {
    if period_low > 0.0 {
        let distance = (price - period_low).abs() / period_low;
        if distance < tolerance {
            return Some(LevelHit {
                kind: LevelKind::Support,
                level: period_low,
                distance_percent: distance * 100.0,
            });
        }
    }
    if price > 0.0 {
        let distance = (period_high - price).abs() / price;
        if distance < tolerance {
            return Some(LevelHit {
                kind: LevelKind::Resistance,
                level: period_high,
                distance_percent: distance * 100.0,
            });
        }
    }
    None
}

/// # Summary
/// 突破模式判定。
///
/// # Logic
/// 1. `(price - prior_high) / prior_high` 落在 `[lower, upper]` 内为向上突破。
/// 2. 否则 `(prior_low - price) / prior_low` 落在区间内为向下跌破。
pub fn classify_breakout(
    price: f64,
    prior_high: f64,
    prior_low: f64,
    config: &SupportResistanceConfig,
) -> Option<LevelHit> {
    let window = config.breakout_lower..=config.breakout_upper;
    if prior_high > 0.0 {
        let move_up = (price - prior_high) / prior_high;
        if window.contains(&move_up) {
            return Some(LevelHit {
                kind: LevelKind::Breakout,
                level: prior_high,
                distance_percent: move_up.abs() * 100.0,
            });
        }
    }
    if prior_low > 0.0 {
        let move_down = (prior_low - price) / prior_low;
        if window.contains(&move_down) {
            return Some(LevelHit {
                kind: LevelKind::Breakdown,
                level: prior_low,
                distance_percent: move_down.abs() * 100.0,
            });
        }
    }
    None
}

/// 低点（支撑）或高点（阻力）距价位在 `band` 以内的 K 线数量
pub fn count_tests(candles: &[Candle], kind: LevelKind, level: f64, band: f64) -> usize {
    if level <= 0.0 {
        return 0;
    }
    candles
        .iter()
        .filter(|c| {
            let touch = match kind {
                LevelKind::Support | LevelKind::Breakdown => c.low,
                LevelKind::Resistance | LevelKind::Breakout => c.high,
            };
            (touch - level).abs() / level <= band
        })
        .count()
}

/// 反弹模式标签
pub fn bounce_badges(kind: LevelKind, rsi: f64, tests: usize) -> Vec<Badge> {
    let support = kind == LevelKind::Support;
    let mut badges = Vec::new();
    if support && rsi < 35.0 && tests >= 2 {
        badges.push(Badge::GoldenSetup);
    }
    if rsi < 30.0 {
        badges.push(Badge::Oversold);
    }
    if support && tests >= 3 {
        badges.push(Badge::StrongSupport);
    }
    if tests <= 1 {
        badges.push(Badge::WeakLevel);
    }
    badges
}

/// # Summary
/// 风险收益比 = 到对侧极值的距离 / 到触及价位的距离。
///
/// # Logic
/// 分母不低于 `price * min_risk_fraction`。
pub fn risk_reward(
    kind: LevelKind,
    price: f64,
    period_low: f64,
    period_high: f64,
    min_risk_fraction: f64,
) -> Option<f64> {
    let floor = price * min_risk_fraction;
    let (reward, risk) = match kind {
        LevelKind::Support => (period_high - price, price - period_low),
        LevelKind::Resistance => (price - period_low, period_high - price),
        LevelKind::Breakout | LevelKind::Breakdown => return None,
    };
    let risk = risk.abs().max(floor);
    if risk <= 0.0 {
        return None;
    }
    Some(reward.max(0.0) / risk)
}

/// 突破是否已越过价位
pub fn is_confirmed(hit: &LevelHit, price: f64) -> bool {
    match hit.kind {
        LevelKind::Breakout => price > hit.level,
        LevelKind::Breakdown => price < hit.level,
        LevelKind::Support | LevelKind::Resistance => false,
    }
}

/// 突破模式标签
pub fn breakout_badges(hit: &LevelHit, price: f64, rsi: f64, volume_confirmed: bool) -> Vec<Badge> {
    let mut badges = vec![if is_confirmed(hit, price) {
        Badge::Confirmed
    } else {
        Badge::Approaching
    }];
    let strong = match hit.kind {
        LevelKind::Breakout => rsi > 60.0,
        LevelKind::Breakdown => rsi < 40.0,
        LevelKind::Support | LevelKind::Resistance => false,
    };
    if strong {
        badges.push(Badge::StrongMomentum);
    }
    if volume_confirmed {
        badges.push(Badge::VolumeConfirmed);
    }
    badges
}

/// 最新成交量是否超过前 20 根均量的 1.5 倍
fn volume_confirmed(candles: &[Candle]) -> bool {
    if candles.len() < VOLUME_WINDOW + 1 {
        return false;
    }
    let last = candles.len() - 1;
    let prior: Vec<f64> = candles[last - VOLUME_WINDOW..last]
        .iter()
        .map(|c| c.volume)
        .collect();
    let average = mean(&prior);
    average > 0.0 && candles[last].volume > average * VOLUME_CONFIRM_MULTIPLE
}

fn period_range(candles: &[Candle]) -> (f64, f64) {
    candles.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c.low), hi.max(c.high))
    })
}

/// # Summary
/// 支撑阻力扫描器，支持反弹与突破两种模式。
pub struct SupportResistanceScanner {
    ctx: ScanContext,
    config: SupportResistanceConfig,
}

impl SupportResistanceScanner {
    pub fn new(ctx: ScanContext, config: SupportResistanceConfig) -> Self {
        Self { ctx, config }
    }

    /// # Summary
    /// 对单个交易对的 K 线做判定。
    ///
    /// # Logic
    /// 1. 反弹模式以整段区间的高低点判定支撑 / 阻力，统计测试次数、标签与风险收益比。
    /// 2. 突破模式以除最后一根外的区间高低点判定突破 / 跌破。
    pub fn evaluate_candles(
        &self,
        symbol: &str,
        candles: &[Candle],
        mode: SrMode,
        timeframe: TimeFrame,
        tolerance: f64,
    ) -> Option<SupportResistanceResult> {
        let last = candles.last()?;
        let price = last.close;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi_value = rsi(&closes, 14);

        match mode {
            SrMode::Bounce => {
                let (low, high) = period_range(candles);
                let hit = classify_bounce(price, low, high, tolerance)?;
                let tests = count_tests(candles, hit.kind, hit.level, self.config.touch_band);
                Some(SupportResistanceResult {
                    symbol: symbol.to_string(),
                    price,
                    kind: hit.kind,
                    level: hit.level,
                    distance_percent: hit.distance_percent,
                    period_high: high,
                    period_low: low,
                    tests,
                    rsi: rsi_value,
                    risk_reward: risk_reward(hit.kind, price, low, high, self.config.min_risk_fraction),
                    badges: bounce_badges(hit.kind, rsi_value, tests),
                    timeframe,
                })
            }
            SrMode::Breakout => {
                let prior = &candles[..candles.len() - 1];
                if prior.is_empty() {
                    return None;
                }
                let (low, high) = period_range(prior);
                let hit = classify_breakout(price, high, low, &self.config)?;
                let tests = count_tests(prior, hit.kind, hit.level, self.config.touch_band);
                Some(SupportResistanceResult {
                    symbol: symbol.to_string(),
                    price,
                    kind: hit.kind,
                    level: hit.level,
                    distance_percent: hit.distance_percent,
                    period_high: high,
                    period_low: low,
                    tests,
                    rsi: rsi_value,
                    risk_reward: None,
                    badges: breakout_badges(&hit, price, rsi_value, volume_confirmed(candles)),
                    timeframe,
                })
            }
        }
    }

    async fn evaluate(
        &self,
        symbol: &str,
        params: SupportResistanceParams,
    ) -> Result<Option<SupportResistanceResult>, ScanError> {
        let (timeframe, count, tolerance) = timeframe_for(params.lookback_days, &self.config);
        let candles = self.ctx.source().fetch(symbol, timeframe, count).await?;
        if candles.len() < MIN_CANDLES {
            return Err(ScanError::insufficient(symbol, MIN_CANDLES, candles.len()));
        }
        Ok(self.evaluate_candles(symbol, &candles, params.mode, timeframe, tolerance))
    }
}

/// 突破排序：已确认优先，其次距离升序
fn breakout_order(a: &SupportResistanceResult, b: &SupportResistanceResult) -> Ordering {
    let confirmed = |r: &SupportResistanceResult| r.badges.contains(&Badge::Confirmed);
    confirmed(b)
        .cmp(&confirmed(a))
        .then(a.distance_percent.total_cmp(&b.distance_percent))
}

#[async_trait]
impl Scanner for SupportResistanceScanner {
    type Params = SupportResistanceParams;
    type Output = SupportResistanceResult;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn scan(&self, params: SupportResistanceParams) -> Vec<SupportResistanceResult> {
        let universe = top_volume(self.ctx.gateway().as_ref(), params.universe_size, NAME).await;
        info!(
            "[{}] scanning {} symbols ({:?}, {} days)",
            NAME,
            universe.len(),
            params.mode,
            params.lookback_days
        );

        let mut results = run_batched(universe, self.ctx.batch(), |ticker| async move {
            settle(NAME, &ticker.symbol, self.evaluate(&ticker.symbol, params).await)
        })
        .await;

        match params.mode {
            SrMode::Bounce => {
                results.sort_by(|a, b| a.distance_percent.total_cmp(&b.distance_percent));
            }
            SrMode::Breakout => results.sort_by(breakout_order),
        }
        results.truncate(params.limit);
        info!("[{}] found {} setups", NAME, results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounce_at_period_low_is_support() {
        let hit = classify_bounce(100.0, 100.0, 200.0, 0.05).unwrap();
        assert_eq!(hit.kind, LevelKind::Support);
        assert!(hit.distance_percent.abs() < 1e-9);
    }

    #[test]
    fn test_bounce_midpoint_is_unclassified() {
        assert!(classify_bounce(150.0, 100.0, 200.0, 0.05).is_none());
        let near_top = classify_bounce(195.0, 100.0, 200.0, 0.05).unwrap();
        assert_eq!(near_top.kind, LevelKind::Resistance);
    }

    #[test]
    fn test_breakout_window() {
        let config = SupportResistanceConfig::default();
        let up = classify_breakout(105.0, 100.0, 80.0, &config).unwrap();
        assert_eq!(up.kind, LevelKind::Breakout);
        assert!(is_confirmed(&up, 105.0));
        // 低于前高 1% 仍视为接近突破
        let near = classify_breakout(99.0, 100.0, 80.0, &config).unwrap();
        assert!(!is_confirmed(&near, 99.0));
        assert!(classify_breakout(120.0, 100.0, 80.0, &config).is_none());
        let down = classify_breakout(76.0, 100.0, 80.0, &config).unwrap();
        assert_eq!(down.kind, LevelKind::Breakdown);
    }

    #[test]
    fn test_bounce_badges() {
        let golden = bounce_badges(LevelKind::Support, 28.0, 3);
        assert_eq!(
            golden,
            vec![Badge::GoldenSetup, Badge::Oversold, Badge::StrongSupport]
        );
        assert_eq!(bounce_badges(LevelKind::Resistance, 50.0, 1), vec![Badge::WeakLevel]);
    }

    #[test]
    fn test_risk_reward_floor() {
        let rr = risk_reward(LevelKind::Support, 100.0, 100.0, 130.0, 0.001).unwrap();
        // 风险被下限 0.1 约束
        assert!((rr - 300.0).abs() < 1e-9);
        assert!(risk_reward(LevelKind::Breakout, 100.0, 90.0, 110.0, 0.001).is_none());
    }

    #[test]
    fn test_timeframe_selection() {
        let config = SupportResistanceConfig::default();
        assert_eq!(timeframe_for(30, &config), (TimeFrame::Hour4, 180, 0.05));
        assert_eq!(timeframe_for(90, &config), (TimeFrame::Day1, 90, 0.20));
    }

    fn breakout(symbol: &str, distance_percent: f64, badge: Badge) -> SupportResistanceResult {
        SupportResistanceResult {
            symbol: symbol.to_string(),
            price: 100.0,
            kind: LevelKind::Breakout,
            level: 100.0,
            distance_percent,
            period_high: 100.0,
            period_low: 90.0,
            tests: 2,
            rsi: 50.0,
            risk_reward: None,
            badges: vec![badge],
            timeframe: TimeFrame::Hour4,
        }
    }

    #[test]
    fn test_breakout_order_confirmed_then_distance() {
        let mut results = vec![
            breakout("A", 0.2, Badge::Approaching),
            breakout("B", 4.0, Badge::Confirmed),
            breakout("C", 1.0, Badge::Approaching),
            breakout("D", 1.5, Badge::Confirmed),
        ];
        results.sort_by(breakout_order);
        let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["D", "B", "A", "C"]);
    }
}
