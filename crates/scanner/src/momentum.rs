use crate::batch::{run_batched, settle};
use crate::context::ScanContext;
use crate::universe::top_gainers;
use async_trait::async_trait;
use kizashi_core::common::TimeFrame;
use kizashi_core::config::MomentumConfig;
use kizashi_core::market::entity::{Candle, Ticker};
use kizashi_core::scan::entity::{MomentumParams, MomentumResult, MomentumState};
use kizashi_core::scan::error::ScanError;
use kizashi_core::scan::port::Scanner;
use kizashi_indicator::average::mean;
use kizashi_indicator::momentum::rsi;
use tracing::info;

const NAME: &str = "momentum";
/// 枢轴低点两侧各需比较的 K 线数量
const PIVOT_SPAN: usize = 2;
/// 24 小时对应的小时 K 线数量
const DAY_HOURS: usize = 24;

/// 动量分级所需的输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderInput {
    pub rsi: f64,
    pub change_24h: f64,
    pub volume_factor: f64,
    // 有效止损对应的风险百分比，无有效止损时为 None
    pub risk_percent: Option<f64>,
}

/// # Summary
/// 动量状态阶梯，首个命中的规则生效。
///
/// # Logic
/// 1. RSI 高于 `topped_rsi` 为 TOPPED。
/// 2. 涨幅与量能因子均强且 RSI 未过热：有效止损且风险不超过 `ride_max_risk` 为 RIDE，否则 MOMENTUM。
/// 3. 涨幅与量能因子达标：有效止损风险超过 `momentum_max_risk` 为 CAUTION，否则 MOMENTUM。
/// 4. 其余为 CAUTION，RSI 高于 `heated_rsi` 时升级为 HEATED。
pub fn classify(input: &LadderInput, config: &MomentumConfig) -> MomentumState {
    if input.rsi > config.topped_rsi {
        return MomentumState::Topped;
    }
    if input.change_24h > config.ride_change
        && input.volume_factor > config.ride_volume_factor
        && input.rsi < config.heated_rsi
    {
        return match input.risk_percent {
            Some(risk) if risk <= config.ride_max_risk => MomentumState::Ride,
            _ => MomentumState::Momentum,
        };
    }
    if input.change_24h > config.momentum_change && input.volume_factor > config.momentum_volume_factor {
        return match input.risk_percent {
            Some(risk) if risk > config.momentum_max_risk => MomentumState::Caution,
            _ => MomentumState::Momentum,
        };
    }
    if input.rsi > config.heated_rsi {
        MomentumState::Heated
    } else {
        MomentumState::Caution
    }
}

/// # Summary
/// 量能因子 = 24h 成交额 / 前 `days` 根日线的平均日成交额 (close * volume)。
///
/// # Logic
/// 最后一根日线视为当日未完成 K 线，不计入均值。
pub fn volume_factor(quote_volume_24h: f64, daily: &[Candle], days: usize) -> Option<f64> {
    if daily.len() < 2 || days == 0 {
        return None;
    }
    let completed = &daily[..daily.len() - 1];
    let window = &completed[completed.len().saturating_sub(days)..];
    let dollar: Vec<f64> = window.iter().map(|c| c.close * c.volume).collect();
    let average = mean(&dollar);
    (average > 0.0).then(|| quote_volume_24h / average)
}

/// # Summary
/// 在 `[start, end)` 区间内寻找满足 `accept` 的最近枢轴低点。
///
/// # Logic
/// 枢轴低点的最低价严格低于两侧各 2 根 K 线；邻居可以落在区间之外。
/// 从新到旧扫描，被 `accept` 拒绝的枢轴跳过，继续向前寻找。
pub fn find_pivot_low(
    candles: &[Candle],
    start: usize,
    end: usize,
    accept: impl Fn(f64) -> bool,
) -> Option<f64> {
    let lo = start.max(PIVOT_SPAN);
    let hi = end.min(candles.len().saturating_sub(PIVOT_SPAN));
    (lo..hi).rev().find_map(|i| {
        let low = candles[i].low;
        let pivot = (i - PIVOT_SPAN..=i + PIVOT_SPAN)
            .filter(|&j| j != i)
            .all(|j| low < candles[j].low);
        (pivot && accept(low)).then_some(low)
    })
}

/// # Summary
/// 止损位：最近 `pivot_window` 小时内低于现价的枢轴低点。
///
/// # Logic
/// 1. 首选窗口内最近一个低于现价的枢轴为有效止损。
/// 2. 否则在 `pivot_window..pivot_fallback_window` 小时前的窗口内重试。
pub fn stop_loss(hourly: &[Candle], price: f64, config: &MomentumConfig) -> Option<f64> {
    let n = hourly.len();
    let recent_start = n.saturating_sub(config.pivot_window);
    let valid = |p: f64| p < price && p > 0.0;
    find_pivot_low(hourly, recent_start, n, valid).or_else(|| {
        let older_start = n.saturating_sub(config.pivot_fallback_window);
        find_pivot_low(hourly, older_start, recent_start, valid)
    })
}

/// # Summary
/// 24h 涨幅 (%) 与 24h 成交额，由小时 K 线推算。
///
/// # Logic
/// 用于没有实时统计数据的兜底候选。
fn day_stats_from_hourly(hourly: &[Candle]) -> Option<(f64, f64)> {
    let last = hourly.last()?;
    let window = &hourly[hourly.len().saturating_sub(DAY_HOURS)..];
    let first = window.first()?;
    if first.open <= 0.0 {
        return None;
    }
    let change = (last.close - first.open) / first.open * 100.0;
    let quote: f64 = window.iter().map(|c| c.close * c.volume).sum();
    Some((change, quote))
}

/// # Summary
/// 动量扫描器：在涨幅榜中筛选放量上涨并给出入场状态与止损。
pub struct MomentumScanner {
    ctx: ScanContext,
    config: MomentumConfig,
}

impl MomentumScanner {
    pub fn new(ctx: ScanContext, config: MomentumConfig) -> Self {
        Self { ctx, config }
    }

    /// # Summary
    /// 评估单个候选。
    ///
    /// # Logic
    /// 1. 获取小时 K 线计算 RSI 与止损；占位行情由小时 K 线补齐涨幅与成交额。
    /// 2. 过滤涨幅不足 `min_change` 的候选。
    /// 3. 获取日线计算量能因子，不足 `min_volume_factor` 过滤。
    /// 4. 按阶梯规则分级。
    async fn evaluate(&self, ticker: Ticker) -> Result<Option<MomentumResult>, ScanError> {
        let symbol = ticker.symbol.as_str();
        let hourly = self
            .ctx
            .source()
            .fetch(symbol, TimeFrame::Hour1, self.config.hourly_candles)
            .await?;
        let required = 2 * PIVOT_SPAN + 1;
        if hourly.len() < required {
            return Err(ScanError::insufficient(symbol, required, hourly.len()));
        }

        let (change_24h, quote_volume, price) = if ticker.last_price > 0.0 {
            (ticker.price_change_percent, ticker.quote_volume, ticker.last_price)
        } else {
            let Some((change, quote)) = day_stats_from_hourly(&hourly) else {
                return Ok(None);
            };
            let price = hourly.last().map(|c| c.close).unwrap_or(0.0);
            (change, quote, price)
        };
        if change_24h < self.config.min_change || price <= 0.0 {
            return Ok(None);
        }

        let daily = self
            .ctx
            .source()
            .fetch(symbol, TimeFrame::Day1, self.config.average_days + 1)
            .await?;
        let Some(factor) = volume_factor(quote_volume, &daily, self.config.average_days) else {
            return Err(ScanError::insufficient(symbol, 2, daily.len()));
        };
        if factor < self.config.min_volume_factor {
            return Ok(None);
        }

        let closes: Vec<f64> = hourly.iter().map(|c| c.close).collect();
        let rsi_value = rsi(&closes, 14);
        let stop = stop_loss(&hourly, price, &self.config);
        let risk_percent = stop.map(|s| (price - s) / price * 100.0);
        let state = classify(
            &LadderInput {
                rsi: rsi_value,
                change_24h,
                volume_factor: factor,
                risk_percent,
            },
            &self.config,
        );

        Ok(Some(MomentumResult {
            symbol: ticker.symbol.clone(),
            price,
            change_24h,
            volume_factor: factor,
            rsi: rsi_value,
            stop_loss: stop,
            risk_percent,
            state,
        }))
    }
}

#[async_trait]
impl Scanner for MomentumScanner {
    type Params = MomentumParams;
    type Output = MomentumResult;

    fn name(&self) -> &'static str {
        NAME
    }

    /// # Summary
    /// 扫描涨幅榜，按状态优先级、再按涨幅降序返回。
    async fn scan(&self, params: MomentumParams) -> Vec<MomentumResult> {
        let universe = top_gainers(self.ctx.gateway().as_ref(), params.universe_size, NAME).await;
        info!("[{}] scanning {} symbols", NAME, universe.len());

        let mut results = run_batched(universe, self.ctx.batch(), |ticker| async move {
            let symbol = ticker.symbol.clone();
            settle(NAME, &symbol, self.evaluate(ticker).await)
        })
        .await;

        results.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then(b.change_24h.total_cmp(&a.change_24h))
        });
        results.truncate(params.limit);
        info!("[{}] found {} movers", NAME, results.len());
        results
    }
}
