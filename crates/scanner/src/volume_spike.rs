use crate::batch::{run_batched, settle};
use crate::context::ScanContext;
use crate::universe::{FALLBACK_UNIVERSE, top_volume};
use async_trait::async_trait;
use kizashi_core::common::TimeFrame;
use kizashi_core::config::VolumeSpikeConfig;
use kizashi_core::market::entity::Candle;
use kizashi_core::scan::entity::{SpikeStrength, VolumeSpikeParams, VolumeSpikeResult};
use kizashi_core::scan::error::ScanError;
use kizashi_core::scan::port::Scanner;
use kizashi_indicator::average::mean;
use kizashi_indicator::momentum::rsi;
use tracing::{info, warn};

const NAME: &str = "volume_spike";

/// 最新 K 线的放量测量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeMeasure {
    pub multiple: f64,
    pub current: f64,
    pub average: f64,
    // 最新 K 线相对开盘价的涨幅（百分比）
    pub change_percent: f64,
}

/// # Summary
/// 计算最新成交量相对前 `period` 根均量的倍数。
///
/// # Returns
/// K 线不足 `period + 1` 根或均量非正时返回 None。
pub fn measure(candles: &[Candle], period: usize) -> Option<SpikeMeasure> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let last = &candles[candles.len() - 1];
    let prior: Vec<f64> = candles[candles.len() - 1 - period..candles.len() - 1]
        .iter()
        .map(|c| c.volume)
        .collect();
    let average = mean(&prior);
    if average <= 0.0 {
        return None;
    }
    let change_percent = if last.open > 0.0 {
        (last.close - last.open) / last.open * 100.0
    } else {
        0.0
    };
    Some(SpikeMeasure {
        multiple: last.volume / average,
        current: last.volume,
        average,
        change_percent,
    })
}

/// 放量强度分级
pub fn strength(multiple: f64) -> SpikeStrength {
    if multiple >= 5.0 {
        SpikeStrength::Extreme
    } else if multiple >= 3.0 {
        SpikeStrength::Strong
    } else if multiple >= 2.0 {
        SpikeStrength::Moderate
    } else {
        SpikeStrength::Mild
    }
}

fn to_result(symbol: &str, candles: &[Candle], m: SpikeMeasure, fallback: bool) -> VolumeSpikeResult {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    VolumeSpikeResult {
        symbol: symbol.to_string(),
        price: closes.last().copied().unwrap_or(0.0),
        volume_multiple: m.multiple,
        current_volume: m.current,
        average_volume: m.average,
        candle_change_percent: m.change_percent,
        rsi: rsi(&closes, 14),
        strength: strength(m.multiple),
        fallback,
    }
}

/// # Summary
/// 放量扫描器：最新一根阳线成交量显著高于近期均量。
///
/// # Invariants
/// - 没有任何交易对满足条件时，返回兜底列表并标记 `fallback = true`。
pub struct VolumeSpikeScanner {
    ctx: ScanContext,
    config: VolumeSpikeConfig,
}

impl VolumeSpikeScanner {
    pub fn new(ctx: ScanContext, config: VolumeSpikeConfig) -> Self {
        Self { ctx, config }
    }

    async fn evaluate(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> Result<Option<VolumeSpikeResult>, ScanError> {
        let candles = self
            .ctx
            .source()
            .fetch(symbol, timeframe, self.config.candles)
            .await?;
        let required = self.config.average_period + 1;
        let Some(m) = measure(&candles, self.config.average_period) else {
            return Err(ScanError::insufficient(symbol, required, candles.len()));
        };
        let bullish = candles.last().is_some_and(Candle::is_bullish);
        if m.multiple < self.config.min_multiple || !bullish {
            return Ok(None);
        }
        Ok(Some(to_result(symbol, &candles, m, false)))
    }

    /// # Summary
    /// 兜底列表：取静态候选池前若干个，经分析器获取 K 线（允许降级数据），不做阈值筛选。
    async fn fallback(&self, timeframe: TimeFrame) -> Vec<VolumeSpikeResult> {
        let mut out = Vec::new();
        for symbol in FALLBACK_UNIVERSE.iter().take(self.config.fallback_count) {
            match self
                .ctx
                .analyzer()
                .analyze(symbol, timeframe, self.config.candles)
                .await
            {
                Ok(analysis) => {
                    if let Some(m) = measure(&analysis.candles, self.config.average_period) {
                        out.push(to_result(symbol, &analysis.candles, m, true));
                    }
                }
                Err(e) => warn!("[{}] fallback {} failed: {}", NAME, symbol, e),
            }
        }
        out
    }
}

#[async_trait]
impl Scanner for VolumeSpikeScanner {
    type Params = VolumeSpikeParams;
    type Output = VolumeSpikeResult;

    fn name(&self) -> &'static str {
        NAME
    }

    /// # Summary
    /// 扫描成交额前 N 的交易对，按放量倍数降序返回。
    async fn scan(&self, params: VolumeSpikeParams) -> Vec<VolumeSpikeResult> {
        let universe = top_volume(self.ctx.gateway().as_ref(), params.universe_size, NAME).await;
        info!("[{}] scanning {} symbols", NAME, universe.len());

        let timeframe = params.timeframe;
        let mut results = run_batched(universe, self.ctx.batch(), |ticker| async move {
            settle(NAME, &ticker.symbol, self.evaluate(&ticker.symbol, timeframe).await)
        })
        .await;

        if results.is_empty() {
            info!("[{}] no spikes found, returning fallback list", NAME);
            results = self.fallback(timeframe).await;
        }

        results.sort_by(|a, b| b.volume_multiple.total_cmp(&a.volume_multiple));
        results.truncate(params.limit);
        results
    }
}
