use crate::batch::{run_batched, settle};
use crate::context::ScanContext;
use crate::universe::top_volume;
use async_trait::async_trait;
use kizashi_core::common::TimeFrame;
use kizashi_core::config::TrendDipConfig;
use kizashi_core::market::entity::Ticker;
use kizashi_core::scan::entity::{DipClass, RsiByTimeframe, TrendDipParams, TrendDipResult};
use kizashi_core::scan::error::ScanError;
use kizashi_core::scan::port::Scanner;
use kizashi_indicator::average::ema;
use kizashi_indicator::momentum::{NEUTRAL_RSI, rsi};
use tracing::{debug, info};

const NAME: &str = "trend_dip";

/// # Summary
/// 按 1h RSI 划分回调深度。
pub fn classify(rsi_1h: f64, config: &TrendDipConfig) -> DipClass {
    if rsi_1h < config.deep_dip_rsi {
        DipClass::DeepDip
    } else if rsi_1h < config.dip_rsi {
        DipClass::Dip
    } else if rsi_1h < config.pullback_rsi {
        DipClass::Pullback
    } else {
        DipClass::Extended
    }
}

/// # Summary
/// 趋势回调扫描器：寻找 4h 价格站上 EMA200、短周期 RSI 回落的交易对。
pub struct TrendDipScanner {
    ctx: ScanContext,
    config: TrendDipConfig,
}

impl TrendDipScanner {
    pub fn new(ctx: ScanContext, config: TrendDipConfig) -> Self {
        Self { ctx, config }
    }

    /// 单周期 RSI(14)，抓取失败时取中性值
    async fn rsi_on(&self, symbol: &str, timeframe: TimeFrame) -> f64 {
        match self
            .ctx
            .source()
            .fetch(symbol, timeframe, self.config.rsi_candles)
            .await
        {
            Ok(candles) => {
                let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
                rsi(&closes, 14)
            }
            Err(e) => {
                debug!("[{}] {} {} RSI unavailable: {}", NAME, symbol, timeframe, e);
                NEUTRAL_RSI
            }
        }
    }

    /// # Summary
    /// 评估单个候选。
    ///
    /// # Logic
    /// 1. 抓取 4h K 线，不足 EMA 周期时跳过。
    /// 2. 收盘价不高于 EMA200 时不入选。
    /// 3. 并发计算五个周期的 RSI 并按 1h RSI 分类。
    async fn evaluate(&self, ticker: Ticker) -> Result<Option<TrendDipResult>, ScanError> {
        let symbol = ticker.symbol.as_str();
        let candles = self
            .ctx
            .source()
            .fetch(symbol, TimeFrame::Hour4, self.config.trend_candles)
            .await?;
        if candles.len() < self.config.ema_period {
            return Err(ScanError::insufficient(
                symbol,
                self.config.ema_period,
                candles.len(),
            ));
        }
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ema200 = ema(&closes, self.config.ema_period);
        let Some(&price) = closes.last() else {
            return Ok(None);
        };
        if price <= ema200 || ema200 <= 0.0 {
            return Ok(None);
        }

        let (m15, h1, h4, d1, w1) = tokio::join!(
            self.rsi_on(symbol, TimeFrame::Minute15),
            self.rsi_on(symbol, TimeFrame::Hour1),
            self.rsi_on(symbol, TimeFrame::Hour4),
            self.rsi_on(symbol, TimeFrame::Day1),
            self.rsi_on(symbol, TimeFrame::Week1),
        );

        Ok(Some(TrendDipResult {
            symbol: ticker.symbol.clone(),
            price,
            ema200,
            distance_from_ema200_percent: (price - ema200) / ema200 * 100.0,
            rsi: RsiByTimeframe { m15, h1, h4, d1, w1 },
            classification: classify(h1, &self.config),
            quote_volume: ticker.quote_volume,
        }))
    }
}

#[async_trait]
impl Scanner for TrendDipScanner {
    type Params = TrendDipParams;
    type Output = TrendDipResult;

    fn name(&self) -> &'static str {
        NAME
    }

    /// # Summary
    /// 扫描成交额前 N 的交易对，按 1h RSI 升序返回。
    async fn scan(&self, params: TrendDipParams) -> Vec<TrendDipResult> {
        let universe = top_volume(self.ctx.gateway().as_ref(), params.universe_size, NAME).await;
        info!("[{}] scanning {} symbols", NAME, universe.len());

        let mut results = run_batched(universe, self.ctx.batch(), |ticker| async move {
            let symbol = ticker.symbol.clone();
            settle(NAME, &symbol, self.evaluate(ticker).await)
        })
        .await;

        results.sort_by(|a, b| a.rsi.h1.total_cmp(&b.rsi.h1));
        results.truncate(params.limit);
        info!("[{}] found {} dips", NAME, results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_thresholds() {
        let config = TrendDipConfig::default();
        assert_eq!(classify(25.0, &config), DipClass::DeepDip);
        assert_eq!(classify(30.0, &config), DipClass::Dip);
        assert_eq!(classify(45.0, &config), DipClass::Pullback);
        assert_eq!(classify(50.0, &config), DipClass::Extended);
    }
}
