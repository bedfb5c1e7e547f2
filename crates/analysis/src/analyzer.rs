use crate::scoring::score_indicators;
use crate::source::KlineSource;
use crate::synthetic::synthetic_candles;
use kizashi_core::analysis::entity::TechnicalAnalysis;
use kizashi_core::analysis::error::AnalysisError;
use kizashi_core::common::TimeFrame;
use kizashi_core::common::time::TimeProvider;
use kizashi_core::config::AnalyzerConfig;
use kizashi_core::market::entity::Candle;
use std::sync::Arc;
use tracing::{debug, warn};

/// # Summary
/// 单交易对分析器：获取 K 线、计算指标并给出综合评分。
///
/// # Invariants
/// - 瞬时抓取失败时切换到降级模式，用确定性合成数据产出 `degraded = true` 的结果。
/// - 真实数据少于 `min_candles` 根时返回 `InsufficientHistory`。
pub struct SymbolAnalyzer {
    source: KlineSource,
    clock: Arc<dyn TimeProvider>,
    config: AnalyzerConfig,
}

impl SymbolAnalyzer {
    pub fn new(source: KlineSource, clock: Arc<dyn TimeProvider>, config: AnalyzerConfig) -> Self {
        Self {
            source,
            clock,
            config,
        }
    }

    pub fn source(&self) -> &KlineSource {
        &self.source
    }

    /// # Summary
    /// 以周期字符串为入参的分析入口。
    ///
    /// # Arguments
    /// * `symbol`: 交易对代码。
    /// * `timeframe`: 周期字符串，接受交易所写法与常见别名。
    /// * `limit`: K 线数量，0 表示使用配置的默认值。
    ///
    /// # Returns
    /// 周期无法识别时返回 `InvalidTimeFrame`。
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<TechnicalAnalysis, AnalysisError> {
        let tf: TimeFrame = timeframe
            .parse()
            .map_err(|_| AnalysisError::InvalidTimeFrame(timeframe.to_string()))?;
        self.analyze(symbol, tf, limit).await
    }

    /// # Summary
    /// 强类型分析入口，供扫描器调用。
    ///
    /// # Logic
    /// 1. 通过 `KlineSource` 获取 K 线（缓存优先）。
    /// 2. 网关失败（瞬时错误或应答无法解析）切换到降级模式；其他行情错误直接返回。
    /// 3. 校验历史长度后计算指标表并组装结果。
    pub async fn analyze(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<TechnicalAnalysis, AnalysisError> {
        let limit = if limit == 0 {
            self.config.default_limit
        } else {
            limit
        };
        let symbol = symbol.to_uppercase();

        let (candles, degraded) = match self.source.fetch(&symbol, timeframe, limit).await {
            Ok(candles) => (candles, false),
            Err(e) if e.is_gateway_failure() => {
                warn!(
                    "Fetch failed for {} {}: {}, falling back to synthetic data",
                    symbol, timeframe, e
                );
                (self.synthetic(&symbol, timeframe, limit), true)
            }
            Err(e) => return Err(e.into()),
        };

        if candles.len() < self.config.min_candles {
            return Err(AnalysisError::InsufficientHistory {
                required: self.config.min_candles,
                actual: candles.len(),
            });
        }

        let indicators = score_indicators(&candles);
        let analysis = TechnicalAnalysis::new(&symbol, indicators, candles, self.clock.now(), degraded);
        debug!(
            "Analyzed {} {}: score {} ({:?})",
            symbol, timeframe, analysis.total_score, analysis.recommendation
        );
        Ok(analysis)
    }

    fn synthetic(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Vec<Candle> {
        synthetic_candles(
            self.config.synthetic_seed,
            symbol,
            timeframe,
            limit.max(self.config.synthetic_length),
            self.clock.now(),
        )
    }
}
