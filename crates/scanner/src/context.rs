use kizashi_analysis::analyzer::SymbolAnalyzer;
use kizashi_analysis::source::KlineSource;
use kizashi_core::config::BatchConfig;
use kizashi_core::market::port::MarketDataGateway;
use std::sync::Arc;

/// # Summary
/// 扫描器共享的运行上下文。
///
/// # Invariants
/// - 所有扫描器经由同一个 `SymbolAnalyzer` 及其 `KlineSource` 获取数据，共享同一份 K 线缓存。
#[derive(Clone)]
pub struct ScanContext {
    analyzer: Arc<SymbolAnalyzer>,
    batch: BatchConfig,
}

impl ScanContext {
    pub fn new(analyzer: Arc<SymbolAnalyzer>, batch: BatchConfig) -> Self {
        Self { analyzer, batch }
    }

    pub fn analyzer(&self) -> &SymbolAnalyzer {
        &self.analyzer
    }

    /// 缓存优先的 K 线来源
    pub fn source(&self) -> &KlineSource {
        self.analyzer.source()
    }

    pub fn gateway(&self) -> &Arc<dyn MarketDataGateway> {
        self.analyzer.source().gateway()
    }

    pub fn batch(&self) -> BatchConfig {
        self.batch
    }
}
