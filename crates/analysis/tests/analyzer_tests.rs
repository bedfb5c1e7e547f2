use chrono::{Duration, TimeZone, Utc};
use kizashi_analysis::analyzer::SymbolAnalyzer;
use kizashi_analysis::source::KlineSource;
use kizashi_cache::kline::KlineCache;
use kizashi_core::analysis::entity::Signal;
use kizashi_core::analysis::error::AnalysisError;
use kizashi_core::common::TimeFrame;
use kizashi_core::common::time::FakeClockProvider;
use kizashi_core::config::{AnalyzerConfig, CacheConfig};
use kizashi_core::market::error::MarketError;
use kizashi_core::test_utils::{MockGateway, candle_series};
use std::sync::Arc;

struct Fixture {
    gateway: Arc<MockGateway>,
    clock: Arc<FakeClockProvider>,
    analyzer: SymbolAnalyzer,
}

fn fixture() -> Fixture {
    let gateway = Arc::new(MockGateway::new());
    let clock = Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let cache = KlineCache::in_memory(clock.clone(), &CacheConfig::default());
    let source = KlineSource::new(gateway.clone(), cache);
    let analyzer = SymbolAnalyzer::new(source, clock.clone(), AnalyzerConfig::default());
    Fixture {
        gateway,
        clock,
        analyzer,
    }
}

fn rising(n: i32) -> Vec<f64> {
    (0..n).map(|i| 100.0 * 1.01f64.powi(i)).collect()
}

/// # Summary
/// TTL 内两次分析返回相同 K 线，且只请求一次网关。
#[tokio::test]
async fn test_cache_idempotence_within_ttl() -> anyhow::Result<()> {
    let f = fixture();
    f.gateway
        .set_klines("BTCUSDT", TimeFrame::Hour1, candle_series(TimeFrame::Hour1, &rising(200), 50.0));

    let first = f.analyzer.analyze_symbol("BTCUSDT", "1h", 200).await?;
    let second = f.analyzer.analyze_symbol("btcusdt", "hourly", 200).await?;
    assert_eq!(first.candles, second.candles);
    assert_eq!(f.gateway.kline_fetches(), 1);
    assert!(!first.degraded);

    f.clock.advance(Duration::seconds(60));
    f.analyzer.analyze_symbol("BTCUSDT", "1h", 200).await?;
    assert_eq!(f.gateway.kline_fetches(), 2);
    Ok(())
}

/// # Summary
/// 上涨序列得到看涨的均线与 MACD 信号，总分等于各项之和。
#[tokio::test]
async fn test_rising_series_scores_bullish() -> anyhow::Result<()> {
    let f = fixture();
    let closes = rising(200);
    f.gateway
        .set_klines("ETHUSDT", TimeFrame::Hour4, candle_series(TimeFrame::Hour4, &closes, 50.0));

    let analysis = f.analyzer.analyze("ETHUSDT", TimeFrame::Hour4, 200).await?;
    assert_eq!(analysis.indicators["ema_cross"].signal, Signal::Bullish);
    assert_eq!(analysis.indicators["macd"].signal, Signal::Bullish);
    assert_eq!(analysis.indicators.len(), 16);
    let sum: i32 = analysis.indicators.values().map(|r| r.score).sum();
    assert_eq!(analysis.total_score, sum);
    assert!(analysis.total_score > 0);
    assert_eq!(Some(analysis.price), closes.last().copied());
    assert_eq!(analysis.latest_data_time, analysis.candles.last().map(|c| c.time));
    Ok(())
}

/// # Summary
/// 瞬时错误触发降级模式，产出完整的合成分析。
#[tokio::test]
async fn test_transient_failure_degrades() -> anyhow::Result<()> {
    let f = fixture();
    f.gateway
        .set_kline_error(Some(MarketError::Network("connection reset".into())));

    let analysis = f.analyzer.analyze_symbol("SOLUSDT", "4h", 100).await?;
    assert!(analysis.degraded);
    assert_eq!(analysis.candles.len(), 250);
    assert_eq!(analysis.indicators.len(), 16);

    // 相同输入得到相同的合成序列
    let again = f.analyzer.analyze_symbol("SOLUSDT", "4h", 100).await?;
    assert_eq!(analysis.candles, again.candles);
    Ok(())
}

/// # Summary
/// 应答无法解析时同样降级，调用方仍得到完整的分析结果。
#[tokio::test]
async fn test_malformed_response_degrades() -> anyhow::Result<()> {
    let f = fixture();
    f.gateway
        .set_kline_error(Some(MarketError::Parse("expected array".into())));

    let analysis = f.analyzer.analyze_symbol("ADAUSDT", "1h", 120).await?;
    assert!(analysis.degraded);
    assert_eq!(analysis.candles.len(), 250);
    assert_eq!(analysis.indicators.len(), 16);
    Ok(())
}

#[tokio::test]
async fn test_non_transient_failure_propagates() {
    let f = fixture();
    let result = f.analyzer.analyze_symbol("NOPEUSDT", "1h", 100).await;
    assert_eq!(result.err(), Some(AnalysisError::Market(MarketError::NotFound)));
}

#[tokio::test]
async fn test_short_history_is_rejected() {
    let f = fixture();
    f.gateway
        .set_klines("XRPUSDT", TimeFrame::Day1, candle_series(TimeFrame::Day1, &rising(30), 10.0));

    let result = f.analyzer.analyze_symbol("XRPUSDT", "1d", 100).await;
    assert_eq!(
        result.err(),
        Some(AnalysisError::InsufficientHistory {
            required: 50,
            actual: 30
        })
    );
}

#[tokio::test]
async fn test_unknown_timeframe() {
    let f = fixture();
    let result = f.analyzer.analyze_symbol("BTCUSDT", "3h", 100).await;
    assert_eq!(
        result.err(),
        Some(AnalysisError::InvalidTimeFrame("3h".to_string()))
    );
    assert_eq!(f.gateway.kline_fetches(), 0);
}
