use chrono::{TimeZone, Utc};
use kizashi_analysis::analyzer::SymbolAnalyzer;
use kizashi_analysis::source::KlineSource;
use kizashi_cache::kline::KlineCache;
use kizashi_core::common::TimeFrame;
use kizashi_core::common::time::FakeClockProvider;
use kizashi_core::config::{AnalyzerConfig, BatchConfig, CacheConfig, ScannerConfig};
use kizashi_core::market::entity::{Candle, Ticker};
use kizashi_core::market::error::MarketError;
use kizashi_core::scan::entity::{
    Badge, DipClass, LevelKind, MomentumParams, MomentumState, SrMode, SupportResistanceParams,
    TrendDipParams, VolumeSpikeParams,
};
use kizashi_core::scan::port::Scanner;
use kizashi_core::test_utils::{MockGateway, candle_series};
use kizashi_scanner::confluence::ConfluenceAggregator;
use kizashi_scanner::context::ScanContext;
use kizashi_scanner::high_potential::HighPotentialScanner;
use kizashi_scanner::momentum::MomentumScanner;
use kizashi_scanner::support_resistance::SupportResistanceScanner;
use kizashi_scanner::trend_dip::TrendDipScanner;
use kizashi_scanner::volume_spike::VolumeSpikeScanner;
use std::sync::Arc;

fn context(gateway: Arc<MockGateway>) -> ScanContext {
    let clock = Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let cache = KlineCache::in_memory(clock.clone(), &CacheConfig::default());
    let source = KlineSource::new(gateway, cache);
    let analyzer = SymbolAnalyzer::new(source, clock, AnalyzerConfig::default());
    ScanContext::new(
        Arc::new(analyzer),
        BatchConfig {
            size: 8,
            delay_ms: 0,
        },
    )
}

fn ticker(symbol: &str, price: f64, change: f64, quote_volume: f64) -> Ticker {
    Ticker {
        symbol: symbol.to_string(),
        last_price: price,
        price_change_percent: change,
        quote_volume,
        volume: quote_volume / price,
    }
}

/// # Summary
/// 最新一根阳线放量 5 倍，入选且倍数约为 5。
#[tokio::test]
async fn test_volume_spike_lists_green_five_times_bar() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![
        ticker("SPKUSDT", 101.0, 1.0, 2_000_000.0),
        ticker("FLATUSDT", 50.0, 0.0, 1_000_000.0),
    ]);
    let mut closes = vec![100.0; 29];
    closes.push(101.0);
    let mut spike = candle_series(TimeFrame::Hour1, &closes, 100.0);
    if let Some(last) = spike.last_mut() {
        last.volume = 500.0;
    }
    gateway.set_klines("SPKUSDT", TimeFrame::Hour1, spike);
    gateway.set_klines(
        "FLATUSDT",
        TimeFrame::Hour1,
        candle_series(TimeFrame::Hour1, &[50.0; 30], 100.0),
    );

    let scanner = VolumeSpikeScanner::new(context(gateway), ScannerConfig::default().volume_spike);
    let results = scanner.scan(VolumeSpikeParams::default()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "SPKUSDT");
    assert!((results[0].volume_multiple - 5.0).abs() < 1e-9);
    assert!(!results[0].fallback);
}

/// # Summary
/// 候选池与行情全部不可用时，放量扫描返回基于降级数据的兜底列表。
#[tokio::test]
async fn test_volume_spike_fallback_when_upstream_down() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_universe_error(Some(MarketError::Network("down".into())));
    gateway.set_kline_error(Some(MarketError::RateLimited("429".into())));

    let scanner = VolumeSpikeScanner::new(context(gateway), ScannerConfig::default().volume_spike);
    let results = scanner.scan(VolumeSpikeParams::default()).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.fallback));
    let mut symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
    symbols.sort_unstable();
    assert_eq!(symbols, vec!["BNBUSDT", "BTCUSDT", "ETHUSDT"]);
}

/// # Summary
/// 价格收在区间低点附近时判定为支撑位反弹。
#[tokio::test]
async fn test_support_bounce_through_scanner() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![ticker("SUPUSDT", 100.0, -2.0, 500_000.0)]);
    let closes: Vec<f64> = (0..40).map(|i| 120.0 - f64::from(i) * 20.0 / 39.0).collect();
    gateway.set_klines(
        "SUPUSDT",
        TimeFrame::Hour4,
        candle_series(TimeFrame::Hour4, &closes, 10.0),
    );

    let scanner = SupportResistanceScanner::new(
        context(gateway),
        ScannerConfig::default().support_resistance,
    );
    let results = scanner.scan(SupportResistanceParams::default()).await;

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.kind, LevelKind::Support);
    assert_eq!(hit.timeframe, TimeFrame::Hour4);
    assert!(hit.distance_percent < 1.0);
    assert!(hit.risk_reward.is_some());
}

/// 29 根平盘后以放量阳线收在前高之上
fn confirmed_breakout() -> Vec<Candle> {
    let mut closes = vec![100.0; 29];
    closes.push(103.0);
    let mut candles = candle_series(TimeFrame::Hour4, &closes, 10.0);
    if let Some(last) = candles.last_mut() {
        last.volume = 100.0;
    }
    candles
}

/// 98 / 99 来回震荡，收在前高下方 0.5%
fn approaching_breakout() -> Vec<Candle> {
    let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 98.0 } else { 99.0 }).collect();
    candle_series(TimeFrame::Hour4, &closes, 10.0)
}

/// # Summary
/// 突破模式：放量越过前高为 Confirmed 并带动能与量能标签；前高下方 2% 内为 Approaching。
#[tokio::test]
async fn test_breakout_badges_from_candles() {
    let scanner = SupportResistanceScanner::new(
        context(Arc::new(MockGateway::new())),
        ScannerConfig::default().support_resistance,
    );

    let hit = scanner
        .evaluate_candles(
            "BRKUSDT",
            &confirmed_breakout(),
            SrMode::Breakout,
            TimeFrame::Hour4,
            0.05,
        )
        .unwrap();
    assert_eq!(hit.kind, LevelKind::Breakout);
    assert!((hit.level - 100.5).abs() < 1e-9);
    assert!((hit.distance_percent - 2.5 / 100.5 * 100.0).abs() < 1e-9);
    assert!(hit.risk_reward.is_none());
    assert_eq!(
        hit.badges,
        vec![Badge::Confirmed, Badge::StrongMomentum, Badge::VolumeConfirmed]
    );

    let near = scanner
        .evaluate_candles(
            "NEARUSDT",
            &approaching_breakout(),
            SrMode::Breakout,
            TimeFrame::Hour4,
            0.05,
        )
        .unwrap();
    assert_eq!(near.kind, LevelKind::Breakout);
    assert!(near.price < near.level);
    assert!(near.rsi < 60.0);
    assert_eq!(near.badges, vec![Badge::Approaching]);
}

/// # Summary
/// 突破模式排序：已确认的突破排在更近但未确认的突破之前。
#[tokio::test]
async fn test_breakout_scan_ranks_confirmed_first() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![
        ticker("NEARUSDT", 99.0, 0.5, 900_000.0),
        ticker("BRKUSDT", 103.0, 3.0, 800_000.0),
    ]);
    gateway.set_klines("BRKUSDT", TimeFrame::Hour4, confirmed_breakout());
    gateway.set_klines("NEARUSDT", TimeFrame::Hour4, approaching_breakout());

    let scanner = SupportResistanceScanner::new(
        context(gateway),
        ScannerConfig::default().support_resistance,
    );
    let params = SupportResistanceParams {
        mode: SrMode::Breakout,
        ..SupportResistanceParams::default()
    };
    let results = scanner.scan(params).await;

    let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BRKUSDT", "NEARUSDT"]);
    assert!(results[0].distance_percent > results[1].distance_percent);
}

/// # Summary
/// 历史不足的交易对被跳过，不影响其他交易对。
#[tokio::test]
async fn test_short_history_is_skipped() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![ticker("NEWUSDT", 1.0, 0.0, 900_000.0)]);
    gateway.set_klines(
        "NEWUSDT",
        TimeFrame::Hour4,
        candle_series(TimeFrame::Hour4, &[1.0; 10], 10.0),
    );

    let scanner = SupportResistanceScanner::new(
        context(gateway),
        ScannerConfig::default().support_resistance,
    );
    let params = SupportResistanceParams {
        mode: SrMode::Breakout,
        ..SupportResistanceParams::default()
    };
    assert!(scanner.scan(params).await.is_empty());
}

/// # Summary
/// 过热的涨幅榜标的被标记为 TOPPED，涨幅不足的被过滤。
#[tokio::test]
async fn test_momentum_marks_overheated_mover_topped() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![
        ticker("HOTUSDT", 100.0, 8.0, 30_000.0),
        ticker("DULLUSDT", 10.0, 1.0, 30_000.0),
    ]);
    let rising: Vec<f64> = (0..100).map(|i| 50.0 * 1.007f64.powi(i)).collect();
    for symbol in ["HOTUSDT", "DULLUSDT"] {
        gateway.set_klines(
            symbol,
            TimeFrame::Hour1,
            candle_series(TimeFrame::Hour1, &rising, 10.0),
        );
        gateway.set_klines(
            symbol,
            TimeFrame::Day1,
            candle_series(TimeFrame::Day1, &[10.0; 16], 100.0),
        );
    }

    let scanner = MomentumScanner::new(context(gateway), ScannerConfig::default().momentum);
    let results = scanner.scan(MomentumParams::default()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "HOTUSDT");
    assert_eq!(results[0].state, MomentumState::Topped);
    assert!((results[0].volume_factor - 30.0).abs() < 1e-9);
}

/// # Summary
/// 4h 站上 EMA200；缺失周期的 RSI 取中性值，1h RSI 为 50 时归为 Extended。
#[tokio::test]
async fn test_trend_dip_neutral_rsi_for_missing_timeframes() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_tickers(vec![ticker("TRDUSDT", 100.0, 1.0, 800_000.0)]);
    let closes: Vec<f64> = (0..250).map(|i| 50.0 + f64::from(i) * 0.2).collect();
    gateway.set_klines(
        "TRDUSDT",
        TimeFrame::Hour4,
        candle_series(TimeFrame::Hour4, &closes, 10.0),
    );

    let scanner = TrendDipScanner::new(context(gateway), ScannerConfig::default().trend_dip);
    let results = scanner.scan(TrendDipParams::default()).await;

    assert_eq!(results.len(), 1);
    let dip = &results[0];
    assert!(dip.price > dip.ema200);
    assert_eq!(dip.rsi.m15, 50.0);
    assert_eq!(dip.rsi.h1, 50.0);
    assert!(dip.rsi.h4 > 50.0);
    assert_eq!(dip.classification, DipClass::Extended);
}

/// # Summary
/// 上游全部不可用时，兜底放量结果不计分，共振榜单为空。
#[tokio::test]
async fn test_confluence_ignores_fallback_entries() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_universe_error(Some(MarketError::Network("down".into())));
    gateway.set_kline_error(Some(MarketError::Network("down".into())));
    let ctx = context(gateway);
    let config = ScannerConfig::default();

    let aggregator = ConfluenceAggregator::new(
        Arc::new(SupportResistanceScanner::new(ctx.clone(), config.support_resistance)),
        Arc::new(VolumeSpikeScanner::new(ctx.clone(), config.volume_spike)),
        Arc::new(MomentumScanner::new(ctx.clone(), config.momentum)),
        Arc::new(TrendDipScanner::new(ctx.clone(), config.trend_dip)),
        Arc::new(HighPotentialScanner::new(ctx, config.high_potential)),
        config.confluence,
    );

    assert!(aggregator.top_picks(10).await.is_empty());
    assert!(aggregator.hot_setups(10).await.is_empty());
}
