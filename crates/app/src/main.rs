mod settings;

use kizashi_analysis::analyzer::SymbolAnalyzer;
use kizashi_analysis::source::KlineSource;
use kizashi_cache::kline::KlineCache;
use kizashi_core::common::time::{RealTimeProvider, TimeProvider};
use kizashi_core::config::{AppConfig, RuntimeConfig};
use kizashi_core::market::port::MarketDataGateway;
use kizashi_core::scan::entity::ConfluenceRecord;
use kizashi_feed::binance::BinanceGateway;
use kizashi_scanner::confluence::ConfluenceAggregator;
use kizashi_scanner::context::ScanContext;
use kizashi_scanner::high_potential::HighPotentialScanner;
use kizashi_scanner::momentum::MomentumScanner;
use kizashi_scanner::support_resistance::SupportResistanceScanner;
use kizashi_scanner::trend_dip::TrendDipScanner;
use kizashi_scanner::volume_spike::VolumeSpikeScanner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化日志：终端输出加按天滚动的文件输出。
///
/// # Returns
/// 文件写入守卫，需持有到进程退出。
fn init_logging(runtime: &RuntimeConfig) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(&runtime.log_dir, "kizashi.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    guard
}

/// # Summary
/// 装配所有组件，返回共振聚合器。
///
/// # Logic
/// 时钟与网关 -> K 线缓存 -> 数据源 -> 分析器 -> 扫描上下文 -> 各扫描器 -> 聚合器。
fn build(config: &AppConfig) -> anyhow::Result<ConfluenceAggregator> {
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let gateway: Arc<dyn MarketDataGateway> = Arc::new(BinanceGateway::new(&config.gateway)?);
    let cache = KlineCache::in_memory(clock.clone(), &config.cache);
    let source = KlineSource::new(gateway, cache);
    let analyzer = Arc::new(SymbolAnalyzer::new(source, clock, config.analyzer.clone()));
    let ctx = ScanContext::new(analyzer, config.batch);

    let scanners = &config.scanners;
    Ok(ConfluenceAggregator::new(
        Arc::new(SupportResistanceScanner::new(
            ctx.clone(),
            scanners.support_resistance.clone(),
        )),
        Arc::new(VolumeSpikeScanner::new(ctx.clone(), scanners.volume_spike.clone())),
        Arc::new(MomentumScanner::new(ctx.clone(), scanners.momentum.clone())),
        Arc::new(TrendDipScanner::new(ctx.clone(), scanners.trend_dip.clone())),
        Arc::new(HighPotentialScanner::new(ctx, scanners.high_potential.clone())),
        scanners.confluence.clone(),
    ))
}

fn print_records(title: &str, records: &[ConfluenceRecord]) {
    match serde_json::to_string_pretty(records) {
        Ok(json) => println!("== {} ==\n{}", title, json),
        Err(e) => warn!("Failed to render {}: {}", title, e),
    }
}

/// 执行一轮扫描并输出结果
async fn run_cycle(aggregator: &ConfluenceAggregator, count: usize) {
    let (picks, setups) = tokio::join!(aggregator.top_picks(count), aggregator.hot_setups(count));
    print_records("Top Picks", &picks);
    print_records("Hot Setups", &setups);
}

/// # Summary
/// 应用启动入口，纯粹的装配容器。
///
/// # Logic
/// 1. 加载配置并初始化日志。
/// 2. 安装 TLS 加密后端。
/// 3. 装配网关、缓存、分析器与扫描器。
/// 4. 按固定间隔执行扫描，收到退出信号后结束。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = settings::load(settings::CONFIG_FILE)?;
    let _guard = init_logging(&config.runtime);
    info!("Kizashi scanner starting...");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A TLS crypto provider was already installed");
    }

    let aggregator = build(&config)?;
    let count = config.runtime.result_count;
    let period = Duration::from_secs(config.runtime.scan_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    info!("Scanning every {}s. Waiting for signals...", period.as_secs());

    loop {
        tokio::select! {
            _ = interval.tick() => run_cycle(&aggregator, count).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting...");
                break;
            }
        }
    }

    Ok(())
}
