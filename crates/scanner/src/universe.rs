use kizashi_core::market::entity::Ticker;
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataGateway;
use kizashi_core::scan::error::ScanError;
use tracing::warn;

/// 交易对列表不可用时的静态兜底候选池
pub const FALLBACK_UNIVERSE: [&str; 10] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "AVAXUSDT",
    "LINKUSDT", "DOTUSDT",
];

const QUOTE: &str = "USDT";

/// 稳定币及法币基础资产
const STABLE_BASES: [&str; 11] = [
    "USDC", "BUSD", "TUSD", "FDUSD", "USDP", "DAI", "PAX", "EUR", "GBP", "AEUR", "USDE",
];

/// 杠杆代币后缀
const LEVERAGED_SUFFIXES: [&str; 4] = ["UP", "DOWN", "BULL", "BEAR"];

/// # Summary
/// 判断交易对是否应从候选池中剔除。
///
/// # Logic
/// 1. 非 USDT 计价剔除。
/// 2. 基础资产为稳定币或法币剔除。
/// 3. 基础资产以杠杆后缀结尾、且去掉后缀后仍有至少 3 个字符时剔除（保留 JUP 这类短代码）。
pub fn is_excluded(symbol: &str) -> bool {
    let Some(base) = symbol.strip_suffix(QUOTE) else {
        return true;
    };
    if base.is_empty() || STABLE_BASES.contains(&base) {
        return true;
    }
    LEVERAGED_SUFFIXES
        .iter()
        .any(|suffix| base.len() >= suffix.len() + 3 && base.ends_with(suffix))
}

/// 剔除规则生效前向上游多取的最少条数
const MIN_HEADROOM: usize = 20;

/// 兜底候选池的占位行情
pub fn fallback_tickers() -> Vec<Ticker> {
    FALLBACK_UNIVERSE
        .iter()
        .map(|s| Ticker::placeholder(s))
        .collect()
}

/// 排行请求的条数：为剔除规则留出余量，避免剔除后不足 `n` 个
fn fetch_size(n: usize) -> usize {
    n.saturating_mul(2).max(n.saturating_add(MIN_HEADROOM))
}

/// # Summary
/// 由全量 USDT 交易对构造兜底候选池。
///
/// # Logic
/// 1. 应用剔除规则。
/// 2. 仍在上架的主流币排在前面，其余交易对按返回顺序排在其后。
/// 3. 截断为 `n` 个占位行情；列表为空时返回空。
pub fn listed_fallback(pairs: Vec<String>, n: usize) -> Vec<Ticker> {
    let (majors, others): (Vec<String>, Vec<String>) = pairs
        .into_iter()
        .filter(|s| !is_excluded(s))
        .partition(|s| FALLBACK_UNIVERSE.contains(&s.as_str()));
    let mut ordered: Vec<String> = FALLBACK_UNIVERSE
        .iter()
        .filter(|m| majors.iter().any(|s| s.as_str() == **m))
        .map(|m| m.to_string())
        .collect();
    ordered.extend(others);
    ordered.truncate(n);
    ordered.iter().map(|s| Ticker::placeholder(s)).collect()
}

/// # Summary
/// 解析候选池结果。
///
/// # Logic
/// 1. 排行成功时应用剔除规则并截断为 `n` 个。
/// 2. 排行失败时改用全量 USDT 交易对列表构造兜底候选池。
/// 3. 交易对列表也不可用或为空时，使用静态兜底列表。
async fn resolve(
    gateway: &dyn MarketDataGateway,
    n: usize,
    scanner: &str,
    fetched: Result<Vec<Ticker>, MarketError>,
) -> Vec<Ticker> {
    let err = match fetched {
        Ok(tickers) => {
            let mut kept: Vec<Ticker> = tickers
                .into_iter()
                .filter(|t| !is_excluded(&t.symbol))
                .collect();
            kept.truncate(n);
            return kept;
        }
        Err(e) => ScanError::UniverseUnavailable(e.to_string()),
    };
    match gateway.get_all_usdt_pairs().await {
        Ok(pairs) => {
            let listed = listed_fallback(pairs, n);
            if !listed.is_empty() {
                warn!("[{}] {}, using listed USDT pairs", scanner, err);
                return listed;
            }
            warn!("[{}] {}, no listed pairs, using fallback universe", scanner, err);
        }
        Err(e) => warn!(
            "[{}] {}, pair list failed ({}), using fallback universe",
            scanner, err, e
        ),
    }
    let mut tickers = fallback_tickers();
    tickers.truncate(n);
    tickers
}

/// 按成交额取前 `n` 个候选
pub async fn top_volume(gateway: &dyn MarketDataGateway, n: usize, scanner: &str) -> Vec<Ticker> {
    let fetched = gateway.get_top_volume_pairs(fetch_size(n)).await;
    resolve(gateway, n, scanner, fetched).await
}

/// 按 24h 涨幅取前 `n` 个候选
pub async fn top_gainers(gateway: &dyn MarketDataGateway, n: usize, scanner: &str) -> Vec<Ticker> {
    let fetched = gateway.get_top_gainers(fetch_size(n)).await;
    resolve(gateway, n, scanner, fetched).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kizashi_core::test_utils::MockGateway;

    #[test]
    fn test_exclusion_rules() {
        assert!(!is_excluded("BTCUSDT"));
        assert!(!is_excluded("JUPUSDT"));
        assert!(is_excluded("ETHBTC"));
        assert!(is_excluded("USDCUSDT"));
        assert!(is_excluded("FDUSDUSDT"));
        assert!(is_excluded("BTCUPUSDT"));
        assert!(is_excluded("ETHDOWNUSDT"));
        assert!(is_excluded("XRPBULLUSDT"));
        assert!(is_excluded("USDT"));
    }

    fn ticker(symbol: &str, change: f64, quote_volume: f64) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            last_price: 1.0,
            price_change_percent: change,
            quote_volume,
            volume: quote_volume,
        }
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let gateway = MockGateway::new();
        gateway.set_universe_error(Some(MarketError::Network("down".into())));
        let tickers = top_volume(&gateway, 50, "test").await;
        assert_eq!(tickers.len(), FALLBACK_UNIVERSE.len());
        assert_eq!(tickers[0].symbol, "BTCUSDT");

        assert_eq!(top_gainers(&gateway, 3, "test").await.len(), 3);
    }

    #[tokio::test]
    async fn test_excluded_pairs_do_not_shrink_ranking() {
        let gateway = MockGateway::new();
        gateway.set_tickers(vec![
            ticker("USDCUSDT", 0.0, 900.0),
            ticker("FDUSDUSDT", 0.0, 800.0),
            ticker("BTCUPUSDT", 9.0, 700.0),
            ticker("BTCUSDT", 1.0, 600.0),
            ticker("ETHUSDT", 2.0, 500.0),
            ticker("SOLUSDT", 3.0, 400.0),
        ]);
        // 前 3 名中有 3 个被剔除，仍返回 3 个有效候选
        let symbols: Vec<String> = top_volume(&gateway, 3, "test")
            .await
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);

        let gainers: Vec<String> = top_gainers(&gateway, 2, "test")
            .await
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        assert_eq!(gainers, vec!["SOLUSDT", "ETHUSDT"]);
    }

    #[tokio::test]
    async fn test_ranking_failure_uses_listed_pairs() {
        let gateway = MockGateway::new();
        gateway.set_tickers(vec![
            ticker("NEWUSDT", 0.0, 0.0),
            ticker("USDCUSDT", 0.0, 0.0),
            ticker("ETHUSDT", 0.0, 0.0),
            ticker("BTCUSDT", 0.0, 0.0),
        ]);
        gateway.set_ranking_error(Some(MarketError::RateLimited("429".into())));

        let tickers = top_volume(&gateway, 10, "test").await;
        let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "NEWUSDT"]);
        assert!(tickers.iter().all(|t| t.last_price == 0.0));
    }

    #[tokio::test]
    async fn test_empty_pair_list_uses_static_universe() {
        let gateway = MockGateway::new();
        gateway.set_ranking_error(Some(MarketError::Network("down".into())));
        let tickers = top_gainers(&gateway, 5, "test").await;
        let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, FALLBACK_UNIVERSE[..5].to_vec());
    }

    #[test]
    fn test_listed_fallback_puts_majors_first() {
        let pairs = vec!["AAAUSDT", "ETHUSDT", "ETHBTC", "BBBUSDT", "BTCUSDT"]
            .into_iter()
            .map(String::from)
            .collect();
        let symbols: Vec<String> = listed_fallback(pairs, 3)
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "AAAUSDT"]);
    }
}
