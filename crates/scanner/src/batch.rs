use futures::future::join_all;
use kizashi_core::config::BatchConfig;
use kizashi_core::scan::error::ScanError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// # Summary
/// 按固定批次处理候选项。
///
/// # Logic
/// 1. 每批取 `config.size` 个候选项，批内以 `join_all` 并发执行。
/// 2. 相邻两批之间固定等待 `config.delay_ms` 毫秒。
/// 3. 返回 `None` 的候选项被丢弃，其余按输入顺序收集。
pub async fn run_batched<T, R, F, Fut>(items: Vec<T>, config: BatchConfig, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Option<R>>,
{
    let size = config.size.max(1);
    let delay = Duration::from_millis(config.delay_ms);
    let mut out = Vec::new();
    let mut remaining = items.into_iter().peekable();
    let mut first = true;

    while remaining.peek().is_some() {
        if !first && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        first = false;
        let batch: Vec<Fut> = remaining.by_ref().take(size).map(&f).collect();
        out.extend(join_all(batch).await.into_iter().flatten());
    }
    out
}

/// # Summary
/// 消化单个交易对的扫描结果：错误记录日志后丢弃。
///
/// # Logic
/// 历史不足属于常态，记为 debug；行情与分析错误记为 warn。
pub fn settle<R>(scanner: &str, symbol: &str, result: Result<Option<R>, ScanError>) -> Option<R> {
    match result {
        Ok(found) => found,
        Err(e @ ScanError::InsufficientHistory { .. }) => {
            debug!("[{}] skip {}: {}", scanner, symbol, e);
            None
        }
        Err(e) => {
            warn!("[{}] skip {}: {}", scanner, symbol, e);
            None
        }
    }
}
