use chrono::{DateTime, Duration, Utc};
use kizashi_core::common::TimeFrame;
use kizashi_core::market::entity::Candle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// # Summary
/// 交易对与周期的稳定哈希 (FNV-1a)，跨进程、跨版本保持一致。
pub fn stable_hash(symbol: &str, timeframe: TimeFrame) -> u64 {
    let text = format!("{}:{}", symbol.to_uppercase(), timeframe);
    text.bytes().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// # Summary
/// 生成降级模式使用的确定性合成 K 线。
///
/// # Logic
/// 1. 种子 = `seed ^ stable_hash(symbol, timeframe)`，以 `StdRng` 驱动。
/// 2. 起始价格由哈希值决定，整段序列共享一个随机漂移项。
/// 3. 每根 K 线收益 = 漂移 + 均匀噪声，开盘价承接上一根收盘价，影线随机延伸。
/// 4. 最后一根 K 线的时间为 `end`，向前按周期等间隔排列。
///
/// # Returns
/// 长度为 `length` 的升序 K 线序列。
pub fn synthetic_candles(
    seed: u64,
    symbol: &str,
    timeframe: TimeFrame,
    length: usize,
    end: DateTime<Utc>,
) -> Vec<Candle> {
    let hash = stable_hash(symbol, timeframe);
    let mut rng = StdRng::seed_from_u64(seed ^ hash);

    let base = 1.0 + f64::from(u32::try_from(hash % 50_000).unwrap_or(0)) / 10.0;
    let drift: f64 = rng.gen_range(-0.001..0.001);
    let step = Duration::seconds(timeframe.seconds());
    let back = i32::try_from(length.saturating_sub(1)).unwrap_or(i32::MAX);
    let mut time = end - step * back;

    let mut prev = base;
    let mut out = Vec::with_capacity(length);
    for _ in 0..length {
        let open = prev;
        let close = (open * (1.0 + drift + rng.gen_range(-0.015..0.015))).max(f64::EPSILON);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.008));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.008));
        out.push(Candle {
            time,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(500.0..5_000.0),
        });
        prev = close;
        time += step;
    }
    out
}
