use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
/// - 序列按 `time` 升序排列，不做缺口填充。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量（基础资产计）
    pub volume: f64,
}

impl Candle {
    /// 收盘高于开盘即为阳线
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 典型价格 (H + L + C) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// # Summary
/// 24 小时滚动行情统计。
///
/// # Invariants
/// - 所有数值字段在网关边界处已完成解析与有限性校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    // 交易对代码 (例如: BTCUSDT)
    pub symbol: String,
    // 最新成交价
    pub last_price: f64,
    // 24h 涨跌幅（百分比）
    pub price_change_percent: f64,
    // 24h 计价货币成交额
    pub quote_volume: f64,
    // 24h 基础资产成交量
    pub volume: f64,
}

impl Ticker {
    /// # Summary
    /// 仅有代码、没有统计数据的占位行情。
    ///
    /// # Logic
    /// 用于交易对列表不可用时的静态兜底列表，数值一律为 0，
    /// 价格等信息由扫描器自行从 K 线获取。
    pub fn placeholder(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_price: 0.0,
            price_change_percent: 0.0,
            quote_volume: 0.0,
            volume: 0.0,
        }
    }
}
