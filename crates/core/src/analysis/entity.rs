use crate::market::entity::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 单个指标给出的方向判断。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

/// # Summary
/// 指标权重等级。1 为高置信度，3 仅作背景参考。
///
/// # Invariants
/// - 序列化为整数 1|2|3。
/// - 等级只描述权重类别，不参与分数计算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    High,
    Medium,
    Context,
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::High => 1,
            Tier::Medium => 2,
            Tier::Context => 3,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::High),
            2 => Ok(Tier::Medium),
            3 => Ok(Tier::Context),
            other => Err(format!("Unknown tier: {}", other)),
        }
    }
}

/// # Summary
/// 单个指标的计算结果与评分。
///
/// # Invariants
/// - `value` 永远是有限数值（数据不足时为该指标的中性默认值）。
/// - `score` 是每条规则固定的小整数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    // 指标数值
    pub value: f64,
    // 方向判断
    pub signal: Signal,
    // 规则得分
    pub score: i32,
    // 权重等级
    pub tier: Tier,
    // 人类可读的描述
    pub description: String,
}

impl IndicatorResult {
    pub fn new(value: f64, signal: Signal, score: i32, tier: Tier, description: impl Into<String>) -> Self {
        Self {
            value,
            signal,
            score,
            tier,
            description: description.into(),
        }
    }
}

/// # Summary
/// 综合评分对应的操作建议。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    /// # Summary
    /// 由总分确定建议档位。
    ///
    /// # Logic
    /// `>=15` 强买，`>=5` 买，`<=-15` 强卖，`<=-5` 卖，其余持有。
    /// 各档边界在所述一侧闭合，互不重叠。
    pub fn from_score(total_score: i32) -> Self {
        if total_score >= 15 {
            Recommendation::StrongBuy
        } else if total_score >= 5 {
            Recommendation::Buy
        } else if total_score <= -15 {
            Recommendation::StrongSell
        } else if total_score <= -5 {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }
}

/// # Summary
/// 单个交易对的完整技术分析记录。
///
/// # Invariants
/// - `total_score` 恒等于 `indicators` 中所有分数之和，只能通过 `new` 构造保证。
/// - `recommendation` 是 `total_score` 的纯函数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAnalysis {
    pub symbol: String,
    // 最新收盘价
    pub price: f64,
    pub indicators: BTreeMap<String, IndicatorResult>,
    pub total_score: i32,
    pub recommendation: Recommendation,
    pub candles: Vec<Candle>,
    pub calculation_timestamp: DateTime<Utc>,
    // 最后一根 K 线的时间
    pub latest_data_time: Option<DateTime<Utc>>,
    // 是否基于降级合成数据计算
    pub degraded: bool,
}

impl TechnicalAnalysis {
    /// # Summary
    /// 组装分析记录并派生总分与建议。
    ///
    /// # Logic
    /// 1. 累加全部指标分数得到 `total_score`。
    /// 2. 由总分映射建议档位。
    /// 3. 以最后一根 K 线的收盘价与时间作为价格与数据时间。
    pub fn new(
        symbol: &str,
        indicators: BTreeMap<String, IndicatorResult>,
        candles: Vec<Candle>,
        calculation_timestamp: DateTime<Utc>,
        degraded: bool,
    ) -> Self {
        let total_score = indicators.values().map(|r| r.score).sum();
        let last = candles.last();
        Self {
            symbol: symbol.to_string(),
            price: last.map(|c| c.close).unwrap_or(0.0),
            latest_data_time: last.map(|c| c.time),
            indicators,
            total_score,
            recommendation: Recommendation::from_score(total_score),
            candles,
            calculation_timestamp,
            degraded,
        }
    }

    /// 按名称读取指标数值
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).map(|r| r.value)
    }
}
