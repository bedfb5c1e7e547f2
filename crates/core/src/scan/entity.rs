use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 基于 ATR 百分比划分的波动率状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityState {
    Low,
    Healthy,
    High,
    Extreme,
}

// ---------------------------------------------------------------------------
// TrendDip
// ---------------------------------------------------------------------------

/// # Summary
/// 趋势回调扫描参数。
#[derive(Debug, Clone, Copy)]
pub struct TrendDipParams {
    // 候选池大小（按成交额取前 N）
    pub universe_size: usize,
    // 返回结果数量上限
    pub limit: usize,
}

impl Default for TrendDipParams {
    fn default() -> Self {
        Self {
            universe_size: 50,
            limit: 20,
        }
    }
}

/// # Summary
/// 多周期 RSI 快照，抓取失败的周期记为中性 50。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiByTimeframe {
    pub m15: f64,
    pub h1: f64,
    pub h4: f64,
    pub d1: f64,
    pub w1: f64,
}

/// # Summary
/// 按 1h RSI 划分的回调深度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DipClass {
    #[serde(rename = "Deep Dip")]
    DeepDip,
    Dip,
    Pullback,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDipResult {
    pub symbol: String,
    pub price: f64,
    // 4h EMA200
    pub ema200: f64,
    // 价格高于 EMA200 的百分比
    pub distance_from_ema200_percent: f64,
    pub rsi: RsiByTimeframe,
    pub classification: DipClass,
    pub quote_volume: f64,
}

// ---------------------------------------------------------------------------
// VolumeSpike
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct VolumeSpikeParams {
    pub universe_size: usize,
    pub limit: usize,
    pub timeframe: TimeFrame,
}

impl Default for VolumeSpikeParams {
    fn default() -> Self {
        Self {
            universe_size: 100,
            limit: 20,
            timeframe: TimeFrame::Hour1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeStrength {
    Extreme,
    Strong,
    Moderate,
    Mild,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpikeResult {
    pub symbol: String,
    pub price: f64,
    // 最新成交量 / 前 20 根均量
    pub volume_multiple: f64,
    pub current_volume: f64,
    pub average_volume: f64,
    // 最新 K 线涨幅（百分比）
    pub candle_change_percent: f64,
    pub rsi: f64,
    pub strength: SpikeStrength,
    // 是否来自兜底列表
    pub fallback: bool,
}

// ---------------------------------------------------------------------------
// SupportResistance
// ---------------------------------------------------------------------------

/// # Summary
/// 支撑阻力扫描模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrMode {
    Bounce,
    Breakout,
}

impl FromStr for SrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bounce" => Ok(SrMode::Bounce),
            "breakout" => Ok(SrMode::Breakout),
            _ => Err(format!("Unknown scan mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupportResistanceParams {
    pub mode: SrMode,
    // 回看天数，<=30 使用 4h K 线，否则使用日线
    pub lookback_days: usize,
    pub universe_size: usize,
    pub limit: usize,
}

impl Default for SupportResistanceParams {
    fn default() -> Self {
        Self {
            mode: SrMode::Bounce,
            lookback_days: 30,
            universe_size: 60,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
    Breakout,
    Breakdown,
}

/// # Summary
/// 附加在扫描结果上的标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Golden Setup")]
    GoldenSetup,
    Oversold,
    #[serde(rename = "Strong Support")]
    StrongSupport,
    #[serde(rename = "Weak Level")]
    WeakLevel,
    Confirmed,
    Approaching,
    #[serde(rename = "Strong Momentum")]
    StrongMomentum,
    #[serde(rename = "Volume Confirmed")]
    VolumeConfirmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistanceResult {
    pub symbol: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: LevelKind,
    // 被触及或突破的价位
    pub level: f64,
    pub distance_percent: f64,
    pub period_high: f64,
    pub period_low: f64,
    // 历史触及次数
    pub tests: usize,
    pub rsi: f64,
    pub risk_reward: Option<f64>,
    pub badges: Vec<Badge>,
    pub timeframe: TimeFrame,
}

// ---------------------------------------------------------------------------
// Momentum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct MomentumParams {
    // 涨幅榜候选数量
    pub universe_size: usize,
    pub limit: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            universe_size: 50,
            limit: 20,
        }
    }
}

/// # Summary
/// 动量状态。排序优先级与声明顺序一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumState {
    Ride,
    Momentum,
    Heated,
    Caution,
    Topped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumResult {
    pub symbol: String,
    pub price: f64,
    pub change_24h: f64,
    // 24h 成交额 / 14 日平均日成交额
    pub volume_factor: f64,
    pub rsi: f64,
    pub stop_loss: Option<f64>,
    pub risk_percent: Option<f64>,
    pub state: MomentumState,
}

// ---------------------------------------------------------------------------
// HighPotential
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct HighPotentialParams {
    pub universe_size: usize,
    pub limit: usize,
    pub timeframe: TimeFrame,
}

impl Default for HighPotentialParams {
    fn default() -> Self {
        Self {
            universe_size: 50,
            limit: 20,
            timeframe: TimeFrame::Hour4,
        }
    }
}

/// # Summary
/// 加权清单中的单项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub name: String,
    pub passed: bool,
    pub points: i32,
}

/// # Summary
/// "10% 上行空间" 评估的五个独立条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsideConditions {
    pub volatility_expanding: bool,
    pub momentum_rising: bool,
    pub trend_recovering: bool,
    pub volume_improved: bool,
    pub headroom: bool,
}

impl UpsideConditions {
    /// 成立的条件个数
    pub fn met(&self) -> u8 {
        [
            self.volatility_expanding,
            self.momentum_rising,
            self.trend_recovering,
            self.volume_improved,
            self.headroom,
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikelyUpside {
    pub likely: bool,
    pub met: u8,
    pub conditions: UpsideConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighPotentialResult {
    pub symbol: String,
    pub price: f64,
    pub score: i32,
    pub passes: bool,
    pub checklist: Vec<CheckItem>,
    pub rsi: f64,
    pub volatility: VolatilityState,
    pub nearest_resistance: Option<f64>,
    pub likely_10_percent_upside: LikelyUpside,
}

// ---------------------------------------------------------------------------
// Confluence
// ---------------------------------------------------------------------------

/// # Summary
/// 共振记录的来源扫描器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanSource {
    Support,
    Breakout,
    Momentum,
    VolumeSpike,
    TrendDip,
    HighPotential,
}

/// # Summary
/// 多扫描器共振记录，每次聚合时新建，响应后丢弃。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceRecord {
    pub symbol: String,
    pub price: f64,
    pub score: i32,
    pub sources: Vec<ScanSource>,
    pub tags: Vec<String>,
    pub reasons: Vec<String>,
}

impl ConfluenceRecord {
    pub fn new(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            score: 0,
            sources: Vec::new(),
            tags: Vec::new(),
            reasons: Vec::new(),
        }
    }

    pub fn has_source(&self, source: ScanSource) -> bool {
        self.sources.contains(&source)
    }
}
