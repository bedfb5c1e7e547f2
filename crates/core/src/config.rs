use serde::{Deserialize, Serialize};

/// 全局应用配置，各段缺省时使用默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub analyzer: AnalyzerConfig,
    pub scanners: ScannerConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    // 单次请求超时
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    // 超过该条目数后，写入时触发过期清扫
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 500,
        }
    }
}

/// 批处理纪律：批内并发，批间固定延迟
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
    pub delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 8,
            delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_limit: usize,
    // 实时数据少于该数量时视为历史不足
    pub min_candles: usize,
    // 降级模式合成数据的随机种子
    pub synthetic_seed: u64,
    pub synthetic_length: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_limit: 200,
            min_candles: 50,
            synthetic_seed: 0x6b69_7a61_7368_69,
            synthetic_length: 250,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub trend_dip: TrendDipConfig,
    pub volume_spike: VolumeSpikeConfig,
    pub support_resistance: SupportResistanceConfig,
    pub momentum: MomentumConfig,
    pub high_potential: HighPotentialConfig,
    pub confluence: ConfluenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendDipConfig {
    pub trend_candles: usize,
    pub ema_period: usize,
    pub rsi_candles: usize,
    pub deep_dip_rsi: f64,
    pub dip_rsi: f64,
    pub pullback_rsi: f64,
}

impl Default for TrendDipConfig {
    fn default() -> Self {
        Self {
            trend_candles: 250,
            ema_period: 200,
            rsi_candles: 100,
            deep_dip_rsi: 30.0,
            dip_rsi: 40.0,
            pullback_rsi: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSpikeConfig {
    pub candles: usize,
    pub average_period: usize,
    pub min_multiple: f64,
    pub fallback_count: usize,
}

impl Default for VolumeSpikeConfig {
    fn default() -> Self {
        Self {
            candles: 50,
            average_period: 20,
            min_multiple: 1.5,
            fallback_count: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportResistanceConfig {
    // 回看天数不超过该值时使用 4h K 线
    pub intraday_max_days: usize,
    pub intraday_tolerance: f64,
    pub daily_tolerance: f64,
    // 计为一次"测试"的价位带宽
    pub touch_band: f64,
    pub breakout_lower: f64,
    pub breakout_upper: f64,
    // 风险收益比分母下限（占价格比例）
    pub min_risk_fraction: f64,
}

impl Default for SupportResistanceConfig {
    fn default() -> Self {
        Self {
            intraday_max_days: 30,
            intraday_tolerance: 0.05,
            daily_tolerance: 0.20,
            touch_band: 0.015,
            breakout_lower: -0.02,
            breakout_upper: 0.15,
            min_risk_fraction: 0.001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub min_change: f64,
    pub min_volume_factor: f64,
    pub average_days: usize,
    pub hourly_candles: usize,
    // 首选枢轴窗口（小时）
    pub pivot_window: usize,
    // 兜底枢轴窗口的远端（小时）
    pub pivot_fallback_window: usize,
    pub topped_rsi: f64,
    pub heated_rsi: f64,
    pub ride_change: f64,
    pub ride_volume_factor: f64,
    pub ride_max_risk: f64,
    pub momentum_change: f64,
    pub momentum_volume_factor: f64,
    pub momentum_max_risk: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            min_change: 3.0,
            min_volume_factor: 1.2,
            average_days: 14,
            hourly_candles: 100,
            pivot_window: 30,
            pivot_fallback_window: 60,
            topped_rsi: 85.0,
            heated_rsi: 75.0,
            ride_change: 5.0,
            ride_volume_factor: 2.0,
            ride_max_risk: 8.0,
            momentum_change: 3.0,
            momentum_volume_factor: 1.5,
            momentum_max_risk: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPotentialConfig {
    pub candles: usize,
    pub min_candles: usize,
    pub pass_score: i32,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub volume_ratio: f64,
    pub headroom: f64,
    pub likely_min_conditions: u8,
}

impl Default for HighPotentialConfig {
    fn default() -> Self {
        Self {
            candles: 100,
            min_candles: 60,
            pass_score: 5,
            rsi_low: 45.0,
            rsi_high: 80.0,
            volume_ratio: 0.8,
            headroom: 0.10,
            likely_min_conditions: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    pub top_picks_min_score: i32,
    pub hot_setups_min_score: i32,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            top_picks_min_score: 30,
            hot_setups_min_score: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scan_interval_secs: u64,
    pub result_count: usize,
    pub log_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 300,
            result_count: 10,
            log_dir: "logs".to_string(),
        }
    }
}
