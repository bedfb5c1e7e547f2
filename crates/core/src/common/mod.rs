use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// K 线时间周期枚举，`Display` 输出即为交易所接口使用的 interval 字符串。
///
/// # Invariants
/// - `FromStr` 与 `Display` 互为逆运算（对规范写法而言）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    // 1分钟
    Minute1,
    // 5分钟
    Minute5,
    // 15分钟
    Minute15,
    // 30分钟
    Minute30,
    // 1小时
    Hour1,
    // 4小时
    Hour4,
    // 1日
    Day1,
    // 1周
    Week1,
}

impl TimeFrame {
    /// # Summary
    /// 单根 K 线覆盖的秒数。
    pub fn seconds(&self) -> i64 {
        match self {
            TimeFrame::Minute1 => 60,
            TimeFrame::Minute5 => 300,
            TimeFrame::Minute15 => 900,
            TimeFrame::Minute30 => 1_800,
            TimeFrame::Hour1 => 3_600,
            TimeFrame::Hour4 => 14_400,
            TimeFrame::Day1 => 86_400,
            TimeFrame::Week1 => 604_800,
        }
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "15m" | "minute15" => Ok(TimeFrame::Minute15),
            "30m" | "minute30" => Ok(TimeFrame::Minute30),
            "1h" | "60m" | "hour1" | "hourly" => Ok(TimeFrame::Hour1),
            "4h" | "hour4" => Ok(TimeFrame::Hour4),
            "1d" | "day1" | "daily" => Ok(TimeFrame::Day1),
            "1w" | "week1" | "weekly" => Ok(TimeFrame::Week1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Minute15 => write!(f, "15m"),
            TimeFrame::Minute30 => write!(f, "30m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Hour4 => write!(f, "4h"),
            TimeFrame::Day1 => write!(f, "1d"),
            TimeFrame::Week1 => write!(f, "1w"),
        }
    }
}
