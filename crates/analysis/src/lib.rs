//! 单交易对技术分析：K 线获取、指标评分与降级模式。

pub mod analyzer;
pub mod scoring;
pub mod source;
pub mod synthetic;
