//! 多策略扫描器与共振聚合。
//!
//! 每个扫描器实现 `Scanner` 端口：按批处理纪律遍历候选池，
//! 单个交易对的失败只记录日志，不会影响整次扫描。

pub mod batch;
pub mod confluence;
pub mod context;
pub mod high_potential;
pub mod momentum;
pub mod support_resistance;
pub mod trend_dip;
pub mod universe;
pub mod volume_spike;
