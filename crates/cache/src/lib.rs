//! 带 TTL 的内存缓存与 K 线类型化门面。

pub mod kline;
pub mod mem;
