//! 交易所行情网关实现。

pub mod binance;
