//! Kizashi 领域核心：实体、错误与端口 (Port) 定义。
//!
//! 其余 crate 只依赖这里的抽象，具体实现由 `kizashi-app` 在启动时注入。

pub mod analysis {
    pub mod entity;
    pub mod error;
}

pub mod cache {
    pub mod error;
    pub mod port;
}

pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod scan {
    pub mod entity;
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
