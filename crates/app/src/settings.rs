use config::{Config, ConfigError, Environment, File};
use kizashi_core::config::AppConfig;

/// 默认配置文件（扩展名由 config 自动识别）
pub const CONFIG_FILE: &str = "config/kizashi";
/// 环境变量前缀，例如 `KIZASHI__CACHE__TTL_SECS=30`
pub const ENV_PREFIX: &str = "KIZASHI";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 读取可选的配置文件，不存在时跳过。
/// 2. 叠加 `KIZASHI__` 前缀的环境变量，层级以 `__` 分隔。
/// 3. 反序列化为 `AppConfig`，缺省字段取默认值。
///
/// # Arguments
/// * `path`: 配置文件路径。
///
/// # Returns
/// 解析失败时返回 `ConfigError`。
pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
