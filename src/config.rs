//! 定义数据库追加器的配置结构体。

use serde::Deserialize;
use std::path::Path;

use crate::error::{AppenderError, Result};

// --- 辅助函数，用于提供配置项的默认值 ---
fn default_false() -> bool {
    false
}
fn default_db_pool_size() -> u32 {
    5
}
fn default_db_connection_timeout_ms() -> u64 {
    5000
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

/// 支持的数据库类型。
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Mysql,
    Postgresql,
}

/// 顶层配置结构体，追加器配置位于 `[database]` 表下。
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct QuantumLogDbConfig {
    pub database: DbAppenderConfig,
}

/// 数据库追加器的配置。
#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DbAppenderConfig {
    pub db_type: DatabaseType,
    pub connection_string: String,
    #[serde(default = "default_db_pool_size")]
    pub connection_pool_size: u32,
    #[serde(default = "default_db_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// 仅对 SQLite 生效
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// 是否写入调用点位置信息
    #[serde(default = "default_false")]
    pub location_info: bool,
    /// 激活前是否执行建表语句
    #[serde(default = "default_false")]
    pub auto_create_tables: bool,
}

impl DbAppenderConfig {
    /// 使用默认值创建配置
    pub fn new(db_type: DatabaseType, connection_string: impl Into<String>) -> Self {
        Self {
            db_type,
            connection_string: connection_string.into(),
            connection_pool_size: default_db_pool_size(),
            connection_timeout_ms: default_db_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            location_info: default_false(),
            auto_create_tables: default_false(),
        }
    }

    /// SQLite 文件数据库配置
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(DatabaseType::Sqlite, path)
    }
}

// 安全的Debug实现，避免泄露敏感的连接字符串
impl std::fmt::Debug for DbAppenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbAppenderConfig")
            .field("db_type", &self.db_type)
            .field("connection_string", &"[REDACTED]")
            .field("connection_pool_size", &self.connection_pool_size)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("location_info", &self.location_info)
            .field("auto_create_tables", &self.auto_create_tables)
            .finish()
    }
}

/// 用于从 TOML 文件加载 `QuantumLogDbConfig` 的辅助函数。
pub fn load_config_from_file(path: &Path) -> Result<QuantumLogDbConfig> {
    if !path.exists() {
        return Err(AppenderError::ConfigFileMissing(
            path.to_string_lossy().into_owned(),
        ));
    }

    let config_str = std::fs::read_to_string(path)?;
    load_config_from_str(&config_str)
}

/// 用于从 TOML 字符串加载 `QuantumLogDbConfig` 的辅助函数。
pub fn load_config_from_str(config_str: &str) -> Result<QuantumLogDbConfig> {
    let config: QuantumLogDbConfig = toml::from_str(config_str)?;
    Ok(config)
}

/// 验证配置的有效性。
pub fn validate_config(config: &QuantumLogDbConfig) -> Result<()> {
    validate_appender_config(&config.database)
}

/// 验证追加器配置。
pub fn validate_appender_config(config: &DbAppenderConfig) -> Result<()> {
    // 验证数据库连接字符串不为空
    if config.connection_string.trim().is_empty() {
        return Err(AppenderError::config("数据库连接字符串不能为空"));
    }

    // 验证数据库连接池大小
    if config.connection_pool_size == 0 {
        return Err(AppenderError::config("数据库连接池大小必须大于0"));
    }

    if config.connection_timeout_ms == 0 {
        return Err(AppenderError::config("数据库连接超时必须大于0毫秒"));
    }

    Ok(())
}
