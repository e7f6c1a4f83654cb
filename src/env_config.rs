//! 环境变量配置模块
//!
//! 此模块允许部署环境覆盖配置文件中的数据库连接串等敏感项。

use std::env;

use crate::config::DbAppenderConfig;
use crate::error::{AppenderError, Result};

/// 数据库连接串
pub const DATABASE_URL_VAR: &str = "QUANTUM_LOG_DB_URL";
/// 是否写入调用点位置
pub const LOCATION_INFO_VAR: &str = "QUANTUM_LOG_DB_LOCATION_INFO";

/// 环境变量配置管理器
pub struct EnvConfig;

impl EnvConfig {
    /// 从环境变量读取数据库连接串
    pub fn get_database_url() -> Option<String> {
        env::var(DATABASE_URL_VAR).ok().filter(|s| !s.is_empty())
    }

    /// 从环境变量读取位置采集开关
    ///
    /// 未设置时返回 `Ok(None)`；无法识别的取值返回配置错误。
    pub fn get_location_info() -> Result<Option<bool>> {
        match env::var(LOCATION_INFO_VAR) {
            Ok(value) => parse_flag(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// 用环境变量覆盖配置
    pub fn apply_env_overrides(config: &mut DbAppenderConfig) -> Result<()> {
        if let Some(url) = Self::get_database_url() {
            tracing::debug!("connection string overridden by {}", DATABASE_URL_VAR);
            config.connection_string = url;
        }

        if let Some(location_info) = Self::get_location_info()? {
            config.location_info = location_info;
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppenderError::config(format!(
            "{} 的取值无效: {}",
            LOCATION_INFO_VAR, other
        ))),
    }
}
