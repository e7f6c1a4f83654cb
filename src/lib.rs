//! QuantumLog DB - 事务化的关系数据库日志追加器
//!
//! 把结构化日志事件写入三张规范化的表：事件主表、上下文属性表和异常堆栈表。
//! 每个事件及其子行在同一事务中写入，要么全部落库，要么全部回滚。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use quantum_log_db::config::DbAppenderConfig;
//! use quantum_log_db::{DbAppender, LoggingEvent};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = DbAppenderConfig::sqlite("/var/lib/app/logs.db");
//!     config.auto_create_tables = true;
//!
//!     let appender = DbAppender::from_config(&config)?;
//!     appender.append(
//!         &LoggingEvent::new("app::http", "INFO", "request served")
//!             .with_property("user", "alice"),
//!     )?;
//!     appender.close();
//!     Ok(())
//! }
//! ```
//!
//! # 接入 tracing
//!
//! ```rust,no_run
//! use quantum_log_db::config::load_config_from_str;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config_from_str(
//!         r#"
//!         [database]
//!         db_type = "Sqlite"
//!         connection_string = "/var/lib/app/logs.db"
//!         auto_create_tables = true
//!         "#,
//!     )?;
//!
//!     quantum_log_db::init_with_config(config)?;
//!     tracing::info!(user = "alice", "Application started");
//!
//!     quantum_log_db::shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod env_config;
pub mod error;
pub mod sinks;

// 重新导出主要类型
pub use config::{
    load_config_from_file, load_config_from_str, DatabaseType, DbAppenderConfig,
    QuantumLogDbConfig,
};
pub use diagnostics::DiagnosticsSnapshot;
pub use error::{AppenderError, Result};

// 重新导出核心功能
pub use crate::core::event::{CallerLocation, LocationInfo, LoggingEvent};
pub use crate::core::layers::DbAppenderLayer;
pub use sinks::database::{
    ConnectionSource, DbAppender, DbAppenderBuilder, DialectCode, PooledConnectionSource,
    SqlDialect,
};

use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 全局追加器实例，供 [`shutdown`] 关闭
static GLOBAL_APPENDER: Lazy<Mutex<Option<DbAppender>>> = Lazy::new(|| Mutex::new(None));

/// 使用指定配置初始化全局日志追加
///
/// 依次应用环境变量覆盖、校验配置、创建追加器，
/// 然后把 [`DbAppenderLayer`] 安装为全局 tracing 订阅器。
/// 过滤规则取自 `RUST_LOG`，未设置时为 `info`。
pub fn init_with_config(config: QuantumLogDbConfig) -> Result<DbAppender> {
    let mut appender_config = config.database;
    env_config::EnvConfig::apply_env_overrides(&mut appender_config)?;

    let appender = DbAppender::from_config(&appender_config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default()
        .with(filter)
        .with(DbAppenderLayer::new(appender.clone()))
        .try_init()
        .map_err(|e| AppenderError::config(format!("全局订阅器安装失败: {}", e)))?;

    if let Ok(mut global) = GLOBAL_APPENDER.lock() {
        *global = Some(appender.clone());
    }

    Ok(appender)
}

/// 从 TOML 配置文件初始化全局日志追加
pub fn init_from_file(path: &Path) -> Result<DbAppender> {
    let config = load_config_from_file(path)?;
    init_with_config(config)
}

/// 关闭全局追加器
///
/// 之后的 tracing 事件不再写入数据库。
pub fn shutdown() {
    let appender = match GLOBAL_APPENDER.lock() {
        Ok(mut global) => global.take(),
        Err(_) => None,
    };

    if let Some(appender) = appender {
        appender.close();
    }
}

/// 全局追加器是否已初始化且未关闭
pub fn is_initialized() -> bool {
    match GLOBAL_APPENDER.lock() {
        Ok(global) => global.as_ref().is_some_and(|appender| !appender.is_closed()),
        Err(_) => false,
    }
}

/// 获取全局追加器的诊断快照
///
/// 未初始化时返回 None。
pub fn get_diagnostics() -> Option<DiagnosticsSnapshot> {
    match GLOBAL_APPENDER.lock() {
        Ok(global) => global.as_ref().map(DbAppender::diagnostics),
        Err(_) => None,
    }
}
