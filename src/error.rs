//! Error types for the database appender
//!
//! This module defines all error types used by the appender. Configuration
//! errors surface at activation time; persistence errors are caught at the
//! append boundary and reported through the diagnostic log channel.

use std::fmt;

use thiserror::Error;

use crate::sinks::database::dialect::DialectCode;

/// 事务写入的阶段，用于定位持久化失败的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// 插入 logging_event 父行
    InsertEvent,
    /// 读取数据库生成的主键
    FetchGeneratedKey,
    /// 批量插入上下文属性行
    InsertProperties,
    /// 批量插入异常堆栈行
    InsertException,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::InsertEvent => "insert logging_event",
            Self::FetchGeneratedKey => "fetch generated key",
            Self::InsertProperties => "insert logging_event_property",
            Self::InsertException => "insert logging_event_exception",
        };
        f.write_str(stage)
    }
}

/// Main error type for appender operations
#[derive(Error, Debug)]
pub enum AppenderError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The appender was activated without a connection source
    #[error("DBAppender cannot function without a connection source")]
    MissingConnectionSource,

    /// The connection source reported a dialect no adapter exists for
    #[error("DBAppender cannot function without a determined SQL dialect (reported: {0})")]
    UnresolvedDialect(DialectCode),

    /// A database backend was requested whose cargo feature is disabled
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigFileMissing(String),

    /// I/O errors
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("TOML parsing error: {source}")]
    TomlError {
        #[from]
        source: toml::de::Error,
    },

    /// A statement inside the append transaction failed
    #[error("Persistence error during {stage}: {source}")]
    Persistence {
        stage: WriteStage,
        #[source]
        source: diesel::result::Error,
    },

    /// Transaction control (begin, commit, rollback) and DDL errors
    #[error("Database error: {source}")]
    DatabaseError {
        #[from]
        source: diesel::result::Error,
    },

    /// Connection pool errors
    #[error("Database pool error: {source}")]
    PoolError {
        #[from]
        source: r2d2::Error,
    },

    /// Connection could not be provided
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// The parent insert touched a row count other than one
    #[error("Failed to insert logging event: expected 1 row, {0} affected")]
    UnexpectedRowCount(usize),

    /// The exception trace does not fit the SMALLINT line index column
    #[error("Exception trace has {0} lines, exceeding the line index range")]
    TraceTooLong(usize),

    /// The appender has been closed
    #[error("Attempted to append to closed appender")]
    Closed,

    /// Background task errors
    #[error("Background task error: {0}")]
    BackgroundTaskError(String),
}

/// Result type alias for appender operations
pub type Result<T> = std::result::Result<T, AppenderError>;

impl AppenderError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Wrap a diesel error raised at a given write stage
    pub fn persistence(stage: WriteStage, source: diesel::result::Error) -> Self {
        Self::Persistence { stage, source }
    }

    /// Check if this error is recoverable
    ///
    /// Persistence failures only lose the current event; the next append
    /// may succeed. Configuration failures never fix themselves.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Persistence { .. }
            | Self::DatabaseError { .. }
            | Self::PoolError { .. }
            | Self::ConnectionError(_)
            | Self::UnexpectedRowCount(_)
            | Self::TraceTooLong(_)
            | Self::BackgroundTaskError(_) => true,
            Self::IoError { .. } => true,
            _ => false,
        }
    }

    /// Get the error category for logging purposes
    pub fn category(&self) -> &'static str {
        match self {
            Self::ConfigError(_)
            | Self::MissingConnectionSource
            | Self::UnresolvedDialect(_)
            | Self::FeatureNotEnabled(_)
            | Self::ConfigFileMissing(_) => "config",
            Self::IoError { .. } => "io",
            Self::TomlError { .. } => "toml",
            Self::Persistence { .. }
            | Self::DatabaseError { .. }
            | Self::UnexpectedRowCount(_)
            | Self::TraceTooLong(_) => "persistence",
            Self::PoolError { .. } | Self::ConnectionError(_) => "connection",
            Self::Closed => "lifecycle",
            Self::BackgroundTaskError(_) => "background_task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let config_err = AppenderError::config("Invalid configuration");
        assert!(matches!(config_err, AppenderError::ConfigError(_)));
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Invalid configuration"
        );

        let conn_err = AppenderError::connection("pool exhausted");
        assert_eq!(
            conn_err.to_string(),
            "Database connection error: pool exhausted"
        );
    }

    #[test]
    fn test_persistence_error_names_stage() {
        let err = AppenderError::persistence(
            WriteStage::InsertProperties,
            diesel::result::Error::NotFound,
        );
        let msg = err.to_string();
        assert!(msg.contains("insert logging_event_property"));
        assert_eq!(err.category(), "persistence");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_from_conversions() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: AppenderError = io_error.into();
        assert!(matches!(err, AppenderError::IoError { .. }));

        let diesel_error = diesel::result::Error::RollbackTransaction;
        let err: AppenderError = diesel_error.into();
        assert!(matches!(err, AppenderError::DatabaseError { .. }));
        assert_eq!(err.category(), "persistence");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(AppenderError::UnexpectedRowCount(0).is_recoverable());
        assert!(AppenderError::connection("gone").is_recoverable());
        assert!(!AppenderError::MissingConnectionSource.is_recoverable());
        assert!(!AppenderError::UnresolvedDialect(DialectCode::Unknown).is_recoverable());
        assert!(!AppenderError::Closed.is_recoverable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(AppenderError::config("test").category(), "config");
        assert_eq!(AppenderError::MissingConnectionSource.category(), "config");
        assert_eq!(AppenderError::TraceTooLong(40_000).category(), "persistence");
        assert_eq!(AppenderError::connection("test").category(), "connection");
        assert_eq!(AppenderError::Closed.category(), "lifecycle");
    }

    #[test]
    fn test_unicode_error_message() {
        let unicode_msg = "配置错误: 无效的参数 🚫";
        let err = AppenderError::config(unicode_msg);
        assert!(err.to_string().contains(unicode_msg));
    }

    #[test]
    fn test_unresolved_dialect_message() {
        let err = AppenderError::UnresolvedDialect(DialectCode::Unknown);
        assert!(err
            .to_string()
            .contains("cannot function without a determined SQL dialect"));
    }
}
