//! 数据库 Sink 模块
//!
//! 此模块把日志事件写入关系数据库的三张表，支持 SQLite、MySQL 和 PostgreSQL。

pub mod appender;
pub mod connection;
pub mod dialect;
pub mod mapping;
pub mod models;
pub mod schema;
pub mod sink;

pub use appender::{DbAppender, DbAppenderBuilder};
pub use connection::{create_tables, ConnectionSource, DatabasePool, LogConnection, PooledConnectionSource};
pub use dialect::{resolve_dialect, DialectCode, SqlDialect};
pub use mapping::{compute_reference_mask, resolve_location, EventRecord, ReferenceMask};
