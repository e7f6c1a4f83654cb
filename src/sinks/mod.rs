//! Sinks 模块
//!
//! 提供日志输出目标的实现以及统一的 Sink 接口。

pub mod database;
pub mod traits;

// 重新导出主要类型
pub use database::DbAppender;
pub use traits::{ExclusiveSink, QuantumSink, SinkMetadata, SinkType};
