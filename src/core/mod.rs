//! 核心模块
//!
//! 本模块包含日志事件定义以及接入 tracing 的处理层。

pub mod event;
pub mod layers;

// 重新导出核心类型
pub use event::{CallerLocation, LocationInfo, LoggingEvent, NA};
pub use layers::DbAppenderLayer;
