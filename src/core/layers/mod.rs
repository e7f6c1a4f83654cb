//! tracing 处理层模块

pub mod appender_layer;

pub use appender_layer::DbAppenderLayer;
