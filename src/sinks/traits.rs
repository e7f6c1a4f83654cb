//! Sink Traits
//!
//! 定义异步日志框架接入追加器时使用的统一接口。
//!
//! # 使用示例
//!
//! ```rust
//! use quantum_log_db::sinks::traits::{QuantumSink, SinkMetadata, SinkType};
//! use quantum_log_db::core::event::LoggingEvent;
//! use quantum_log_db::error::AppenderError;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct CountingSink;
//!
//! #[async_trait]
//! impl QuantumSink for CountingSink {
//!     type Config = ();
//!     type Error = AppenderError;
//!
//!     async fn send_event(&self, event: LoggingEvent) -> Result<(), Self::Error> {
//!         println!("received: {}", event.rendered_message);
//!         Ok(())
//!     }
//!
//!     async fn shutdown(&self) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "counting"
//!     }
//!
//!     fn metadata(&self) -> SinkMetadata {
//!         SinkMetadata::new("counting".to_string(), SinkType::Stackable)
//!     }
//! }
//! ```

use crate::core::event::LoggingEvent;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::result::Result;

/// 基础 Sink trait
///
/// 所有日志输出目标必须实现的核心接口。
#[async_trait]
pub trait QuantumSink: Send + Sync + Debug {
    /// 配置类型，用于初始化 sink
    type Config: Send + Sync + Debug + Clone;

    /// 错误类型
    type Error: StdError + Send + Sync + 'static;

    /// 发送日志事件到输出目标
    async fn send_event(&self, event: LoggingEvent) -> Result<(), Self::Error>;

    /// 关闭 sink 并释放资源
    async fn shutdown(&self) -> Result<(), Self::Error>;

    /// 检查 sink 是否健康
    ///
    /// 默认实现总是返回 true。
    async fn is_healthy(&self) -> bool {
        true
    }

    /// 获取 sink 的名称
    fn name(&self) -> &'static str;

    /// 是否需要格式化布局
    ///
    /// 结构化写入的 sink 返回 false。
    fn requires_layout(&self) -> bool {
        true
    }

    /// 获取 sink 的元数据
    fn metadata(&self) -> SinkMetadata;
}

/// 独占型 Sink trait
///
/// 标记 trait，表示此 sink 独占一个输出目标，例如一个数据库。
pub trait ExclusiveSink: QuantumSink {}

/// Sink 类型枚举
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkType {
    /// 独占型 sink
    Exclusive,
    /// 可叠加型 sink
    Stackable,
}

/// Sink 元数据
#[derive(Debug, Clone)]
pub struct SinkMetadata {
    /// Sink 名称
    pub name: String,
    /// Sink 类型
    pub sink_type: SinkType,
    /// 是否启用
    pub enabled: bool,
    /// 描述信息
    pub description: Option<String>,
}

impl SinkMetadata {
    /// 创建新的 sink 元数据
    pub fn new(name: String, sink_type: SinkType) -> Self {
        Self {
            name,
            sink_type,
            enabled: true,
            description: None,
        }
    }

    /// 设置描述信息
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// 设置启用状态
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
