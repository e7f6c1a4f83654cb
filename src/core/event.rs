//! 日志事件定义
//!
//! 此模块定义了交给数据库追加器的日志事件结构。事件由日志框架构造，
//! 追加器只读取其中的字段。

use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::Metadata;

/// 位置信息不可用时使用的占位符
pub const NA: &str = "?";

/// 进程级事件序号
static SEQUENCE_NUMBER: AtomicI64 = AtomicI64::new(1);

/// 获取下一个进程内单调递增的事件序号
pub fn next_sequence_number() -> i64 {
    SEQUENCE_NUMBER.fetch_add(1, Ordering::Relaxed)
}

/// 调用点位置信息
///
/// 四个字段各自可能为 [`NA`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    /// 源文件名
    pub file_name: String,
    /// 类名（Rust 中为模块路径或 target）
    pub class_name: String,
    /// 方法名
    pub method_name: String,
    /// 行号
    pub line_number: String,
}

impl LocationInfo {
    /// 创建新的位置信息
    pub fn new(
        file_name: impl Into<String>,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        line_number: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            class_name: class_name.into(),
            method_name: method_name.into(),
            line_number: line_number.into(),
        }
    }

    /// 四个字段全部为 [`NA`] 的位置信息
    pub fn not_available() -> Self {
        Self::new(NA, NA, NA, NA)
    }

    /// 从 tracing 元数据读取调用点
    ///
    /// tracing 不记录函数名，方法名始终为 [`NA`]。
    pub fn from_metadata(metadata: &Metadata<'_>) -> Self {
        Self {
            file_name: metadata.file().unwrap_or(NA).to_string(),
            class_name: metadata
                .module_path()
                .unwrap_or_else(|| metadata.target())
                .to_string(),
            method_name: NA.to_string(),
            line_number: metadata
                .line()
                .map_or_else(|| NA.to_string(), |line| line.to_string()),
        }
    }

    /// 是否至少有一个字段包含真实数据
    pub fn is_available(&self) -> bool {
        [
            &self.file_name,
            &self.class_name,
            &self.method_name,
            &self.line_number,
        ]
        .iter()
        .any(|field| field.as_str() != NA)
    }
}

impl Default for LocationInfo {
    fn default() -> Self {
        Self::not_available()
    }
}

/// 事件携带的调用点来源
#[derive(Clone, Default)]
pub enum CallerLocation {
    /// 日志框架已经捕获的位置
    Captured(LocationInfo),
    /// 可按需读取的调用点，仅在追加器开启位置采集时读取
    Callsite(&'static Metadata<'static>),
    /// 没有任何位置信息
    #[default]
    Unknown,
}

impl fmt::Debug for CallerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured(info) => f.debug_tuple("Captured").field(info).finish(),
            Self::Callsite(metadata) => f
                .debug_tuple("Callsite")
                .field(&metadata.name())
                .finish(),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// 日志事件
///
/// 包含一次日志调用的全部信息：序号、时间戳、消息、级别、
/// 可选的上下文属性、异常堆栈以及调用点。
#[derive(Debug, Clone)]
pub struct LoggingEvent {
    /// 进程内单调递增的序号
    pub sequence_number: i64,
    /// 毫秒级 Unix 时间戳
    pub timestamp: i64,
    /// 渲染后的日志消息
    pub rendered_message: String,
    /// 记录器名称
    pub logger_name: String,
    /// 日志级别
    pub level: String,
    /// 嵌套诊断上下文
    pub ndc: Option<String>,
    /// 线程名
    pub thread_name: String,
    /// 上下文属性，按键排序
    pub properties: BTreeMap<String, String>,
    /// 异常堆栈行，None 表示没有异常
    pub throwable: Option<Vec<String>>,
    /// 调用点
    pub location: CallerLocation,
}

impl LoggingEvent {
    /// 创建新的日志事件
    ///
    /// 序号取自进程计数器，时间戳为当前时间，线程名取当前线程。
    pub fn new(
        logger_name: impl Into<String>,
        level: impl Into<String>,
        rendered_message: impl Into<String>,
    ) -> Self {
        Self {
            sequence_number: next_sequence_number(),
            timestamp: Utc::now().timestamp_millis(),
            rendered_message: rendered_message.into(),
            logger_name: logger_name.into(),
            level: level.into(),
            ndc: None,
            thread_name: current_thread_name(),
            properties: BTreeMap::new(),
            throwable: None,
            location: CallerLocation::Unknown,
        }
    }

    /// 设置时间戳
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 设置嵌套诊断上下文
    pub fn with_ndc(mut self, ndc: impl Into<String>) -> Self {
        self.ndc = Some(ndc.into());
        self
    }

    /// 设置线程名
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// 添加上下文属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 设置异常堆栈
    pub fn with_throwable<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.throwable = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// 设置调用点
    pub fn with_location(mut self, location: CallerLocation) -> Self {
        self.location = location;
        self
    }

    /// 是否带有上下文属性
    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    /// 是否带有异常（空堆栈也算存在）
    pub fn has_throwable(&self) -> bool {
        self.throwable.is_some()
    }
}

/// 当前线程名，未命名线程使用线程 ID
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
