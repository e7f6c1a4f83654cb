//! 数据库追加器的内部诊断计数。
//!
//! 每个追加器持有一组计数器，克隆共享同一组。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 内部诊断与指标数据结构。
///
/// 使用原子操作确保线程安全。
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// 追加器激活时间
    start_time: Option<Instant>,

    /// 成功提交的事件数
    events_appended: AtomicU64,

    /// 持久化失败（已回滚）的事件数
    append_failures: AtomicU64,

    /// 关闭后被拒绝的追加次数
    appends_rejected: AtomicU64,

    property_rows_written: AtomicU64,

    exception_rows_written: AtomicU64,
}

/// 诊断数据的快照，用于外部查询。
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
    /// 追加器运行时间
    pub uptime: Option<Duration>,

    /// 成功提交的事件数
    pub events_appended: u64,

    /// 持久化失败（已回滚）的事件数
    pub append_failures: u64,

    /// 关闭后被拒绝的追加次数
    pub appends_rejected: u64,

    /// 已写入的属性行数
    pub property_rows_written: u64,

    /// 已写入的异常堆栈行数
    pub exception_rows_written: u64,

    /// 提交成功率（百分比）
    pub success_rate_percent: f64,
}

impl Diagnostics {
    /// 创建新的诊断实例。
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn increment_events_appended(&self) {
        self.events_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_append_failures(&self) {
        self.append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_appends_rejected(&self) {
        self.appends_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_property_rows(&self, count: u64) {
        self.property_rows_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_exception_rows(&self, count: u64) {
        self.exception_rows_written.fetch_add(count, Ordering::Relaxed);
    }

    /// 获取诊断数据的快照。
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let events_appended = self.events_appended.load(Ordering::Relaxed);
        let append_failures = self.append_failures.load(Ordering::Relaxed);

        let success_rate_percent = if events_appended + append_failures > 0 {
            (events_appended as f64 / (events_appended + append_failures) as f64) * 100.0
        } else {
            100.0
        };

        DiagnosticsSnapshot {
            uptime: self.start_time.map(|start| start.elapsed()),
            events_appended,
            append_failures,
            appends_rejected: self.appends_rejected.load(Ordering::Relaxed),
            property_rows_written: self.property_rows_written.load(Ordering::Relaxed),
            exception_rows_written: self.exception_rows_written.load(Ordering::Relaxed),
            success_rate_percent,
        }
    }
}
