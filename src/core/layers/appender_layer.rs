//! 数据库追加层
//!
//! 把 tracing 事件转换为 [`LoggingEvent`] 并在发出事件的线程上同步追加。

use std::cell::Cell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::core::event::{CallerLocation, LoggingEvent};
use crate::sinks::database::DbAppender;

thread_local! {
    static IN_APPEND: Cell<bool> = const { Cell::new(false) };
}

/// 追加期间的重入保护
///
/// 追加器自身会发出 tracing 事件，这些事件不能再次进入追加器。
struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Option<Self> {
        IN_APPEND.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(ReentrancyGuard)
            }
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        IN_APPEND.with(|flag| flag.set(false));
    }
}

/// 事件字段访问器
///
/// `message` 字段成为日志消息，错误字段展开为堆栈行，其余字段作为上下文属性。
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    properties: BTreeMap<String, String>,
    throwable: Option<Vec<String>>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.properties
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn Error + 'static)) {
        let lines = self.throwable.get_or_insert_with(Vec::new);
        lines.push(value.to_string());

        let mut source = value.source();
        while let Some(cause) = source {
            lines.push(format!("Caused by: {}", cause));
            source = cause.source();
        }
    }
}

/// 数据库追加层
#[derive(Debug, Clone)]
pub struct DbAppenderLayer {
    appender: DbAppender,
}

impl DbAppenderLayer {
    /// 使用已激活的追加器创建层
    pub fn new(appender: DbAppender) -> Self {
        Self { appender }
    }
}

impl<S> Layer<S> for DbAppenderLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            return;
        };

        let logging_event = to_logging_event(event, &ctx);
        // 追加器关闭后事件直接丢弃
        let _ = self.appender.append(&logging_event);
    }
}

/// 从 tracing 事件构造日志事件
///
/// 嵌套诊断上下文取自外层 span 名称，从根到叶以空格连接。
fn to_logging_event<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> LoggingEvent
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    let metadata = event.metadata();

    let mut visitor = EventVisitor::default();
    event.record(&mut visitor);

    let ndc = ctx.event_scope(event).and_then(|scope| {
        let names: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(" "))
        }
    });

    let mut logging_event = LoggingEvent::new(
        metadata.target(),
        metadata.level().as_str(),
        visitor.message.unwrap_or_default(),
    )
    .with_location(CallerLocation::Callsite(metadata));

    logging_event.ndc = ndc;
    logging_event.properties = visitor.properties;
    logging_event.throwable = visitor.throwable;
    logging_event
}
