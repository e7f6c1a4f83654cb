//! 事件到数据库行的映射
//!
//! 引用掩码与位置信息的推导是纯函数，不访问数据库，可单独测试。

use std::borrow::Cow;
use std::fmt;

use crate::core::event::{CallerLocation, LocationInfo, LoggingEvent};
use crate::error::{AppenderError, Result};
use crate::sinks::database::models::{NewEventException, NewEventProperty, NewLoggingEvent};

/// 引用掩码，记录事件带有哪些可选子记录
///
/// 掩码总是从事件本身重新计算，不独立保存。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReferenceMask(i16);

impl ReferenceMask {
    /// 存在上下文属性
    pub const PROPERTIES_EXIST: i16 = 0x01;
    /// 存在异常堆栈
    pub const EXCEPTION_EXISTS: i16 = 0x02;
    /// 存在调用点位置
    pub const LOCATION_EXISTS: i16 = 0x04;

    /// 原始位值
    pub fn bits(self) -> i16 {
        self.0
    }

    /// 是否包含指定位
    pub fn contains(self, flag: i16) -> bool {
        self.0 & flag == flag
    }

    pub fn has_properties(self) -> bool {
        self.contains(Self::PROPERTIES_EXIST)
    }

    pub fn has_exception(self) -> bool {
        self.contains(Self::EXCEPTION_EXISTS)
    }

    pub fn has_location(self) -> bool {
        self.contains(Self::LOCATION_EXISTS)
    }
}

impl fmt::Debug for ReferenceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceMask({:#04x})", self.0)
    }
}

/// 解析事件最终写入的位置信息
///
/// 已捕获的位置总是使用；可按需读取的调用点只在开启位置采集时读取；
/// 其余情况四个字段全部为占位符。
pub fn resolve_location(event: &LoggingEvent, capture_location: bool) -> Cow<'_, LocationInfo> {
    match &event.location {
        CallerLocation::Captured(info) => Cow::Borrowed(info),
        CallerLocation::Callsite(metadata) if capture_location => {
            Cow::Owned(LocationInfo::from_metadata(metadata))
        }
        CallerLocation::Callsite(_) | CallerLocation::Unknown => {
            Cow::Owned(LocationInfo::not_available())
        }
    }
}

/// 计算引用掩码
pub fn compute_reference_mask(event: &LoggingEvent, location: &LocationInfo) -> ReferenceMask {
    let mut mask = 0;
    if event.has_properties() {
        mask |= ReferenceMask::PROPERTIES_EXIST;
    }
    if event.has_throwable() {
        mask |= ReferenceMask::EXCEPTION_EXISTS;
    }
    if location.is_available() {
        mask |= ReferenceMask::LOCATION_EXISTS;
    }
    ReferenceMask(mask)
}

/// 一次追加要写入的全部行的来源
///
/// 父行在主键生成之前即可构造；子行需要插入父行后读回的主键。
#[derive(Debug)]
pub struct EventRecord<'a> {
    event: &'a LoggingEvent,
    location: Cow<'a, LocationInfo>,
    mask: ReferenceMask,
}

impl<'a> EventRecord<'a> {
    /// 从事件构造记录
    pub fn new(event: &'a LoggingEvent, capture_location: bool) -> Self {
        let location = resolve_location(event, capture_location);
        let mask = compute_reference_mask(event, &location);
        Self {
            event,
            location,
            mask,
        }
    }

    pub fn mask(&self) -> ReferenceMask {
        self.mask
    }

    pub fn location(&self) -> &LocationInfo {
        &self.location
    }

    /// logging_event 父行
    pub fn event_row(&self) -> NewLoggingEvent<'_> {
        let event = self.event;
        NewLoggingEvent {
            sequence_number: event.sequence_number,
            timestamp: event.timestamp,
            rendered_message: &event.rendered_message,
            logger_name: &event.logger_name,
            level_string: &event.level,
            ndc: event.ndc.as_deref(),
            thread_name: &event.thread_name,
            reference_flag: self.mask.bits(),
            caller_filename: &self.location.file_name,
            caller_class: &self.location.class_name,
            caller_method: &self.location.method_name,
            caller_line: &self.location.line_number,
        }
    }

    /// logging_event_property 子行，空映射返回空集合
    pub fn property_rows(&self, event_id: i64) -> Vec<NewEventProperty<'a>> {
        let event: &'a LoggingEvent = self.event;
        event
            .properties
            .iter()
            .map(|(key, value)| NewEventProperty {
                event_id,
                mapped_key: key,
                mapped_value: value,
            })
            .collect()
    }

    /// logging_event_exception 子行，按原始顺序编号
    ///
    /// 行序号列为 SMALLINT，超出范围的堆栈整体拒绝。
    pub fn exception_rows(&self, event_id: i64) -> Result<Vec<NewEventException<'a>>> {
        let event: &'a LoggingEvent = self.event;
        let Some(lines) = event.throwable.as_ref() else {
            return Ok(Vec::new());
        };

        lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let i = i16::try_from(index)
                    .map_err(|_| AppenderError::TraceTooLong(lines.len()))?;
                Ok::<_, AppenderError>(NewEventException {
                    event_id,
                    i,
                    trace_line: line,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::NA;
    use proptest::prelude::*;
    use tracing::Level;

    static CALLSITE: tracing::callsite::DefaultCallsite =
        tracing::callsite::DefaultCallsite::new(&META);
    static META: tracing::Metadata<'static> = tracing::Metadata::new(
        "event src/main.rs:17",
        "app::handler",
        Level::INFO,
        Some("src/main.rs"),
        Some(17),
        Some("app::handler"),
        tracing::field::FieldSet::new(&[], tracing::callsite::Identifier(&CALLSITE)),
        tracing::metadata::Kind::EVENT,
    );

    fn plain_event() -> LoggingEvent {
        LoggingEvent::new("root", "INFO", "boot")
    }

    #[test]
    fn test_plain_event_has_empty_mask() {
        let event = plain_event();
        let record = EventRecord::new(&event, false);
        assert_eq!(record.mask().bits(), 0);
        assert_eq!(*record.location(), LocationInfo::not_available());
        assert!(record.property_rows(1).is_empty());
        assert!(record.exception_rows(1).unwrap().is_empty());
    }

    #[test]
    fn test_callsite_ignored_without_capture() {
        let event = plain_event().with_location(CallerLocation::Callsite(&META));
        let record = EventRecord::new(&event, false);

        let row = record.event_row();
        assert_eq!(row.caller_filename, NA);
        assert_eq!(row.caller_class, NA);
        assert_eq!(row.caller_method, NA);
        assert_eq!(row.caller_line, NA);
        assert!(!record.mask().has_location());
    }

    #[test]
    fn test_callsite_read_with_capture() {
        let event = plain_event().with_location(CallerLocation::Callsite(&META));
        let record = EventRecord::new(&event, true);

        let row = record.event_row();
        assert_eq!(row.caller_filename, "src/main.rs");
        assert_eq!(row.caller_class, "app::handler");
        assert_eq!(row.caller_line, "17");
        assert!(record.mask().has_location());
    }

    #[test]
    fn test_captured_location_used_regardless_of_flag() {
        let info = LocationInfo::new("lib.rs", "app::db", "insert", "88");
        let event = plain_event().with_location(CallerLocation::Captured(info.clone()));

        for capture in [false, true] {
            let record = EventRecord::new(&event, capture);
            assert_eq!(*record.location(), info);
            assert!(record.mask().has_location());
        }
    }

    #[test]
    fn test_empty_throwable_sets_bit_without_rows() {
        let event = plain_event().with_throwable(Vec::<String>::new());
        let record = EventRecord::new(&event, false);
        assert!(record.mask().has_exception());
        assert!(record.exception_rows(3).unwrap().is_empty());
    }

    #[test]
    fn test_exception_rows_are_indexed_in_order() {
        let event = plain_event().with_throwable(["first", "second", "third"]);
        let record = EventRecord::new(&event, false);
        let rows = record.exception_rows(9).unwrap();

        assert_eq!(rows.len(), 3);
        for (expected, row) in rows.iter().enumerate() {
            assert_eq!(row.event_id, 9);
            assert_eq!(row.i as usize, expected);
        }
        assert_eq!(rows[0].trace_line, "first");
        assert_eq!(rows[2].trace_line, "third");
    }

    #[test]
    fn test_oversized_trace_is_rejected() {
        let lines = vec!["frame"; i16::MAX as usize + 2];
        let event = plain_event().with_throwable(lines);
        let record = EventRecord::new(&event, false);
        assert!(matches!(
            record.exception_rows(1),
            Err(AppenderError::TraceTooLong(_))
        ));
    }

    #[test]
    fn test_property_rows_share_event_id() {
        let event = plain_event()
            .with_property("user", "alice")
            .with_property("req", "42");
        let record = EventRecord::new(&event, false);
        let rows = record.property_rows(5);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.event_id == 5));
        assert!(rows
            .iter()
            .any(|row| row.mapped_key == "user" && row.mapped_value == "alice"));
        assert!(rows
            .iter()
            .any(|row| row.mapped_key == "req" && row.mapped_value == "42"));
        assert!(record.mask().has_properties());
    }

    #[test]
    fn test_mask_debug_format() {
        let mask = ReferenceMask(ReferenceMask::PROPERTIES_EXIST | ReferenceMask::EXCEPTION_EXISTS);
        assert_eq!(format!("{:?}", mask), "ReferenceMask(0x03)");
    }

    fn shaped_event(
        properties: Vec<(String, String)>,
        throwable: Option<Vec<String>>,
        location: Option<(String, u32)>,
    ) -> LoggingEvent {
        let mut event = plain_event();
        event.properties = properties.into_iter().collect();
        event.throwable = throwable;
        if let Some((file, line)) = location {
            event.location =
                CallerLocation::Captured(LocationInfo::new(file, "m", "f", line.to_string()));
        }
        event
    }

    proptest! {
        #[test]
        fn prop_mask_depends_only_on_shape(
            properties in prop::collection::vec(("[a-z]{1,8}", ".{0,16}"), 0..4),
            throwable in prop::option::of(prop::collection::vec(".{0,32}", 0..4)),
            location in prop::option::of(("[a-z]{1,8}\\.rs", 1u32..5000)),
            capture in any::<bool>(),
        ) {
            let event = shaped_event(properties, throwable, location);
            let record = EventRecord::new(&event, capture);
            let mask = record.mask();

            prop_assert_eq!(mask.has_properties(), !event.properties.is_empty());
            prop_assert_eq!(mask.has_exception(), event.throwable.is_some());
            prop_assert_eq!(
                mask.has_location(),
                matches!(event.location, CallerLocation::Captured(_))
            );
            prop_assert_eq!(mask.bits() & !0x07, 0);
        }
    }
}
