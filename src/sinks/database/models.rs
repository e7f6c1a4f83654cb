//! 数据库行模型定义
//!
//! 此模块定义了与三张日志表对应的 Rust 结构体，用于 Diesel 插入操作。
//! 所有行都借用自日志事件，插入过程中不复制字符串。

use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::sinks::database::schema::{logging_event, logging_event_exception, logging_event_property};

/// 用于插入 logging_event 父行的结构体
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = logging_event)]
pub struct NewLoggingEvent<'a> {
    /// 事件序号
    pub sequence_number: i64,

    /// 毫秒级时间戳
    pub timestamp: i64,

    /// 日志消息
    pub rendered_message: &'a str,

    /// 记录器名称
    pub logger_name: &'a str,

    /// 日志级别
    pub level_string: &'a str,

    /// 嵌套诊断上下文
    pub ndc: Option<&'a str>,

    /// 线程名
    pub thread_name: &'a str,

    /// 引用掩码
    pub reference_flag: i16,

    /// 调用点文件名
    pub caller_filename: &'a str,

    /// 调用点类名
    pub caller_class: &'a str,

    /// 调用点方法名
    pub caller_method: &'a str,

    /// 调用点行号
    pub caller_line: &'a str,
}

/// 用于插入 logging_event_property 子行的结构体
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = logging_event_property)]
pub struct NewEventProperty<'a> {
    pub event_id: i64,
    pub mapped_key: &'a str,
    pub mapped_value: &'a str,
}

/// 用于插入 logging_event_exception 子行的结构体
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = logging_event_exception)]
pub struct NewEventException<'a> {
    pub event_id: i64,
    /// 从 0 开始的行序号
    pub i: i16,
    pub trace_line: &'a str,
}

/// 方言查询返回的生成主键
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct GeneratedKey {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_rows_borrow_event_data() {
        let key = String::from("user");
        let value = String::from("alice");
        let row = NewEventProperty {
            event_id: 7,
            mapped_key: &key,
            mapped_value: &value,
        };
        assert_eq!(row.event_id, 7);
        assert_eq!(row.mapped_key, "user");
        assert_eq!(row.mapped_value, "alice");

        let line = String::from("Error: boom");
        let row = NewEventException {
            event_id: 7,
            i: 0,
            trace_line: &line,
        };
        assert_eq!(row.i, 0);
        assert_eq!(row.trace_line, "Error: boom");
    }
}
