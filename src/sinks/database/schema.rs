//! 日志表结构定义
//!
//! 此模块使用 Diesel 的 table! 宏定义三张日志表。列名必须与已有部署保持一致。

diesel::table! {
    logging_event (id) {
        sequence_number -> BigInt,
        timestamp -> BigInt,
        rendered_message -> Text,
        logger_name -> Text,
        level_string -> Text,
        ndc -> Nullable<Text>,
        thread_name -> Nullable<Text>,
        reference_flag -> Nullable<SmallInt>,
        caller_filename -> Text,
        caller_class -> Text,
        caller_method -> Text,
        caller_line -> Text,
        id -> BigInt,
    }
}

diesel::table! {
    logging_event_property (event_id, mapped_key) {
        event_id -> BigInt,
        mapped_key -> Text,
        mapped_value -> Nullable<Text>,
    }
}

diesel::table! {
    logging_event_exception (event_id, i) {
        event_id -> BigInt,
        i -> SmallInt,
        trace_line -> Text,
    }
}

diesel::joinable!(logging_event_property -> logging_event (event_id));
diesel::joinable!(logging_event_exception -> logging_event (event_id));

diesel::allow_tables_to_appear_in_same_query!(
    logging_event,
    logging_event_property,
    logging_event_exception,
);

/// 创建表的 SQL 语句
pub mod create_table_sql {
    /// PostgreSQL 创建表语句
    ///
    /// BIGSERIAL 生成的序列名为 `logging_event_id_seq`，方言查询依赖该名称。
    #[cfg(feature = "postgres")]
    pub const POSTGRES_CREATE_TABLES: &str = r#"
        CREATE TABLE IF NOT EXISTS logging_event (
            sequence_number BIGINT NOT NULL,
            timestamp BIGINT NOT NULL,
            rendered_message TEXT NOT NULL,
            logger_name VARCHAR(254) NOT NULL,
            level_string VARCHAR(254) NOT NULL,
            ndc TEXT,
            thread_name VARCHAR(254),
            reference_flag SMALLINT,
            caller_filename VARCHAR(254) NOT NULL,
            caller_class VARCHAR(254) NOT NULL,
            caller_method VARCHAR(254) NOT NULL,
            caller_line VARCHAR(16) NOT NULL,
            id BIGSERIAL PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS logging_event_property (
            event_id BIGINT NOT NULL,
            mapped_key VARCHAR(254) NOT NULL,
            mapped_value TEXT,
            PRIMARY KEY (event_id, mapped_key),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        );

        CREATE TABLE IF NOT EXISTS logging_event_exception (
            event_id BIGINT NOT NULL,
            i SMALLINT NOT NULL,
            trace_line TEXT NOT NULL,
            PRIMARY KEY (event_id, i),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        );
    "#;

    /// MySQL 创建表语句
    #[cfg(feature = "mysql")]
    pub const MYSQL_CREATE_TABLES: &str = r#"
        CREATE TABLE IF NOT EXISTS logging_event (
            sequence_number BIGINT NOT NULL,
            timestamp BIGINT NOT NULL,
            rendered_message TEXT NOT NULL,
            logger_name VARCHAR(254) NOT NULL,
            level_string VARCHAR(254) NOT NULL,
            ndc TEXT,
            thread_name VARCHAR(254),
            reference_flag SMALLINT,
            caller_filename VARCHAR(254) NOT NULL,
            caller_class VARCHAR(254) NOT NULL,
            caller_method VARCHAR(254) NOT NULL,
            caller_line VARCHAR(16) NOT NULL,
            id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

        CREATE TABLE IF NOT EXISTS logging_event_property (
            event_id BIGINT NOT NULL,
            mapped_key VARCHAR(254) NOT NULL,
            mapped_value TEXT,
            PRIMARY KEY (event_id, mapped_key),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

        CREATE TABLE IF NOT EXISTS logging_event_exception (
            event_id BIGINT NOT NULL,
            i SMALLINT NOT NULL,
            trace_line TEXT NOT NULL,
            PRIMARY KEY (event_id, i),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
    "#;

    /// SQLite 创建表语句
    #[cfg(feature = "sqlite")]
    pub const SQLITE_CREATE_TABLES: &str = r#"
        CREATE TABLE IF NOT EXISTS logging_event (
            sequence_number BIGINT NOT NULL,
            timestamp BIGINT NOT NULL,
            rendered_message TEXT NOT NULL,
            logger_name VARCHAR(254) NOT NULL,
            level_string VARCHAR(254) NOT NULL,
            ndc TEXT,
            thread_name VARCHAR(254),
            reference_flag SMALLINT,
            caller_filename VARCHAR(254) NOT NULL,
            caller_class VARCHAR(254) NOT NULL,
            caller_method VARCHAR(254) NOT NULL,
            caller_line VARCHAR(16) NOT NULL,
            id INTEGER PRIMARY KEY AUTOINCREMENT
        );

        CREATE TABLE IF NOT EXISTS logging_event_property (
            event_id INTEGER NOT NULL,
            mapped_key VARCHAR(254) NOT NULL,
            mapped_value TEXT,
            PRIMARY KEY (event_id, mapped_key),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        );

        CREATE TABLE IF NOT EXISTS logging_event_exception (
            event_id INTEGER NOT NULL,
            i SMALLINT NOT NULL,
            trace_line TEXT NOT NULL,
            PRIMARY KEY (event_id, i),
            FOREIGN KEY (event_id) REFERENCES logging_event(id)
        );
    "#;
}
