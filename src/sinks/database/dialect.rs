//! SQL 方言适配
//!
//! 持久化协议中唯一无法移植的部分是读取刚生成的主键。每个方言只提供
//! 这一条查询，且查询必须作用于当前连接，不能读取全局的"最后一个"值。

use std::fmt;
use std::sync::Arc;

use crate::config::DatabaseType;

/// 连接源报告的方言代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectCode {
    Postgres,
    Mysql,
    Sqlite,
    /// 无法识别的数据库产品
    Unknown,
}

impl fmt::Display for DialectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl From<&DatabaseType> for DialectCode {
    fn from(db_type: &DatabaseType) -> Self {
        match db_type {
            DatabaseType::Sqlite => Self::Sqlite,
            DatabaseType::Mysql => Self::Mysql,
            DatabaseType::Postgresql => Self::Postgres,
        }
    }
}

/// 方言适配器
pub trait SqlDialect: Send + Sync + fmt::Debug {
    /// 返回读取当前连接上最近生成主键的查询，结果列名为 `id`，类型为 BIGINT
    fn generated_key_query(&self) -> &'static str;
}

/// SQLite：`last_insert_rowid()` 以连接为作用域
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn generated_key_query(&self) -> &'static str {
        "SELECT last_insert_rowid() AS id"
    }
}

/// PostgreSQL：`currval` 以会话为作用域
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn generated_key_query(&self) -> &'static str {
        "SELECT currval('logging_event_id_seq') AS id"
    }
}

/// MySQL：`LAST_INSERT_ID()` 以连接为作用域，返回无符号数，需要转换
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn generated_key_query(&self) -> &'static str {
        "SELECT CAST(LAST_INSERT_ID() AS SIGNED) AS id"
    }
}

/// 根据方言代码解析适配器
///
/// 未知方言返回 `None`，追加器据此拒绝激活。
pub fn resolve_dialect(code: DialectCode) -> Option<Arc<dyn SqlDialect>> {
    match code {
        DialectCode::Sqlite => Some(Arc::new(SqliteDialect)),
        DialectCode::Postgres => Some(Arc::new(PostgresDialect)),
        DialectCode::Mysql => Some(Arc::new(MysqlDialect)),
        DialectCode::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_dialects() {
        for code in [DialectCode::Sqlite, DialectCode::Postgres, DialectCode::Mysql] {
            let dialect = resolve_dialect(code).expect("known dialect should resolve");
            assert!(dialect.generated_key_query().contains("AS id"));
        }
    }

    #[test]
    fn test_unknown_dialect_does_not_resolve() {
        assert!(resolve_dialect(DialectCode::Unknown).is_none());
    }

    #[test]
    fn test_queries_are_connection_scoped() {
        assert!(SqliteDialect.generated_key_query().contains("last_insert_rowid()"));
        assert!(PostgresDialect.generated_key_query().contains("currval"));
        assert!(MysqlDialect.generated_key_query().contains("LAST_INSERT_ID()"));
        // MAX(id) 会与其他连接的插入竞争
        for query in [
            SqliteDialect.generated_key_query(),
            PostgresDialect.generated_key_query(),
            MysqlDialect.generated_key_query(),
        ] {
            assert!(!query.to_uppercase().contains("MAX("));
        }
    }

    #[test]
    fn test_dialect_code_from_database_type() {
        assert_eq!(DialectCode::from(&DatabaseType::Sqlite), DialectCode::Sqlite);
        assert_eq!(DialectCode::from(&DatabaseType::Mysql), DialectCode::Mysql);
        assert_eq!(
            DialectCode::from(&DatabaseType::Postgresql),
            DialectCode::Postgres
        );
        assert_eq!(DialectCode::Unknown.to_string(), "unknown");
    }
}
