//! 数据库连接源
//!
//! 追加器每次写入都向连接源申请一条独占连接，写入结束后归还。
//! 生成主键的读取依赖这一点：同一连接上不会混入其他线程的插入。

use std::fmt;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::debug;

use crate::config::{DatabaseType, DbAppenderConfig};
use crate::error::{AppenderError, Result};
use crate::sinks::database::dialect::DialectCode;

#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

#[cfg(feature = "mysql")]
use diesel::mysql::MysqlConnection;

#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "mysql")))]
compile_error!("至少需要启用一个数据库后端特性: sqlite、postgres 或 mysql");

/// 数据库连接池类型别名
#[cfg(feature = "sqlite")]
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[cfg(feature = "mysql")]
pub type MysqlPool = Pool<ConnectionManager<MysqlConnection>>;

#[cfg(feature = "postgres")]
pub type PostgresPool = Pool<ConnectionManager<PgConnection>>;

/// 从连接池取出的单条连接
pub enum LogConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(PooledConnection<ConnectionManager<SqliteConnection>>),
    #[cfg(feature = "mysql")]
    Mysql(PooledConnection<ConnectionManager<MysqlConnection>>),
    #[cfg(feature = "postgres")]
    Postgres(PooledConnection<ConnectionManager<PgConnection>>),
}

impl LogConnection {
    /// 连接所属的方言
    pub fn dialect_code(&self) -> DialectCode {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => DialectCode::Sqlite,
            #[cfg(feature = "mysql")]
            Self::Mysql(_) => DialectCode::Mysql,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => DialectCode::Postgres,
        }
    }
}

impl fmt::Debug for LogConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogConnection")
            .field(&self.dialect_code())
            .finish()
    }
}

/// 连接源
///
/// 提供调用范围内独占的连接，并报告所用的 SQL 方言。
pub trait ConnectionSource: Send + Sync + fmt::Debug {
    /// 获取一条连接
    fn get_connection(&self) -> Result<LogConnection>;

    /// 报告方言代码
    fn sql_dialect_code(&self) -> DialectCode;
}

/// 数据库连接池枚举
#[derive(Clone)]
pub enum DatabasePool {
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
    #[cfg(feature = "mysql")]
    Mysql(MysqlPool),
    #[cfg(feature = "postgres")]
    Postgres(PostgresPool),
}

/// SQLite 连接检出时的初始化
///
/// WAL 允许读写并发，busy_timeout 让并发写入等待而不是立即失败。
#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Copy)]
struct SqliteConnectionCustomizer {
    busy_timeout_ms: u64,
}

#[cfg(feature = "sqlite")]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for SqliteConnectionCustomizer
{
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};
             PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// 基于 r2d2 连接池的连接源
#[derive(Clone)]
pub struct PooledConnectionSource {
    pool: DatabasePool,
    dialect_code: DialectCode,
}

impl fmt::Debug for PooledConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnectionSource")
            .field("dialect_code", &self.dialect_code)
            .field("pool", &"<DatabasePool>")
            .finish()
    }
}

impl PooledConnectionSource {
    /// 根据配置创建数据库连接池
    pub fn from_config(config: &DbAppenderConfig) -> Result<Self> {
        let timeout_duration = Duration::from_millis(config.connection_timeout_ms);

        let pool = match config.db_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                let manager = ConnectionManager::<SqliteConnection>::new(&config.connection_string);
                let pool = Pool::builder()
                    .max_size(config.connection_pool_size)
                    .connection_timeout(timeout_duration)
                    .connection_customizer(Box::new(SqliteConnectionCustomizer {
                        busy_timeout_ms: config.busy_timeout_ms,
                    }))
                    .build(manager)
                    .map_err(|e| AppenderError::connection(format!("SQLite 连接池创建失败: {}", e)))?;
                DatabasePool::Sqlite(pool)
            }
            #[cfg(feature = "mysql")]
            DatabaseType::Mysql => {
                let manager = ConnectionManager::<MysqlConnection>::new(&config.connection_string);
                let pool = Pool::builder()
                    .max_size(config.connection_pool_size)
                    .connection_timeout(timeout_duration)
                    .build(manager)
                    .map_err(|e| AppenderError::connection(format!("MySQL 连接池创建失败: {}", e)))?;
                DatabasePool::Mysql(pool)
            }
            #[cfg(feature = "postgres")]
            DatabaseType::Postgresql => {
                let manager = ConnectionManager::<PgConnection>::new(&config.connection_string);
                let pool = Pool::builder()
                    .max_size(config.connection_pool_size)
                    .connection_timeout(timeout_duration)
                    .build(manager)
                    .map_err(|e| {
                        AppenderError::connection(format!("PostgreSQL 连接池创建失败: {}", e))
                    })?;
                DatabasePool::Postgres(pool)
            }
            #[cfg(not(feature = "sqlite"))]
            DatabaseType::Sqlite => {
                return Err(AppenderError::FeatureNotEnabled("sqlite".to_string()))
            }
            #[cfg(not(feature = "mysql"))]
            DatabaseType::Mysql => {
                return Err(AppenderError::FeatureNotEnabled("mysql".to_string()))
            }
            #[cfg(not(feature = "postgres"))]
            DatabaseType::Postgresql => {
                return Err(AppenderError::FeatureNotEnabled("postgres".to_string()))
            }
        };

        debug!("数据库连接池已创建，数据库类型: {:?}", config.db_type);

        Ok(Self::from_pool(pool))
    }

    /// 使用已有连接池创建连接源
    pub fn from_pool(pool: DatabasePool) -> Self {
        let dialect_code = match &pool {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(_) => DialectCode::Sqlite,
            #[cfg(feature = "mysql")]
            DatabasePool::Mysql(_) => DialectCode::Mysql,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(_) => DialectCode::Postgres,
        };
        Self { pool, dialect_code }
    }
}

impl ConnectionSource for PooledConnectionSource {
    fn get_connection(&self) -> Result<LogConnection> {
        let conn = match &self.pool {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => LogConnection::Sqlite(pool.get()?),
            #[cfg(feature = "mysql")]
            DatabasePool::Mysql(pool) => LogConnection::Mysql(pool.get()?),
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => LogConnection::Postgres(pool.get()?),
        };
        Ok(conn)
    }

    fn sql_dialect_code(&self) -> DialectCode {
        self.dialect_code
    }
}

/// 创建三张日志表（如果不存在）
pub fn create_tables(conn: &mut LogConnection) -> Result<()> {
    use crate::sinks::database::schema::create_table_sql;

    match conn {
        #[cfg(feature = "sqlite")]
        LogConnection::Sqlite(conn) => conn.batch_execute(create_table_sql::SQLITE_CREATE_TABLES)?,
        #[cfg(feature = "mysql")]
        LogConnection::Mysql(conn) => conn.batch_execute(create_table_sql::MYSQL_CREATE_TABLES)?,
        #[cfg(feature = "postgres")]
        LogConnection::Postgres(conn) => {
            conn.batch_execute(create_table_sql::POSTGRES_CREATE_TABLES)?
        }
    }

    debug!("日志表已就绪: {:?}", conn.dialect_code());
    Ok(())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::DbAppenderConfig;
    use diesel::prelude::*;
    use diesel::sql_types::Integer;
    use tempfile::tempdir;

    #[derive(QueryableByName)]
    struct PragmaValue {
        #[diesel(sql_type = Integer)]
        timeout: i32,
    }

    #[test]
    fn test_sqlite_source_creation() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("source.db");

        let mut config = DbAppenderConfig::sqlite(db_path.to_string_lossy());
        config.busy_timeout_ms = 2_500;
        config.connection_pool_size = 2;

        let source = PooledConnectionSource::from_config(&config).unwrap();
        assert_eq!(source.sql_dialect_code(), DialectCode::Sqlite);

        let conn = source.get_connection().unwrap();
        assert_eq!(conn.dialect_code(), DialectCode::Sqlite);
        let LogConnection::Sqlite(mut conn) = conn else {
            panic!("expected a SQLite connection");
        };
        let value = diesel::sql_query("PRAGMA busy_timeout")
            .get_result::<PragmaValue>(&mut *conn)
            .unwrap();
        assert_eq!(value.timeout, 2_500);
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("schema.db");
        let config = DbAppenderConfig::sqlite(db_path.to_string_lossy());
        let source = PooledConnectionSource::from_config(&config).unwrap();

        let mut conn = source.get_connection().unwrap();
        create_tables(&mut conn).unwrap();
        create_tables(&mut conn).unwrap();
    }
}
