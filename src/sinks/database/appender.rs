//! 数据库追加器实现
//!
//! 将一个日志事件拆分为 logging_event、logging_event_property 和
//! logging_event_exception 三张表中的行，并在同一事务中写入。
//! 子行依赖父行插入后读回的主键，因此整个序列必须在同一连接上按顺序执行。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use diesel::prelude::*;
use tracing::{debug, error, warn};

use crate::config::DbAppenderConfig;
use crate::core::event::LoggingEvent;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::error::{AppenderError, Result, WriteStage};
use crate::sinks::database::connection::{
    create_tables, ConnectionSource, LogConnection, PooledConnectionSource,
};
use crate::sinks::database::dialect::{resolve_dialect, SqlDialect};
use crate::sinks::database::mapping::EventRecord;
use crate::sinks::database::models::GeneratedKey;
use crate::sinks::database::schema::{logging_event, logging_event_exception, logging_event_property};

/// 事务内的写入序列
///
/// 各数据库后端的连接类型不同，用宏为每个具体连接类型展开同一段逻辑。
macro_rules! write_event_rows {
    ($conn:ident, $record:expr, $dialect:expr) => {{
        let record: &EventRecord<'_> = $record;

        let inserted = diesel::insert_into(logging_event::table)
            .values(record.event_row())
            .execute($conn)
            .map_err(|e| AppenderError::persistence(WriteStage::InsertEvent, e))?;
        if inserted != 1 {
            warn!("Failed to insert logging event: {} rows affected", inserted);
            return Err(AppenderError::UnexpectedRowCount(inserted));
        }

        let event_id = diesel::sql_query($dialect.generated_key_query())
            .get_result::<GeneratedKey>($conn)
            .map_err(|e| AppenderError::persistence(WriteStage::FetchGeneratedKey, e))?
            .id;

        let properties = record.property_rows(event_id);
        if !properties.is_empty() {
            diesel::insert_into(logging_event_property::table)
                .values(&properties)
                .execute($conn)
                .map_err(|e| AppenderError::persistence(WriteStage::InsertProperties, e))?;
        }

        let trace = record.exception_rows(event_id)?;
        if !trace.is_empty() {
            diesel::insert_into(logging_event_exception::table)
                .values(&trace)
                .execute($conn)
                .map_err(|e| AppenderError::persistence(WriteStage::InsertException, e))?;
        }

        Ok::<i64, AppenderError>(event_id)
    }};
}

/// 在一个事务中写入事件的全部行，返回生成的事件主键
///
/// 任何一步失败都会回滚整个事务，不会留下没有子行的父行。
fn persist_event(
    conn: &mut LogConnection,
    record: &EventRecord<'_>,
    dialect: &dyn SqlDialect,
) -> Result<i64> {
    match conn {
        // IMMEDIATE 事务在开始时即获取写锁，避免并发写入在提交时升级锁失败
        #[cfg(feature = "sqlite")]
        LogConnection::Sqlite(pooled) => {
            let conn: &mut diesel::sqlite::SqliteConnection = pooled;
            conn.immediate_transaction(|conn| write_event_rows!(conn, record, dialect))
        }
        #[cfg(feature = "mysql")]
        LogConnection::Mysql(pooled) => {
            let conn: &mut diesel::mysql::MysqlConnection = pooled;
            conn.transaction(|conn| write_event_rows!(conn, record, dialect))
        }
        #[cfg(feature = "postgres")]
        LogConnection::Postgres(pooled) => {
            let conn: &mut diesel::pg::PgConnection = pooled;
            conn.transaction(|conn| write_event_rows!(conn, record, dialect))
        }
    }
}

/// 数据库追加器构建器
///
/// 收集配置，在 [`activate_options`](DbAppenderBuilder::activate_options)
/// 时校验连接源并解析方言。只有激活成功后才能得到可写入的追加器。
#[derive(Debug, Default)]
pub struct DbAppenderBuilder {
    connection_source: Option<Arc<dyn ConnectionSource>>,
    location_info: bool,
}

impl DbAppenderBuilder {
    /// 设置连接源
    pub fn connection_source<S>(mut self, source: S) -> Self
    where
        S: ConnectionSource + 'static,
    {
        debug!("connection source set for DbAppender");
        self.connection_source = Some(Arc::new(source));
        self
    }

    /// 设置共享的连接源
    pub fn shared_connection_source(mut self, source: Arc<dyn ConnectionSource>) -> Self {
        self.connection_source = Some(source);
        self
    }

    /// 是否写入调用点位置信息
    ///
    /// 采集位置代价较高，默认关闭。
    pub fn location_info(mut self, location_info: bool) -> Self {
        self.location_info = location_info;
        self
    }

    /// 校验配置并激活追加器
    ///
    /// 缺少连接源或无法解析方言时立即失败。
    pub fn activate_options(self) -> Result<DbAppender> {
        debug!("DbAppender.activate_options called");

        let connection_source = self
            .connection_source
            .ok_or(AppenderError::MissingConnectionSource)?;

        let code = connection_source.sql_dialect_code();
        let dialect = resolve_dialect(code).ok_or(AppenderError::UnresolvedDialect(code))?;

        debug!(
            "DbAppender activated, dialect: {}, location_info: {}",
            code, self.location_info
        );

        Ok(DbAppender {
            connection_source: Arc::new(RwLock::new(Some(connection_source))),
            dialect,
            location_info: self.location_info,
            rejection_logged: Arc::new(AtomicBool::new(false)),
            diagnostics: Arc::new(Diagnostics::new()),
        })
    }
}

/// 数据库追加器
///
/// 已激活的追加器，配置在激活后只读。克隆共享同一连接源槽位
/// 和诊断计数器；关闭时连接源从槽位中取出，连接池随之释放。
#[derive(Clone)]
pub struct DbAppender {
    connection_source: Arc<RwLock<Option<Arc<dyn ConnectionSource>>>>,
    dialect: Arc<dyn SqlDialect>,
    location_info: bool,
    rejection_logged: Arc<AtomicBool>,
    diagnostics: Arc<Diagnostics>,
}

impl fmt::Debug for DbAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbAppender")
            .field("connection_source", &self.current_source())
            .field("dialect", &self.dialect)
            .field("location_info", &self.location_info)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DbAppender {
    /// 创建追加器构建器
    pub fn builder() -> DbAppenderBuilder {
        DbAppenderBuilder::default()
    }

    /// 根据配置创建连接池、按需建表并激活追加器
    pub fn from_config(config: &DbAppenderConfig) -> Result<Self> {
        crate::config::validate_appender_config(config)?;

        let source = PooledConnectionSource::from_config(config)?;
        if config.auto_create_tables {
            let mut conn = source.get_connection()?;
            create_tables(&mut conn)?;
        }

        Self::builder()
            .connection_source(source)
            .location_info(config.location_info)
            .activate_options()
    }

    /// 追加一个事件
    ///
    /// 持久化失败会记录为错误日志并计入诊断，但不会返回给调用方：
    /// 日志写入失败不能打断应用本身。只有对已关闭的追加器调用时返回错误。
    pub fn append(&self, event: &LoggingEvent) -> Result<()> {
        match self.try_append(event) {
            Ok(_) => Ok(()),
            Err(AppenderError::Closed) => Err(AppenderError::Closed),
            Err(e) => {
                error!(
                    category = e.category(),
                    recoverable = e.is_recoverable(),
                    "problem appending event: {}", e
                );
                Ok(())
            }
        }
    }

    /// 追加一个事件并返回生成的事件主键
    ///
    /// 与 [`append`](Self::append) 执行相同的事务，但把错误交给调用方。
    pub fn try_append(&self, event: &LoggingEvent) -> Result<i64> {
        let Some(connection_source) = self.current_source() else {
            self.diagnostics.increment_appends_rejected();
            if !self.rejection_logged.swap(true, Ordering::Relaxed) {
                warn!("Attempted to append to closed appender, further events are dropped");
            }
            return Err(AppenderError::Closed);
        };

        let record = EventRecord::new(event, self.location_info);

        let result = connection_source
            .get_connection()
            .and_then(|mut conn| persist_event(&mut conn, &record, self.dialect.as_ref()));

        match &result {
            Ok(event_id) => {
                debug!(
                    event_id,
                    mask = ?record.mask(),
                    "logging event persisted"
                );
                self.diagnostics.increment_events_appended();
                self.diagnostics
                    .add_property_rows(event.properties.len() as u64);
                self.diagnostics
                    .add_exception_rows(event.throwable.as_ref().map_or(0, Vec::len) as u64);
            }
            Err(_) => self.diagnostics.increment_append_failures(),
        }

        result
    }

    /// 关闭追加器
    ///
    /// 幂等。连接源从所有克隆共享的槽位中取出，
    /// 正在进行的追加结束后连接池即被释放。
    pub fn close(&self) {
        let released = match self.connection_source.write() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if released.is_some() {
            debug!("DbAppender closed, connection source released");
        }
    }

    /// 从连接源取一条连接并立即归还
    pub fn check_connection(&self) -> Result<()> {
        let source = self.current_source().ok_or(AppenderError::Closed)?;
        let _conn = source.get_connection()?;
        Ok(())
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.current_source().is_none()
    }

    fn current_source(&self) -> Option<Arc<dyn ConnectionSource>> {
        match self.connection_source.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 直接写入结构化字段，不需要格式化布局
    pub fn requires_layout(&self) -> bool {
        false
    }

    /// 是否写入调用点位置信息
    pub fn location_info(&self) -> bool {
        self.location_info
    }

    /// 激活时解析的方言
    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    /// 诊断数据快照
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}
