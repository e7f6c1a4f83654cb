//! 数据库追加器的异步 Sink 接口
//!
//! 追加是阻塞的数据库操作，在 tokio 的阻塞线程池中执行。

use async_trait::async_trait;
use tracing::error;

use crate::config::DbAppenderConfig;
use crate::core::event::LoggingEvent;
use crate::error::AppenderError;
use crate::sinks::database::DbAppender;
use crate::sinks::traits::{ExclusiveSink, QuantumSink, SinkMetadata, SinkType};

#[async_trait]
impl QuantumSink for DbAppender {
    type Config = DbAppenderConfig;
    type Error = AppenderError;

    async fn send_event(&self, event: LoggingEvent) -> Result<(), Self::Error> {
        let appender = self.clone();

        tokio::task::spawn_blocking(move || appender.append(&event))
            .await
            .map_err(|e| {
                let error_msg = format!("数据库追加任务执行失败: {}", e);
                error!("{}", error_msg);
                AppenderError::BackgroundTaskError(error_msg)
            })?
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.close();
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        let appender = self.clone();
        matches!(
            tokio::task::spawn_blocking(move || appender.check_connection()).await,
            Ok(Ok(()))
        )
    }

    fn name(&self) -> &'static str {
        "database"
    }

    fn requires_layout(&self) -> bool {
        DbAppender::requires_layout(self)
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::new(self.name().to_string(), SinkType::Exclusive)
            .with_enabled(!self.is_closed())
            .with_description(format!("Relational appender ({:?})", self.dialect()))
    }
}

impl ExclusiveSink for DbAppender {}
