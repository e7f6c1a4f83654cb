//! tracing 层与异步 Sink 集成测试

#![cfg(feature = "sqlite")]

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tempfile::tempdir;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use quantum_log_db::config::DbAppenderConfig;
use quantum_log_db::error::AppenderError;
use quantum_log_db::sinks::database::schema::{
    logging_event, logging_event_exception, logging_event_property,
};
use quantum_log_db::sinks::traits::{QuantumSink, SinkType};
use quantum_log_db::{DbAppender, DbAppenderLayer, LoggingEvent};

#[derive(Debug, thiserror::Error)]
#[error("request failed")]
struct RequestError {
    #[source]
    source: std::io::Error,
}

fn sqlite_appender(path: &str, location_info: bool) -> DbAppender {
    let mut config = DbAppenderConfig::sqlite(path);
    config.auto_create_tables = true;
    config.location_info = location_info;
    DbAppender::from_config(&config).unwrap()
}

#[test]
fn test_layer_persists_tracing_events() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.db").to_string_lossy().into_owned();
    let appender = sqlite_appender(&path, true);

    let subscriber = Registry::default().with(DbAppenderLayer::new(appender.clone()));
    tracing::subscriber::with_default(subscriber, || {
        let request = tracing::info_span!("request");
        let _request = request.enter();
        let handler = tracing::info_span!("handler");
        let _handler = handler.enter();

        tracing::info!(user = "alice", "served");
    });

    let mut conn = SqliteConnection::establish(&path).unwrap();
    let rows: Vec<(String, String, Option<String>, Option<i16>, String, String)> =
        logging_event::table
            .select((
                logging_event::rendered_message,
                logging_event::level_string,
                logging_event::ndc,
                logging_event::reference_flag,
                logging_event::caller_filename,
                logging_event::caller_method,
            ))
            .load(&mut conn)
            .unwrap();

    // 追加器自身发出的调试日志不会被写回数据库
    assert_eq!(rows.len(), 1);
    let (message, level, ndc, flag, file, method) = &rows[0];
    assert_eq!(message, "served");
    assert_eq!(level, "INFO");
    assert_eq!(ndc.as_deref(), Some("request handler"));
    assert_eq!(*flag, Some(0x01 | 0x04));
    assert!(file.ends_with("tracing_layer.rs"));
    assert_eq!(method, "?");

    let properties: Vec<(String, Option<String>)> = logging_event_property::table
        .select((
            logging_event_property::mapped_key,
            logging_event_property::mapped_value,
        ))
        .load(&mut conn)
        .unwrap();
    assert_eq!(properties, vec![("user".to_string(), Some("alice".to_string()))]);
}

#[test]
fn test_layer_expands_error_sources() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("errors.db").to_string_lossy().into_owned();
    let appender = sqlite_appender(&path, false);

    let subscriber = Registry::default().with(DbAppenderLayer::new(appender));
    tracing::subscriber::with_default(subscriber, || {
        let err = RequestError {
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"),
        };
        tracing::error!(error = &err as &dyn std::error::Error, "request aborted");
    });

    let mut conn = SqliteConnection::establish(&path).unwrap();
    let lines: Vec<String> = logging_event_exception::table
        .select(logging_event_exception::trace_line)
        .order(logging_event_exception::i)
        .load(&mut conn)
        .unwrap();
    assert_eq!(lines, vec!["request failed", "Caused by: broken pipe"]);

    let (message, ndc): (String, Option<String>) = logging_event::table
        .select((logging_event::rendered_message, logging_event::ndc))
        .first(&mut conn)
        .unwrap();
    assert_eq!(message, "request aborted");
    assert!(ndc.is_none());
}

#[tokio::test]
async fn test_async_sink_lifecycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sink.db").to_string_lossy().into_owned();
    let appender = sqlite_appender(&path, false);

    assert!(appender.is_healthy().await);
    assert!(!QuantumSink::requires_layout(&appender));
    assert_eq!(appender.metadata().sink_type, SinkType::Exclusive);

    appender
        .send_event(LoggingEvent::new("root", "INFO", "from async").with_property("k", "v"))
        .await
        .unwrap();
    assert_eq!(appender.diagnostics().events_appended, 1);

    appender.shutdown().await.unwrap();
    assert!(!appender.is_healthy().await);
    assert!(!appender.metadata().enabled);

    let result = appender
        .send_event(LoggingEvent::new("root", "INFO", "too late"))
        .await;
    assert!(matches!(result, Err(AppenderError::Closed)));

    let mut conn = SqliteConnection::establish(&path).unwrap();
    let count: i64 = logging_event::table.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 1);
}
