#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pg_crud_accessor::prelude::*;

type Responder = dyn Fn(&QueryAndParams) -> Result<ResultSet, SqlAccessorError> + Send + Sync;

#[derive(Default)]
pub struct Log {
    pub connects: usize,
    pub disconnects: usize,
    pub open: usize,
    pub max_open: usize,
    /// Statements in execution order, tagged with the connection that ran them.
    pub statements: Vec<(usize, QueryAndParams)>,
}

/// A `Driver` that records every call and answers statements from a closure.
#[derive(Clone)]
pub struct RecordingDriver {
    pub log: Arc<Mutex<Log>>,
    responder: Arc<Responder>,
    refuse_connections: bool,
    latency: Option<Duration>,
}

impl RecordingDriver {
    pub fn new(
        responder: impl Fn(&QueryAndParams) -> Result<ResultSet, SqlAccessorError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            log: Arc::new(Mutex::new(Log::default())),
            responder: Arc::new(responder),
            refuse_connections: false,
            latency: None,
        }
    }

    pub fn refusing(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn statements(&self) -> Vec<QueryAndParams> {
        self.log
            .lock()
            .unwrap()
            .statements
            .iter()
            .map(|(_, qp)| qp.clone())
            .collect()
    }
}

pub struct RecordingConnection {
    id: usize,
    driver: RecordingDriver,
    released: bool,
}

#[async_trait]
impl Driver for RecordingDriver {
    type Connection = RecordingConnection;

    async fn connect(
        &self,
        _config: &ConnectionConfig,
    ) -> Result<Self::Connection, SqlAccessorError> {
        if self.refuse_connections {
            return Err(SqlAccessorError::ConnectionError("connection refused".into()));
        }
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        log.open += 1;
        log.max_open = log.max_open.max(log.open);
        Ok(RecordingConnection {
            id: log.connects,
            driver: self.clone(),
            released: false,
        })
    }
}

#[async_trait]
impl DriverConnection for RecordingConnection {
    async fn query(&mut self, request: &QueryAndParams) -> Result<ResultSet, SqlAccessorError> {
        if let Some(latency) = self.driver.latency {
            tokio::time::sleep(latency).await;
        }
        self.driver
            .log
            .lock()
            .unwrap()
            .statements
            .push((self.id, request.clone()));
        (self.driver.responder)(request)
    }

    async fn disconnect(&mut self) -> Result<(), SqlAccessorError> {
        assert!(!self.released, "connection {} released twice", self.id);
        self.released = true;
        let mut log = self.driver.log.lock().unwrap();
        log.disconnects += 1;
        log.open -= 1;
        Ok(())
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("tester", "db.invalid", "testing", "")
}

pub fn rows(columns: &[&str], values: Vec<Vec<RowValues>>) -> ResultSet {
    let mut rs = ResultSet::with_capacity(values.len());
    rs.set_column_names(Arc::new(columns.iter().map(|c| (*c).to_string()).collect()));
    for row in values {
        rs.add_row_values(row);
    }
    rs
}

pub fn primary_key_row(table: &str, column: &str) -> ResultSet {
    rows(
        &["table_name", "primary_key_column"],
        vec![vec![
            RowValues::Text(table.into()),
            RowValues::Text(column.into()),
        ]],
    )
}

pub fn is_catalog(qp: &QueryAndParams) -> bool {
    qp.query.contains("information_schema")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
