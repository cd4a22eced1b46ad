//! 测试辅助工具模块
//! Test utilities module
//!
//! Mock collaborators that record every lifecycle call into a shared journal,
//! so tests can assert on exact call order across connections.

#![cfg(test)]

use crate::{
    connection::Connection,
    error::{Error, Result},
    protocol::{Protocol, ProtocolId, RequestHandler, Version},
    transport::{InboundHandler, Operation, Transport},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// A single collaborator call observed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnableChannel { connection: String, handler: bool },
    DisableChannel { connection: String },
    VersionQuery { connection: String, offered: Version },
    Init { connection: String },
    Exit { connection: String },
}

impl Call {
    pub fn connection(&self) -> &str {
        match self {
            Call::EnableChannel { connection, .. }
            | Call::DisableChannel { connection }
            | Call::VersionQuery { connection, .. }
            | Call::Init { connection }
            | Call::Exit { connection } => connection,
        }
    }
}

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn calls_for(&self, connection: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.connection() == connection)
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// An in-memory transport with per-connection failure injection.
pub struct MockTransport {
    journal: Journal,
    fail_enable: HashMap<String, Error>,
    fail_disable: HashSet<String>,
    fail_version: HashMap<String, Error>,
    stall_version: HashSet<String>,
    peer_versions: HashMap<String, Version>,
    channels: Mutex<HashMap<String, (Arc<Connection>, Option<Arc<dyn InboundHandler>>)>>,
}

impl MockTransport {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_enable: HashMap::new(),
            fail_disable: HashSet::new(),
            fail_version: HashMap::new(),
            stall_version: HashSet::new(),
            peer_versions: HashMap::new(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing_enable(self, connection: &str) -> Self {
        let error = Error::ChannelEnableFailed(format!("{connection} busy"));
        self.failing_enable_with(connection, error)
    }

    /// Enabling the channel for `connection` fails with `error`.
    pub fn failing_enable_with(mut self, connection: &str, error: Error) -> Self {
        self.fail_enable.insert(connection.to_string(), error);
        self
    }

    pub fn failing_disable(mut self, connection: &str) -> Self {
        self.fail_disable.insert(connection.to_string());
        self
    }

    pub fn failing_version(self, connection: &str) -> Self {
        self.failing_version_with(
            connection,
            Error::VersionNegotiationFailed("malformed response".into()),
        )
    }

    /// The version query for `connection` fails with `error`.
    pub fn failing_version_with(mut self, connection: &str, error: Error) -> Self {
        self.fail_version.insert(connection.to_string(), error);
        self
    }

    /// The peer never answers the version query for `connection`.
    pub fn stalling_version(mut self, connection: &str) -> Self {
        self.stall_version.insert(connection.to_string());
        self
    }

    pub fn with_peer_version(mut self, connection: &str, version: Version) -> Self {
        self.peer_versions.insert(connection.to_string(), version);
        self
    }

    pub fn is_enabled(&self, connection: &str) -> bool {
        self.channels.lock().unwrap().contains_key(connection)
    }

    pub fn has_handler(&self, connection: &str) -> bool {
        self.channels
            .lock()
            .unwrap()
            .get(connection)
            .is_some_and(|(_, handler)| handler.is_some())
    }

    /// Delivers an inbound operation the way a bus transport would.
    pub async fn deliver(&self, connection: &str, operation: Operation) -> Result<()> {
        let (connection, handler) = {
            let channels = self.channels.lock().unwrap();
            let (connection, handler) = channels
                .get(connection)
                .ok_or_else(|| Error::RequestFailed(format!("channel {connection} not enabled")))?;
            (connection.clone(), handler.clone())
        };
        let handler = handler.ok_or(Error::NoHandler)?;
        handler.on_request(&connection, operation).await
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn enable_channel(
        &self,
        connection: &Arc<Connection>,
        handler: Option<Arc<dyn InboundHandler>>,
    ) -> Result<()> {
        let name = connection.name().to_string();
        self.journal.record(Call::EnableChannel {
            connection: name.clone(),
            handler: handler.is_some(),
        });
        if let Some(error) = self.fail_enable.get(&name) {
            return Err(error.clone());
        }
        self.channels
            .lock()
            .unwrap()
            .insert(name, (connection.clone(), handler));
        Ok(())
    }

    async fn disable_channel(&self, connection: &Arc<Connection>) -> Result<()> {
        let name = connection.name().to_string();
        self.journal.record(Call::DisableChannel {
            connection: name.clone(),
        });
        self.channels.lock().unwrap().remove(&name);
        if self.fail_disable.contains(&name) {
            return Err(Error::ChannelDisableFailed(format!("cport {} stuck", connection.cport_id())));
        }
        Ok(())
    }

    async fn send_version_query(
        &self,
        connection: &Arc<Connection>,
        offered: Version,
    ) -> Result<Version> {
        let name = connection.name().to_string();
        self.journal.record(Call::VersionQuery {
            connection: name.clone(),
            offered,
        });
        if self.stall_version.contains(&name) {
            return std::future::pending().await;
        }
        if let Some(error) = self.fail_version.get(&name) {
            return Err(error.clone());
        }
        Ok(self.peer_versions.get(&name).copied().unwrap_or(offered))
    }
}

/// Records every request it receives.
#[derive(Default)]
pub struct RecordingHandler {
    requests: Mutex<Vec<(u8, Bytes)>>,
    fail: bool,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::default(),
            fail: true,
        })
    }

    pub fn requests(&self) -> Vec<(u8, Bytes)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    async fn request_recv(&self, op_type: u8, operation: &Operation) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((op_type, operation.payload.clone()));
        if self.fail {
            return Err(Error::RequestFailed(format!("op type {op_type:#04x} rejected")));
        }
        Ok(())
    }
}

/// A protocol whose callbacks are recorded in the journal.
pub struct MockProtocol {
    id: ProtocolId,
    version: Version,
    journal: Journal,
    handler: Option<Arc<RecordingHandler>>,
    fail_init: bool,
    stall_init: bool,
}

impl MockProtocol {
    pub fn new(id: ProtocolId, version: Version, journal: &Journal) -> Self {
        Self {
            id,
            version,
            journal: journal.clone(),
            handler: None,
            fail_init: false,
            stall_init: false,
        }
    }

    pub fn with_handler(mut self, handler: Arc<RecordingHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn stalling_init(mut self) -> Self {
        self.stall_init = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn Protocol> {
        Arc::new(self)
    }
}

#[async_trait]
impl Protocol for MockProtocol {
    fn id(&self) -> ProtocolId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.handler
            .clone()
            .map(|handler| handler as Arc<dyn RequestHandler>)
    }

    async fn connection_init(&self, connection: &Connection) -> Result<()> {
        self.journal.record(Call::Init {
            connection: connection.name().to_string(),
        });
        if self.stall_init {
            return std::future::pending().await;
        }
        if self.fail_init {
            return Err(Error::ProtocolInitFailed("out of memory".into()));
        }
        Ok(())
    }

    async fn connection_exit(&self, connection: &Connection) {
        self.journal.record(Call::Exit {
            connection: connection.name().to_string(),
        });
    }
}
