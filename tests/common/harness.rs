//! tests/common/harness.rs
use async_trait::async_trait;
use bundle_lifecycle::{
    Config, Connection, Error, InboundHandler, Operation, Protocol, ProtocolId, ProtocolRegistry,
    Result, Transport, Version,
    bundle::{BundleManager, BundleOrchestrator},
    protocol::RequestHandler,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "bundle_lifecycle=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

struct PeerRequest {
    operation: Operation,
    reply: oneshot::Sender<Result<()>>,
}

/// A transport whose peer lives in-process. Every enabled channel with a
/// handler gets its own delivery task; each request is handled on a task of
/// its own, so requests on one connection may run concurrently.
#[derive(Default)]
pub struct LoopbackTransport {
    peer_versions: HashMap<ProtocolId, Version>,
    channels: Mutex<HashMap<u16, Option<mpsc::Sender<PeerRequest>>>>,
    pub enables: AtomicUsize,
    pub disables: AtomicUsize,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The peer answers version queries for `id` with `version`.
    pub fn with_peer_version(mut self, id: ProtocolId, version: Version) -> Self {
        self.peer_versions.insert(id, version);
        self
    }

    pub fn enabled_channels(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    /// Sends a request from the peer on `cport_id` and waits for the result.
    pub async fn send_request(&self, cport_id: u16, operation: Operation) -> Result<()> {
        let sender = self
            .channels
            .lock()
            .unwrap()
            .get(&cport_id)
            .cloned()
            .ok_or_else(|| Error::RequestFailed(format!("cport {cport_id} not enabled")))?
            .ok_or(Error::NoHandler)?;

        let (reply, response) = oneshot::channel();
        sender
            .send(PeerRequest { operation, reply })
            .await
            .map_err(|_| Error::RequestFailed("channel closed".into()))?;
        response
            .await
            .map_err(|_| Error::RequestFailed("request dropped".into()))?
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn enable_channel(
        &self,
        connection: &Arc<Connection>,
        handler: Option<Arc<dyn InboundHandler>>,
    ) -> Result<()> {
        self.enables.fetch_add(1, Ordering::SeqCst);
        let sender = handler.map(|handler| {
            let (tx, mut rx) = mpsc::channel::<PeerRequest>(64);
            let connection = connection.clone();
            tokio::spawn(async move {
                while let Some(request) = rx.recv().await {
                    let connection = connection.clone();
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let result = handler.on_request(&connection, request.operation).await;
                        let _ = request.reply.send(result);
                    });
                }
            });
            tx
        });
        self.channels
            .lock()
            .unwrap()
            .insert(connection.cport_id(), sender);
        Ok(())
    }

    async fn disable_channel(&self, connection: &Arc<Connection>) -> Result<()> {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.channels.lock().unwrap().remove(&connection.cport_id());
        Ok(())
    }

    async fn send_version_query(
        &self,
        connection: &Arc<Connection>,
        offered: Version,
    ) -> Result<Version> {
        Ok(self
            .peer_versions
            .get(&connection.request().id)
            .copied()
            .unwrap_or(offered))
    }
}

/// Counts requests; safe to call concurrently.
#[derive(Default)]
pub struct CountingHandler {
    pub requests: AtomicUsize,
    pub bytes: AtomicUsize,
}

#[async_trait]
impl RequestHandler for CountingHandler {
    async fn request_recv(&self, _op_type: u8, operation: &Operation) -> Result<()> {
        tokio::task::yield_now().await;
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(operation.payload.len(), Ordering::SeqCst);
        Ok(())
    }
}

/// A protocol that tracks how many connections it has set up.
pub struct TestProtocol {
    id: ProtocolId,
    version: Version,
    handler: Option<Arc<CountingHandler>>,
    pub live: AtomicUsize,
}

impl TestProtocol {
    pub fn new(id: ProtocolId, version: Version) -> Arc<Self> {
        Arc::new(Self {
            id,
            version,
            handler: None,
            live: AtomicUsize::new(0),
        })
    }

    pub fn with_handler(id: ProtocolId, version: Version, handler: Arc<CountingHandler>) -> Arc<Self> {
        Arc::new(Self {
            id,
            version,
            handler: Some(handler),
            live: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Protocol for TestProtocol {
    fn id(&self) -> ProtocolId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.handler
            .clone()
            .map(|handler| handler as Arc<dyn RequestHandler>)
    }

    async fn connection_init(&self, _connection: &Connection) -> Result<()> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connection_exit(&self, _connection: &Connection) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builds a bundle manager over `transport` with the default configuration.
pub fn manager(
    transport: Arc<LoopbackTransport>,
    registry: Arc<ProtocolRegistry>,
) -> BundleManager<LoopbackTransport> {
    init_tracing();
    BundleManager::new(BundleOrchestrator::from_config(
        transport,
        registry,
        &Config::default(),
    ))
}
