//! 连接激活器 - 驱动单个连接完成启动和拆除
//! Connection Activator - Drives a single connection through bring-up and teardown
//!
//! 启动顺序为：绑定协议、启用通道、协商版本、协议初始化。任何一步失败时，
//! 激活器只回滚该连接已经完成的步骤，然后原样返回错误。兄弟连接的回滚由
//! 捆绑包编排器负责。
//!
//! Bring-up runs bind, enable channel, negotiate version, protocol init. When a
//! step fails the activator unwinds only the steps this connection already
//! completed, then returns the error unchanged. Rolling back sibling connections
//! is the bundle orchestrator's job.

use super::{
    Connection, ConnectionBinder, ConnectionState, EventEmitter, EventListener, LifecycleEvent,
};
use crate::{
    config::TimingConfig,
    dispatcher::RequestDispatcher,
    error::{Error, Result},
    protocol::ProtocolRegistry,
    transport::{InboundHandler, Transport},
};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Drives connections through the per-connection state machine.
///
/// 驱动连接完成每个连接的状态机。
pub struct ConnectionActivator<T: Transport> {
    transport: Arc<T>,
    binder: ConnectionBinder,
    dispatcher: Arc<RequestDispatcher>,
    timing: TimingConfig,
    events: EventEmitter,
}

impl<T: Transport> std::fmt::Debug for ConnectionActivator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionActivator")
            .field("binder", &self.binder)
            .field("timing", &self.timing)
            .field("events", &self.events)
            .finish()
    }
}

impl<T: Transport> ConnectionActivator<T> {
    pub fn new(transport: Arc<T>, registry: Arc<ProtocolRegistry>, timing: TimingConfig) -> Self {
        Self {
            transport,
            binder: ConnectionBinder::new(registry),
            dispatcher: Arc::new(RequestDispatcher),
            timing,
            events: EventEmitter::default(),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn binder(&self) -> &ConnectionBinder {
        &self.binder
    }

    /// 注册事件监听器
    /// Register event listener
    pub fn register_event_listener(&mut self, listener: EventListener) {
        self.events.register(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&mut self) {
        self.events.clear();
    }

    /// Brings `connection` from `Unbound` to `Initialized`.
    ///
    /// On failure the connection is back in `Unbound` with its checkout returned,
    /// and the error of the failing step is returned as is.
    ///
    /// 将连接从 `Unbound` 启动到 `Initialized`。失败时连接回到 `Unbound`，
    /// 借出已归还，并原样返回失败步骤的错误。
    pub async fn bring_up(&self, connection: &Arc<Connection>) -> Result<()> {
        debug!(connection = connection.name(), "Enabling connection");

        if let Err(e) = self.bind(connection) {
            return Err(self.failed(connection, e));
        }

        if let Err(e) = self.enable(connection).await {
            self.unbind(connection);
            return Err(self.failed(connection, e));
        }

        let result = match self.negotiate_version(connection).await {
            Ok(()) => self.initialize(connection).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(disable_err) = self.disable(connection).await {
                warn!(
                    connection = connection.name(),
                    error = %disable_err,
                    "Channel disable failed during rollback"
                );
            }
            self.unbind(connection);
            return Err(self.failed(connection, e));
        }

        debug!(connection = connection.name(), "Connection initialized");
        Ok(())
    }

    /// Returns `connection` to `Unbound`: disable the channel, let the protocol
    /// clean up, then unbind. A connection without a bound protocol is left
    /// alone, so calling this twice is harmless.
    ///
    /// Every step runs even if the channel disable fails; that failure is
    /// returned afterwards.
    ///
    /// 将连接恢复到 `Unbound`：停用通道、让协议清理、然后解绑。
    /// 未绑定协议的连接不做处理，因此重复调用是无害的。
    pub async fn tear_down(&self, connection: &Arc<Connection>) -> Result<()> {
        let Some(protocol) = connection.protocol() else {
            debug!(connection = connection.name(), "Connection not bound, nothing to tear down");
            return Ok(());
        };

        debug!(connection = connection.name(), state = %connection.state(), "Tearing down connection");
        let disabled = self.disable(connection).await;

        protocol.connection_exit(connection).await;

        self.unbind(connection);
        disabled
    }

    fn bind(&self, connection: &Connection) -> Result<()> {
        self.binder.bind(connection)?;
        self.events
            .transition(connection.name(), ConnectionState::Unbound, ConnectionState::Bound);
        self.events.emit(LifecycleEvent::Bound {
            connection: connection.name().to_string(),
        });
        Ok(())
    }

    fn unbind(&self, connection: &Connection) {
        let previous = connection.state();
        if self.binder.unbind(connection) {
            self.events
                .transition(connection.name(), previous, ConnectionState::Unbound);
            self.events.emit(LifecycleEvent::Unbound {
                connection: connection.name().to_string(),
            });
        }
    }

    async fn enable(&self, connection: &Arc<Connection>) -> Result<()> {
        let protocol = connection.protocol().ok_or(Error::NotBound)?;
        let handler = protocol.request_handler();
        let inbound = handler
            .as_ref()
            .map(|_| self.dispatcher.clone() as Arc<dyn InboundHandler>);
        let handler_registered = inbound.is_some();

        self.transport
            .enable_channel(connection, inbound)
            .await
            .map_err(|e| match e {
                Error::ChannelEnableFailed(_) => e,
                other => Error::ChannelEnableFailed(other.to_string()),
            })?;

        let previous = match connection.mark_enabled(handler) {
            Ok(previous) => previous,
            Err(e) => {
                if let Err(disable_err) = self.transport.disable_channel(connection).await {
                    warn!(
                        connection = connection.name(),
                        error = %disable_err,
                        "Channel disable failed after enable was rejected"
                    );
                }
                return Err(e);
            }
        };
        self.events
            .transition(connection.name(), previous, ConnectionState::Enabled);
        self.events.emit(LifecycleEvent::ChannelEnabled {
            connection: connection.name().to_string(),
            handler_registered,
        });
        debug!(connection = connection.name(), handler_registered, "Channel enabled");
        Ok(())
    }

    /// Disables the channel if it is active. The connection is recorded as
    /// disabled even when the transport reports a failure.
    async fn disable(&self, connection: &Arc<Connection>) -> Result<()> {
        if !connection.is_channel_enabled() {
            return Ok(());
        }

        let result = self.transport.disable_channel(connection).await;
        let previous = connection.mark_disabled();
        self.events
            .transition(connection.name(), previous, ConnectionState::Bound);
        self.events.emit(LifecycleEvent::ChannelDisabled {
            connection: connection.name().to_string(),
        });
        debug!(connection = connection.name(), "Channel disabled");
        result
    }

    async fn negotiate_version(&self, connection: &Arc<Connection>) -> Result<()> {
        let offered = connection.protocol().ok_or(Error::NotBound)?.version();

        let peer = match timeout(
            self.timing.version_query_timeout,
            self.transport.send_version_query(connection, offered),
        )
        .await
        {
            Ok(Ok(peer)) => peer,
            Ok(Err(e)) => {
                error!(
                    connection = connection.name(),
                    error = %e,
                    "failed to get protocol version"
                );
                return Err(match e {
                    Error::VersionNegotiationFailed(_) => e,
                    other => Error::VersionNegotiationFailed(other.to_string()),
                });
            }
            Err(_) => {
                error!(
                    connection = connection.name(),
                    timeout = ?self.timing.version_query_timeout,
                    "failed to get protocol version: timed out"
                );
                return Err(Error::VersionNegotiationFailed(format!(
                    "no response within {:?}",
                    self.timing.version_query_timeout
                )));
            }
        };

        if peer.major > offered.major {
            error!(
                connection = connection.name(),
                %peer,
                %offered,
                "unsupported major version"
            );
            return Err(Error::VersionNegotiationFailed(format!(
                "unsupported major version {peer} (offered {offered})"
            )));
        }

        let previous = connection.record_peer_version(peer)?;
        self.events
            .transition(connection.name(), previous, ConnectionState::VersionNegotiated);
        self.events.emit(LifecycleEvent::VersionNegotiated {
            connection: connection.name().to_string(),
            peer,
        });
        debug!(connection = connection.name(), %peer, "Protocol version negotiated");
        Ok(())
    }

    async fn initialize(&self, connection: &Arc<Connection>) -> Result<()> {
        let protocol = connection.protocol().ok_or(Error::NotBound)?;

        match timeout(
            self.timing.connection_init_timeout,
            protocol.connection_init(connection),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                // The init future was dropped part way; let the protocol release
                // whatever it had already set up before the channel goes away.
                warn!(
                    connection = connection.name(),
                    timeout = ?self.timing.connection_init_timeout,
                    "Protocol init timed out"
                );
                protocol.connection_exit(connection).await;
                return Err(Error::ProtocolInitFailed(format!(
                    "{} did not finish within {:?}",
                    protocol.name(),
                    self.timing.connection_init_timeout
                )));
            }
        }

        let previous = connection.mark_initialized()?;
        self.events
            .transition(connection.name(), previous, ConnectionState::Initialized);
        self.events.emit(LifecycleEvent::Initialized {
            connection: connection.name().to_string(),
        });
        Ok(())
    }

    fn failed(&self, connection: &Connection, error: Error) -> Error {
        self.events.emit(LifecycleEvent::BringUpFailed {
            connection: connection.name().to_string(),
            error: error.clone(),
        });
        error
    }
}
