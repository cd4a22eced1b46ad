//! 连接实体及其生命周期管理
//! Connection entity and its lifecycle management
//!
//! 一个连接是总线上的一条逻辑点对点通道。该模块定义连接本身、它的状态机、
//! 协议绑定器以及驱动单个连接完成启动和拆除的激活器。
//!
//! A connection is one logical point-to-point channel on the bus. This module
//! defines the connection itself, its state machine, the protocol binder, and
//! the activator that drives a single connection through bring-up and teardown.

mod activator;
mod binder;
mod events;
mod state;

pub use activator::ConnectionActivator;
pub use binder::ConnectionBinder;
pub use events::{EventEmitter, EventListener, LifecycleEvent};
pub use state::{ConnectionState, StateValidator};

use crate::{
    error::{Error, Result},
    protocol::{Protocol, ProtocolHandle, ProtocolRequest, RequestHandler, Version},
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

/// Mutable lifecycle data of a connection. The protocol is present exactly when
/// the state is at or beyond `Bound`.
#[derive(Default)]
struct Binding {
    state: ConnectionState,
    protocol: Option<ProtocolHandle>,
    handler: Option<Arc<dyn RequestHandler>>,
    peer_version: Option<Version>,
}

/// A logical channel to a remote peripheral.
///
/// 通往远程外设的逻辑通道。
///
/// The bound protocol and request handler only change during bring-up and
/// teardown, which the owning bundle runs sequentially. Readers such as the
/// request dispatcher take a short read lock and clone what they need.
pub struct Connection {
    name: String,
    cport_id: u16,
    request: ProtocolRequest,
    binding: RwLock<Binding>,
}

impl Connection {
    /// Creates an unbound connection asking for `request`.
    /// 创建一个请求 `request` 协议的未绑定连接。
    pub fn new(name: impl Into<String>, cport_id: u16, request: ProtocolRequest) -> Self {
        Self {
            name: name.into(),
            cport_id,
            request,
            binding: RwLock::new(Binding::default()),
        }
    }

    /// Stable name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cport_id(&self) -> u16 {
        self.cport_id
    }

    /// The protocol id and version this connection asks for.
    /// 此连接请求的协议ID和版本。
    pub fn request(&self) -> ProtocolRequest {
        self.request
    }

    pub fn state(&self) -> ConnectionState {
        self.read().state
    }

    pub fn is_bound(&self) -> bool {
        self.read().protocol.is_some()
    }

    pub fn is_channel_enabled(&self) -> bool {
        StateValidator::is_channel_enabled(self.state())
    }

    /// The bound protocol, if any.
    /// 已绑定的协议（如果有）。
    pub fn protocol(&self) -> Option<Arc<dyn Protocol>> {
        self.read().protocol.as_ref().map(|h| h.protocol().clone())
    }

    /// The request handler captured when the channel was enabled.
    /// 启用通道时捕获的请求处理器。
    pub fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.read().handler.clone()
    }

    /// The version the peer reported during negotiation.
    /// 对端在协商期间报告的版本。
    pub fn peer_version(&self) -> Option<Version> {
        self.read().peer_version
    }

    /// State, bound flag and handler read under a single lock.
    pub(crate) fn dispatch_target(
        &self,
    ) -> (ConnectionState, bool, Option<Arc<dyn RequestHandler>>) {
        let binding = self.read();
        (
            binding.state,
            binding.protocol.is_some(),
            binding.handler.clone(),
        )
    }

    /// Attaches a checked-out protocol. On failure the handle is dropped, which
    /// returns the checkout.
    pub(crate) fn attach(&self, handle: ProtocolHandle) -> Result<ConnectionState> {
        let mut binding = self.write();
        let previous = self.advance(&mut binding, ConnectionState::Bound)?;
        binding.protocol = Some(handle);
        Ok(previous)
    }

    /// Detaches the bound protocol, returning the connection to `Unbound`.
    pub(crate) fn detach(&self) -> Option<(ProtocolHandle, ConnectionState)> {
        let mut binding = self.write();
        let handle = binding.protocol.take()?;
        let previous = binding.state;
        binding.handler = None;
        binding.peer_version = None;
        binding.state = ConnectionState::Unbound;
        trace!(connection = %self.name, from = %previous, to = "Unbound", "State transition");
        Some((handle, previous))
    }

    pub(crate) fn mark_enabled(
        &self,
        handler: Option<Arc<dyn RequestHandler>>,
    ) -> Result<ConnectionState> {
        let mut binding = self.write();
        let previous = self.advance(&mut binding, ConnectionState::Enabled)?;
        binding.handler = handler;
        Ok(previous)
    }

    /// Records the channel as inactive. The protocol stays bound.
    pub(crate) fn mark_disabled(&self) -> ConnectionState {
        let mut binding = self.write();
        let previous = binding.state;
        if StateValidator::is_channel_enabled(previous) {
            binding.handler = None;
            binding.state = ConnectionState::Bound;
            trace!(connection = %self.name, from = %previous, to = "Bound", "State transition");
        }
        previous
    }

    pub(crate) fn record_peer_version(&self, version: Version) -> Result<ConnectionState> {
        let mut binding = self.write();
        let previous = self.advance(&mut binding, ConnectionState::VersionNegotiated)?;
        binding.peer_version = Some(version);
        Ok(previous)
    }

    pub(crate) fn mark_initialized(&self) -> Result<ConnectionState> {
        let mut binding = self.write();
        self.advance(&mut binding, ConnectionState::Initialized)
    }

    fn advance(&self, binding: &mut Binding, next: ConnectionState) -> Result<ConnectionState> {
        let previous = binding.state;
        if !StateValidator::is_valid_transition(previous, next) {
            return Err(Error::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        binding.state = next;
        trace!(connection = %self.name, from = %previous, to = %next, "State transition");
        Ok(previous)
    }

    fn read(&self) -> RwLockReadGuard<'_, Binding> {
        self.binding.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Binding> {
        self.binding.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let binding = self.read();
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("cport_id", &self.cport_id)
            .field("request", &self.request)
            .field("state", &binding.state)
            .field("protocol", &binding.protocol)
            .field("handler_registered", &binding.handler.is_some())
            .field("peer_version", &binding.peer_version)
            .finish()
    }
}
