//! Traits for abstracting over the bus transport that carries connection traffic.
//!
//! 用于抽象承载连接流量的总线传输层的 trait。

use crate::{connection::Connection, error::Result, protocol::Version};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// An inbound operation delivered by the transport.
/// 由传输层投递的入站操作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Transport-assigned operation id, used to match a response.
    pub id: u16,
    /// Protocol-specific operation type.
    pub op_type: u8,
    pub payload: Bytes,
}

impl Operation {
    pub fn new(id: u16, op_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            op_type,
            payload: payload.into(),
        }
    }
}

/// The callback a transport invokes for every inbound request on a channel
/// that was enabled with a handler.
///
/// 传输层在启用了处理器的通道上，为每个入站请求调用的回调。
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    async fn on_request(&self, connection: &Connection, operation: Operation) -> Result<()>;
}

/// The bus transport interface used during connection bring-up and teardown.
///
/// This trait allows for abstracting over the underlying bus implementation,
/// enabling custom transports for testing or other purposes. Calls that talk to
/// the peer may take arbitrarily long; the activator bounds them with the
/// configured timeouts.
///
/// 连接启动和拆除期间使用的总线传输接口。
///
/// 此trait允许对底层总线实现进行抽象，从而可以为测试或其他目的自定义传输实现。
///
/// A failing `enable_channel` is reported to the caller as
/// [`Error::ChannelEnableFailed`](crate::error::Error::ChannelEnableFailed) and a failing
/// `send_version_query` as
/// [`Error::VersionNegotiationFailed`](crate::error::Error::VersionNegotiationFailed).
/// Errors of those kinds pass through untouched; any other error is converted,
/// keeping its message.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Activates the channel for `connection`. When `handler` is `Some`, inbound
    /// requests on the channel are delivered to it.
    /// 激活连接的通道。当 `handler` 为 `Some` 时，通道上的入站请求将投递给它。
    async fn enable_channel(
        &self,
        connection: &Arc<Connection>,
        handler: Option<Arc<dyn InboundHandler>>,
    ) -> Result<()>;

    /// Deactivates the channel and drops any registered handler.
    /// 停用通道并丢弃任何已注册的处理器。
    async fn disable_channel(&self, connection: &Arc<Connection>) -> Result<()>;

    /// Offers `offered` to the peer and returns the version the peer answers with.
    /// 向对端提供 `offered` 版本，并返回对端应答的版本。
    async fn send_version_query(
        &self,
        connection: &Arc<Connection>,
        offered: Version,
    ) -> Result<Version>;
}
