//! 协议描述符、版本以及协议注册表。
//! Protocol descriptors, versions and the protocol registry.
//!
//! 连接通过 `(protocol_id, major, minor)` 请求一个协议实现。注册表负责将该请求
//! 解析为具体的 [`Protocol`]，并以引用计数的方式借出。
//!
//! A connection asks for a protocol implementation by `(protocol_id, major, minor)`.
//! The registry resolves that request to a concrete [`Protocol`] and lends it out
//! as a reference-counted checkout.

mod handle;
mod registry;

pub use handle::ProtocolHandle;
pub use registry::ProtocolRegistry;

use crate::{connection::Connection, error::Result, transport::Operation};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

/// Numeric protocol identifier.
/// 数字协议标识符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(pub u8);

impl ProtocolId {
    pub const CONTROL: Self = Self(0x00);
    pub const GPIO: Self = Self(0x02);
    pub const I2C: Self = Self(0x03);
    pub const UART: Self = Self(0x04);
    pub const HID: Self = Self(0x05);
    pub const PWM: Self = Self(0x09);
    pub const SPI: Self = Self(0x0b);
    pub const LOOPBACK: Self = Self(0x11);
    pub const RAW: Self = Self(0xfe);
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// A `major.minor` protocol version.
/// `major.minor` 形式的协议版本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The protocol a connection asks to be bound to.
/// 连接请求绑定的协议。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolRequest {
    pub id: ProtocolId,
    pub major: u8,
    pub minor: u8,
}

impl ProtocolRequest {
    pub const fn new(id: ProtocolId, major: u8, minor: u8) -> Self {
        Self { id, major, minor }
    }

    pub fn version(&self) -> Version {
        Version::new(self.major, self.minor)
    }

    /// Whether a protocol with the given id and version can serve this request.
    ///
    /// The id and major must be equal; the protocol must implement at least the
    /// requested minor revision.
    ///
    /// 给定ID和版本的协议是否可以服务此请求。ID和主版本号必须相等，
    /// 协议实现的次版本号不得低于请求的次版本号。
    pub fn is_served_by(&self, id: ProtocolId, version: Version) -> bool {
        self.id == id && self.major == version.major && self.minor <= version.minor
    }
}

impl fmt::Display for ProtocolRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} version {}.{}", self.id, self.major, self.minor)
    }
}

/// A protocol implementation that can be bound to connections.
///
/// A protocol supports every request with its id and major version whose minor
/// revision does not exceed [`Protocol::version`]'s minor.
///
/// 可以绑定到连接的协议实现。
///
/// 协议支持所有ID和主版本号与之相同、且次版本号不超过 [`Protocol::version`]
/// 次版本号的请求。
#[async_trait]
pub trait Protocol: Send + Sync + 'static {
    /// The protocol identifier.
    /// 协议标识符。
    fn id(&self) -> ProtocolId;

    /// The newest version this implementation speaks.
    /// 此实现支持的最新版本。
    fn version(&self) -> Version;

    /// A short name used in diagnostics.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// The handler for inbound requests, if this protocol accepts any.
    ///
    /// Read once when the channel is enabled. Protocols that return `None` never
    /// get a handler registered with the transport.
    ///
    /// 入站请求的处理器（如果该协议接受入站请求）。在启用通道时只读取一次。
    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        None
    }

    /// Protocol-specific setup, run once the peer version is known.
    /// 协议特定的初始化，在得知对端版本后运行。
    async fn connection_init(&self, connection: &Connection) -> Result<()>;

    /// Protocol-specific cleanup. Best effort; failures are not reported.
    /// 协议特定的清理。尽力而为，不报告失败。
    async fn connection_exit(&self, connection: &Connection);
}

/// Receives inbound requests for a protocol.
///
/// Implementations must be reentrant: the transport may deliver several
/// requests for the same connection concurrently.
///
/// 接收协议的入站请求。实现必须是可重入的。
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn request_recv(&self, op_type: u8, operation: &Operation) -> Result<()>;
}
