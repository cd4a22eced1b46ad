//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::{
    bundle::{BundleClass, BundleId},
    connection::ConnectionState,
    protocol::ProtocolId,
};
use thiserror::Error;

/// The primary error type for the bundle lifecycle library.
/// 连接生命周期库的主要错误类型。
///
/// The error of a failed bring-up step is returned to the caller unchanged,
/// after rollback has run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No registered protocol matches the requested id and version.
    /// 没有已注册的协议与请求的ID和版本匹配。
    #[error("protocol {id} version {major}.{minor} not found")]
    ProtocolNotSupported { id: ProtocolId, major: u8, minor: u8 },

    /// The transport refused to activate the channel.
    /// 传输层拒绝激活通道。
    #[error("failed to enable channel: {0}")]
    ChannelEnableFailed(String),

    /// The transport failed while deactivating the channel.
    /// 传输层在停用通道时失败。
    #[error("failed to disable channel: {0}")]
    ChannelDisableFailed(String),

    /// The version exchange with the peer failed, timed out, or returned an
    /// unsupported version.
    /// 与对端的版本交换失败、超时或返回了不受支持的版本。
    #[error("failed to get protocol version: {0}")]
    VersionNegotiationFailed(String),

    /// The protocol-specific setup callback failed or timed out.
    /// 协议特定的初始化回调失败或超时。
    #[error("protocol connection init failed: {0}")]
    ProtocolInitFailed(String),

    /// An inbound request reached a connection without a registered handler.
    /// 入站请求到达了一个没有注册处理器的连接。
    #[error("no request handler registered for connection")]
    NoHandler,

    /// The connection has no bound protocol.
    /// 连接没有绑定协议。
    #[error("connection has no bound protocol")]
    NotBound,

    /// The connection is not in a state that accepts inbound requests.
    /// 连接不处于可以接受入站请求的状态。
    #[error("connection not ready for requests (state {state})")]
    NotReady { state: ConnectionState },

    /// A lifecycle state change was attempted out of order.
    /// 尝试了无序的生命周期状态转换。
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The bundle's class is not in the driver's id table.
    /// 捆绑包的类别不在驱动程序的ID表中。
    #[error("bundle class {0} is not claimed by this driver")]
    ClassNotClaimed(BundleClass),

    /// A protocol with the same id and version is already registered.
    #[error("protocol {id} version {major}.{minor} is already registered")]
    ProtocolAlreadyRegistered { id: ProtocolId, major: u8, minor: u8 },

    /// The protocol still has outstanding checkouts and cannot be removed.
    #[error("protocol {id} version {major}.{minor} is still in use ({checkouts} checkouts)")]
    ProtocolInUse {
        id: ProtocolId,
        major: u8,
        minor: u8,
        checkouts: usize,
    },

    /// A bundle with this id is already attached.
    #[error("bundle {0} is already attached")]
    BundleAlreadyAttached(BundleId),

    /// No bundle with this id is attached.
    #[error("bundle {0} is not attached")]
    BundleNotAttached(BundleId),

    /// A protocol request handler reported a failure.
    /// 协议请求处理器报告了失败。
    #[error("request handler failed: {0}")]
    RequestFailed(String),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error was raised by a bring-up step that rolls the
    /// connection back before returning.
    ///
    /// 此错误是否由在返回前回滚连接的启动步骤引发。
    pub fn is_bring_up_failure(&self) -> bool {
        matches!(
            self,
            Error::ProtocolNotSupported { .. }
                | Error::ChannelEnableFailed(_)
                | Error::VersionNegotiationFailed(_)
                | Error::ProtocolInitFailed(_)
        )
    }
}
