//! Defines the per-connection lifecycle state machine.
//!
//! 定义每个连接的生命周期状态机。

use std::fmt;

/// The lifecycle state of a connection.
/// 连接的生命周期状态。
///
/// States are ordered along the bring-up path, so `state >= Bound` reads as
/// "at or beyond bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ConnectionState {
    /// No protocol is bound.
    /// 没有绑定协议。
    #[default]
    Unbound,
    /// A protocol is checked out and attached, the channel is inactive.
    /// 协议已借出并附加，通道未激活。
    Bound,
    /// The transport channel is active.
    /// 传输通道已激活。
    Enabled,
    /// The peer's protocol version is known.
    /// 已知对端的协议版本。
    VersionNegotiated,
    /// The protocol finished its own setup; the connection is operating.
    /// 协议已完成其自身的初始化，连接正在运行。
    Initialized,
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Unbound => "Unbound",
            ConnectionState::Bound => "Bound",
            ConnectionState::Enabled => "Enabled",
            ConnectionState::VersionNegotiated => "VersionNegotiated",
            ConnectionState::Initialized => "Initialized",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 状态验证器，负责所有状态相关的验证和检查逻辑
/// State validator responsible for all state-related validation and check logic
pub struct StateValidator;

impl StateValidator {
    /// 验证状态转换是否合法
    /// Validate if state transition is legal
    pub fn is_valid_transition(current: ConnectionState, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (current, next) {
            // 任何状态都可以拆除回Unbound
            // Any state can be torn down to Unbound
            (_, Unbound) => true,

            // 启动路径，每次前进一步
            // Bring-up path, one step at a time
            (Unbound, Bound) => true,
            (Bound, Enabled) => true,
            (Enabled, VersionNegotiated) => true,
            (VersionNegotiated, Initialized) => true,

            // 停用通道后协议仍然绑定
            // Disabling the channel leaves the protocol bound
            (Enabled | VersionNegotiated | Initialized, Bound) => true,

            _ => false,
        }
    }

    /// 检查是否绑定了协议
    /// Check if a protocol is bound
    pub fn is_bound(state: ConnectionState) -> bool {
        state >= ConnectionState::Bound
    }

    /// 检查传输通道是否已激活
    /// Check if the transport channel is active
    pub fn is_channel_enabled(state: ConnectionState) -> bool {
        state >= ConnectionState::Enabled
    }

    /// 检查是否可以分发入站请求
    /// Check if inbound requests can be dispatched
    pub fn can_dispatch(state: ConnectionState) -> bool {
        state == ConnectionState::Initialized
    }
}
