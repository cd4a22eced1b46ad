//! 连接生命周期事件
//! Connection lifecycle events
//!
//! 激活器在每个生命周期步骤完成后触发事件，供诊断和测试观察连接的进展。
//!
//! The activator emits an event after every lifecycle step so diagnostics and
//! tests can observe how connections progress.

use super::ConnectionState;
use crate::{error::Error, protocol::Version};

/// 生命周期事件类型
/// Lifecycle event types
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// 协议已绑定
    /// Protocol bound
    Bound { connection: String },
    /// 通道已激活
    /// Channel enabled
    ChannelEnabled {
        connection: String,
        handler_registered: bool,
    },
    /// 版本已协商
    /// Version negotiated
    VersionNegotiated { connection: String, peer: Version },
    /// 协议初始化完成
    /// Protocol initialized
    Initialized { connection: String },
    /// 通道已停用
    /// Channel disabled
    ChannelDisabled { connection: String },
    /// 协议已解绑
    /// Protocol unbound
    Unbound { connection: String },
    /// 连接启动失败并已回滚
    /// Connection bring-up failed and was rolled back
    BringUpFailed { connection: String, error: Error },
    /// 状态转换事件
    /// State transition event
    StateTransition {
        connection: String,
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// 事件监听器类型定义
/// Event listener type definition
pub type EventListener = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Fans lifecycle events out to registered listeners.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Vec<EventListener>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("event_listeners_count", &self.listeners.len())
            .finish()
    }
}

impl EventEmitter {
    /// 注册事件监听器
    /// Register event listener
    pub fn register(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn emit(&self, event: LifecycleEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// 触发状态转换事件（状态未变化时不触发）
    /// Trigger a state transition event (skipped when the state did not change)
    pub fn transition(&self, connection: &str, from: ConnectionState, to: ConnectionState) {
        if from != to {
            self.emit(LifecycleEvent::StateTransition {
                connection: connection.to_string(),
                from,
                to,
            });
        }
    }
}
