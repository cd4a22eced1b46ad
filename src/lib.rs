#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Connection lifecycle core for bundles of logical bus channels.
//! 总线逻辑通道捆绑包的连接生命周期核心。
//!
//! For every connection of a bundle the core binds a protocol implementation,
//! enables the transport channel, negotiates the peer's protocol version and
//! runs the protocol's own setup. A bundle that fails part way is rolled back in
//! reverse order, and teardown always mirrors bring-up.
//!
//! 对于捆绑包中的每个连接，核心会绑定协议实现、启用传输通道、协商对端协议版本，
//! 并运行协议自身的初始化。中途失败的捆绑包会按相反顺序回滚。

pub mod bundle;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bundle::{Bundle, BundleClass, BundleId, BundleManager, BundleOrchestrator};
pub use config::Config;
pub use connection::{Connection, ConnectionActivator, ConnectionState};
pub use dispatcher::RequestDispatcher;
pub use error::{Error, Result};
pub use protocol::{Protocol, ProtocolId, ProtocolRegistry, ProtocolRequest, Version};
pub use transport::{InboundHandler, Operation, Transport};
