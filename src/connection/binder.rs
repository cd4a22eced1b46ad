//! 连接绑定器 - 通过注册表将连接绑定到协议或解除绑定
//! Connection Binder - Binds connections to protocols through the registry

use super::Connection;
use crate::{
    error::{Error, Result},
    protocol::ProtocolRegistry,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Binds and unbinds connections against a shared [`ProtocolRegistry`].
///
/// 通过共享的 [`ProtocolRegistry`] 绑定和解绑连接。
#[derive(Debug, Clone)]
pub struct ConnectionBinder {
    registry: Arc<ProtocolRegistry>,
}

impl ConnectionBinder {
    pub fn new(registry: Arc<ProtocolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProtocolRegistry> {
        &self.registry
    }

    /// Looks up the protocol the connection asks for and attaches a checkout of
    /// it. A missing protocol is reported and not retried.
    ///
    /// 查找连接请求的协议并附加其借出。找不到协议时报告错误且不重试。
    pub fn bind(&self, connection: &Connection) -> Result<()> {
        let request = connection.request();
        let Some(handle) = self.registry.lookup_and_checkout(request) else {
            error!(
                connection = connection.name(),
                "protocol {} version {}.{} not found", request.id, request.major, request.minor
            );
            return Err(Error::ProtocolNotSupported {
                id: request.id,
                major: request.major,
                minor: request.minor,
            });
        };

        let version = handle.protocol().version();
        connection.attach(handle)?;
        debug!(
            connection = connection.name(),
            protocol = %request.id,
            %version,
            "Protocol bound"
        );
        Ok(())
    }

    /// Returns the connection's checkout to the registry. Does nothing when no
    /// protocol is bound. Returns whether a protocol was released.
    ///
    /// 将连接的借出归还给注册表。未绑定协议时不做任何事。
    pub fn unbind(&self, connection: &Connection) -> bool {
        match connection.detach() {
            Some((handle, _)) => {
                self.registry.release(handle);
                debug!(connection = connection.name(), "Protocol unbound");
                true
            }
            None => false,
        }
    }
}
