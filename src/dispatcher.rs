//! 请求分发器 - 将入站操作路由到已绑定协议的请求处理器
//! Request Dispatcher - Routes inbound operations to the bound protocol's handler

use crate::{
    connection::{Connection, StateValidator},
    error::{Error, Result},
    transport::{InboundHandler, Operation},
};
use async_trait::async_trait;
use tracing::{error, trace};

/// Routes an inbound operation on an operating connection to its protocol.
///
/// The dispatcher holds no state and takes no locks beyond a short read of the
/// connection's binding, so the transport may call it concurrently for the
/// same connection. Handler failures are returned to the transport unchanged;
/// nothing is retried here.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestDispatcher;

impl RequestDispatcher {
    pub async fn dispatch(&self, connection: &Connection, operation: Operation) -> Result<()> {
        let (state, bound, handler) = connection.dispatch_target();

        if !bound {
            error!(
                connection = connection.name(),
                op_type = operation.op_type,
                "Request for connection without a bound protocol"
            );
            return Err(Error::NotBound);
        }
        if !StateValidator::can_dispatch(state) {
            return Err(Error::NotReady { state });
        }
        let Some(handler) = handler else {
            // The channel was enabled without a handler, so the transport should
            // never have delivered this.
            error!(
                connection = connection.name(),
                op_type = operation.op_type,
                "No request handler registered"
            );
            return Err(Error::NoHandler);
        };

        trace!(
            connection = connection.name(),
            id = operation.id,
            op_type = operation.op_type,
            len = operation.payload.len(),
            "Dispatching request"
        );
        handler.request_recv(operation.op_type, &operation).await
    }
}

#[async_trait]
impl InboundHandler for RequestDispatcher {
    async fn on_request(&self, connection: &Connection, operation: Operation) -> Result<()> {
        self.dispatch(connection, operation).await
    }
}
