//! 协议借出句柄。
//! Protocol checkout handle.

use super::Protocol;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// A checked-out reference to a registered protocol.
///
/// The handle is move-only. Its checkout is returned to the registry exactly
/// once, when the handle is released or dropped, so a checkout can neither leak
/// nor be released twice.
///
/// 对已注册协议的借出引用。句柄只能移动，不能复制。借出在句柄被释放或丢弃时
/// 恰好归还一次。
pub struct ProtocolHandle {
    protocol: Arc<dyn Protocol>,
    checkouts: Arc<AtomicUsize>,
}

impl ProtocolHandle {
    /// Takes a new checkout against `checkouts`.
    pub(super) fn checkout(protocol: Arc<dyn Protocol>, checkouts: Arc<AtomicUsize>) -> Self {
        checkouts.fetch_add(1, Ordering::AcqRel);
        Self {
            protocol,
            checkouts,
        }
    }

    /// The protocol this handle refers to.
    /// 该句柄引用的协议。
    pub fn protocol(&self) -> &Arc<dyn Protocol> {
        &self.protocol
    }
}

impl Drop for ProtocolHandle {
    fn drop(&mut self) {
        self.checkouts.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for ProtocolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolHandle")
            .field("id", &self.protocol.id())
            .field("version", &self.protocol.version())
            .field("name", &self.protocol.name())
            .finish()
    }
}
