//! 协议注册表 - 按ID和版本解析协议并管理借出计数
//! Protocol Registry - Resolves protocols by id and version and tracks checkouts

use super::{Protocol, ProtocolHandle, ProtocolId, ProtocolRequest, Version};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing::{debug, trace};

struct Registered {
    protocol: Arc<dyn Protocol>,
    checkouts: Arc<AtomicUsize>,
}

/// 协议注册表
/// Protocol registry
///
/// 注册表在所有捆绑包之间共享，可以被并发访问。借出计数使用原子操作更新，
/// 借出操作在持有分片读锁时进行，因此不会与注销操作竞争。
///
/// The registry is shared by every bundle and may be accessed concurrently.
/// Checkout counts are atomic, and a checkout is taken while the shard read
/// guard is held, so it never races with deregistration.
#[derive(Default)]
pub struct ProtocolRegistry {
    protocols: DashMap<ProtocolId, Vec<Registered>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a protocol implementation.
    ///
    /// Fails if a protocol with the same id and version is already present.
    ///
    /// 注册一个协议实现。如果已存在相同ID和版本的协议则失败。
    pub fn register(&self, protocol: Arc<dyn Protocol>) -> Result<()> {
        let id = protocol.id();
        let version = protocol.version();
        let mut entry = self.protocols.entry(id).or_default();

        if entry.iter().any(|r| r.protocol.version() == version) {
            return Err(Error::ProtocolAlreadyRegistered {
                id,
                major: version.major,
                minor: version.minor,
            });
        }

        debug!(protocol = %id, %version, name = protocol.name(), "Registered protocol");
        entry.push(Registered {
            protocol,
            checkouts: Arc::new(AtomicUsize::new(0)),
        });
        Ok(())
    }

    /// Removes a protocol implementation, returning it.
    ///
    /// Fails with [`Error::ProtocolInUse`] while any connection still holds a
    /// checkout of it.
    ///
    /// 移除一个协议实现。只要仍有连接持有其借出，就会失败。
    pub fn deregister(&self, id: ProtocolId, version: Version) -> Result<Arc<dyn Protocol>> {
        let not_found = Error::ProtocolNotSupported {
            id,
            major: version.major,
            minor: version.minor,
        };

        let removed = {
            let Some(mut entry) = self.protocols.get_mut(&id) else {
                return Err(not_found);
            };
            let Some(index) = entry.iter().position(|r| r.protocol.version() == version) else {
                return Err(not_found);
            };
            let checkouts = entry[index].checkouts.load(Ordering::Acquire);
            if checkouts > 0 {
                return Err(Error::ProtocolInUse {
                    id,
                    major: version.major,
                    minor: version.minor,
                    checkouts,
                });
            }
            entry.remove(index).protocol
        };

        self.protocols.remove_if(&id, |_, remaining| remaining.is_empty());
        debug!(protocol = %id, %version, "Deregistered protocol");
        Ok(removed)
    }

    /// Resolves `request` to a protocol and checks it out.
    ///
    /// When several registered versions can serve the request, the one with the
    /// highest minor revision wins.
    ///
    /// 将请求解析为协议并借出。当多个已注册版本都可以服务该请求时，
    /// 选择次版本号最高的那个。
    pub fn lookup_and_checkout(&self, request: ProtocolRequest) -> Option<ProtocolHandle> {
        let entry = self.protocols.get(&request.id)?;
        let best = entry
            .iter()
            .filter(|r| request.is_served_by(r.protocol.id(), r.protocol.version()))
            .max_by_key(|r| r.protocol.version())?;

        let handle = ProtocolHandle::checkout(best.protocol.clone(), best.checkouts.clone());
        trace!(%request, version = %best.protocol.version(), "Protocol checked out");
        Some(handle)
    }

    /// Returns a checkout to the registry.
    /// 将借出归还给注册表。
    pub fn release(&self, handle: ProtocolHandle) {
        trace!(
            protocol = %handle.protocol().id(),
            version = %handle.protocol().version(),
            "Protocol released"
        );
        drop(handle);
    }

    /// Outstanding checkouts of one registered protocol version.
    /// 某个已注册协议版本的未归还借出数量。
    pub fn checkouts(&self, id: ProtocolId, version: Version) -> usize {
        self.protocols
            .get(&id)
            .and_then(|entry| {
                entry
                    .iter()
                    .find(|r| r.protocol.version() == version)
                    .map(|r| r.checkouts.load(Ordering::Acquire))
            })
            .unwrap_or(0)
    }

    /// Outstanding checkouts across every registered protocol.
    /// 所有已注册协议的未归还借出总数。
    pub fn outstanding_checkouts(&self) -> usize {
        self.protocols
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .map(|r| r.checkouts.load(Ordering::Acquire))
                    .sum::<usize>()
            })
            .sum()
    }

    /// Number of registered protocol versions.
    pub fn len(&self) -> usize {
        self.protocols.iter().map(|entry| entry.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.len())
            .field("outstanding_checkouts", &self.outstanding_checkouts())
            .finish()
    }
}
