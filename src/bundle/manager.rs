//! 捆绑包管理器 - 跟踪已附加的捆绑包
//! Bundle Manager - Tracks attached bundles
//!
//! 这是枚举层面对的驱动程序注册接口：设备附加时调用 `probe`，分离时调用
//! `disconnect`。不同外设的捆绑包可以在不同任务中并发地附加和分离。
//!
//! This is the driver registration surface the enumeration layer talks to:
//! `probe` at attach time, `disconnect` at detach time. Bundles of different
//! peripherals may be attached and detached concurrently from different tasks.

use super::{Bundle, BundleId, BundleOrchestrator};
use crate::{
    error::{Error, Result},
    transport::Transport,
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct BundleManager<T: Transport> {
    orchestrator: BundleOrchestrator<T>,
    attached: DashMap<BundleId, Arc<Bundle>>,
}

impl<T: Transport> BundleManager<T> {
    pub fn new(orchestrator: BundleOrchestrator<T>) -> Self {
        Self {
            orchestrator,
            attached: DashMap::new(),
        }
    }

    pub fn orchestrator(&self) -> &BundleOrchestrator<T> {
        &self.orchestrator
    }

    /// Brings `bundle` up and records it as attached. A failed bring-up records
    /// nothing.
    ///
    /// 启动捆绑包并将其记录为已附加。启动失败时不记录任何内容。
    pub async fn probe(&self, bundle: Arc<Bundle>) -> Result<()> {
        let id = bundle.id();
        if self.attached.contains_key(&id) {
            return Err(Error::BundleAlreadyAttached(id));
        }

        self.orchestrator.bring_up(&bundle).await?;

        // Another probe for the same id may have finished while this one ran.
        let duplicate = match self.attached.entry(id) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(bundle.clone());
                false
            }
        };
        if duplicate {
            warn!(bundle = %id, "Bundle attached concurrently, undoing this probe");
            self.orchestrator.tear_down(&bundle).await;
            return Err(Error::BundleAlreadyAttached(id));
        }

        info!(
            driver = self.orchestrator.driver_name(),
            bundle = %id,
            "Bundle attached"
        );
        Ok(())
    }

    /// Tears the bundle down and forgets it.
    /// 拆除捆绑包并将其遗忘。
    pub async fn disconnect(&self, id: BundleId) -> Result<()> {
        let (_, bundle) = self
            .attached
            .remove(&id)
            .ok_or(Error::BundleNotAttached(id))?;
        self.orchestrator.tear_down(&bundle).await;
        info!(bundle = %id, "Bundle detached");
        Ok(())
    }

    /// Tears down every attached bundle.
    /// 拆除所有已附加的捆绑包。
    pub async fn shutdown(&self) {
        let ids: Vec<BundleId> = self.attached.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, bundle)) = self.attached.remove(&id) {
                self.orchestrator.tear_down(&bundle).await;
            }
        }
        info!(driver = self.orchestrator.driver_name(), "All bundles detached");
    }

    pub fn is_attached(&self, id: BundleId) -> bool {
        self.attached.contains_key(&id)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }
}
