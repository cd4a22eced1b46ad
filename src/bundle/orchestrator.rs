//! 捆绑包编排器 - 按顺序启动捆绑包的所有连接，并在部分失败时按相反顺序回滚
//! Bundle Orchestrator - Brings up a bundle's connections in order and rolls
//! back in reverse on partial failure

use super::{Bundle, BundleClass};
use crate::{
    config::{Config, DriverConfig},
    connection::{Connection, ConnectionActivator},
    error::{Error, Result},
    protocol::ProtocolRegistry,
    transport::Transport,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The result of a forward bring-up that stopped early.
///
/// 提前停止的正向启动的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct PartialBringUp {
    /// Number of leading connections that reached `Initialized`.
    /// 已达到 `Initialized` 的前导连接数。
    pub completed: usize,
    /// The error from connection `completed`, which the activator already
    /// rolled back.
    /// 来自第 `completed` 个连接的错误，激活器已对其回滚。
    pub error: Error,
}

/// 捆绑包编排器
/// Bundle orchestrator
///
/// 编排器与类别无关：只要捆绑包的类别在ID表中，它对所有捆绑包的处理方式完全相同。
///
/// The orchestrator is class-agnostic: any bundle whose class is in the id table
/// is handled identically.
#[derive(Debug)]
pub struct BundleOrchestrator<T: Transport> {
    activator: ConnectionActivator<T>,
    driver: DriverConfig,
}

impl<T: Transport> BundleOrchestrator<T> {
    pub fn new(activator: ConnectionActivator<T>, driver: DriverConfig) -> Self {
        Self { activator, driver }
    }

    /// Builds an orchestrator and its activator from `config`.
    /// 根据 `config` 构建编排器及其激活器。
    pub fn from_config(transport: Arc<T>, registry: Arc<ProtocolRegistry>, config: &Config) -> Self {
        let activator = ConnectionActivator::new(transport, registry, config.timing.clone());
        Self::new(activator, config.driver.clone())
    }

    pub fn activator(&self) -> &ConnectionActivator<T> {
        &self.activator
    }

    pub fn driver_name(&self) -> &str {
        &self.driver.name
    }

    /// Whether bundles of `class` are handled by this driver.
    /// 此驱动程序是否处理 `class` 类别的捆绑包。
    pub fn claims(&self, class: BundleClass) -> bool {
        self.driver.id_table.contains(&class)
    }

    /// Brings up every connection of `bundle` in declared order.
    ///
    /// If connection `k` fails, connections `0..k` are torn down in reverse and
    /// the error from `k` is returned. Failures during that rollback are logged
    /// and never replace the original error.
    ///
    /// 按声明顺序启动捆绑包的每个连接。如果第 `k` 个连接失败，则按相反顺序拆除
    /// 连接 `0..k` 并返回第 `k` 个连接的错误。回滚期间的失败只记录日志，
    /// 不会替换原始错误。
    pub async fn bring_up(&self, bundle: &Bundle) -> Result<()> {
        if !self.claims(bundle.class()) {
            return Err(Error::ClassNotClaimed(bundle.class()));
        }

        debug!(
            driver = %self.driver.name,
            bundle = %bundle.id(),
            class = %bundle.class(),
            "Probing bundle"
        );

        match self.bring_up_connections(bundle.connections()).await {
            Ok(()) => {
                info!(
                    bundle = %bundle.id(),
                    connections = bundle.connections().len(),
                    "Bundle brought up"
                );
                Ok(())
            }
            Err(PartialBringUp { completed, error }) => {
                warn!(
                    bundle = %bundle.id(),
                    failed = bundle.connections()[completed].name(),
                    %error,
                    "Bundle bring-up failed, rolling back {} connections",
                    completed
                );
                self.tear_down_connections(&bundle.connections()[..completed])
                    .await;
                Err(error)
            }
        }
    }

    /// Tears down every connection of `bundle` in reverse declared order.
    /// Connections that are already unbound are skipped.
    ///
    /// 按声明的相反顺序拆除捆绑包的每个连接。已解绑的连接会被跳过。
    pub async fn tear_down(&self, bundle: &Bundle) {
        debug!(
            driver = %self.driver.name,
            bundle = %bundle.id(),
            class = %bundle.class(),
            "Disconnecting bundle"
        );
        let failures = self.tear_down_connections(bundle.connections()).await;
        info!(bundle = %bundle.id(), failures, "Bundle torn down");
    }

    /// Forward half of bring-up: stops at the first failure and reports how
    /// many connections completed. Nothing is rolled back here beyond what the
    /// activator undoes for the failing connection.
    pub async fn bring_up_connections(
        &self,
        connections: &[Arc<Connection>],
    ) -> std::result::Result<(), PartialBringUp> {
        for (completed, connection) in connections.iter().enumerate() {
            if let Err(error) = self.activator.bring_up(connection).await {
                return Err(PartialBringUp { completed, error });
            }
        }
        Ok(())
    }

    /// Tears down `connections` in reverse order, continuing past failures.
    /// Returns the number of connections whose teardown reported a failure.
    pub async fn tear_down_connections(&self, connections: &[Arc<Connection>]) -> usize {
        let mut failures = 0;
        for connection in connections.iter().rev() {
            if let Err(e) = self.activator.tear_down(connection).await {
                failures += 1;
                warn!(
                    connection = connection.name(),
                    error = %e,
                    "Connection teardown reported a failure"
                );
            }
        }
        failures
    }
}
