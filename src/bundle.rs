//! 捆绑包及其编排
//! Bundles and their orchestration
//!
//! 捆绑包是远程外设公开的一个功能单元，由一组有序的连接组成。连接的顺序很重要：
//! 拆除顺序必须与启动顺序完全相反。
//!
//! A bundle is one functional unit exposed by a remote peripheral, made of an
//! ordered list of connections. Order matters: teardown runs in exactly the
//! reverse of bring-up order.

mod manager;
mod orchestrator;

pub use manager::BundleManager;
pub use orchestrator::{BundleOrchestrator, PartialBringUp};

use crate::connection::Connection;
use std::{fmt, sync::Arc};

/// The class tag of a bundle.
/// 捆绑包的类别标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleClass(pub u8);

impl BundleClass {
    pub const CONTROL: Self = Self(0x00);
    pub const AP: Self = Self(0x01);
    pub const GPIO: Self = Self(0x02);
    pub const I2C: Self = Self(0x03);
    pub const UART: Self = Self(0x04);
    pub const HID: Self = Self(0x05);
    pub const USB: Self = Self(0x06);
    pub const SDIO: Self = Self(0x07);
    pub const POWER_SUPPLY: Self = Self(0x08);
    pub const PWM: Self = Self(0x09);
    pub const SPI: Self = Self(0x0b);
    pub const DISPLAY: Self = Self(0x0c);
    pub const CAMERA: Self = Self(0x0d);
    pub const SENSOR: Self = Self(0x0e);
    pub const LIGHTS: Self = Self(0x0f);
    pub const VIBRATOR: Self = Self(0x10);
    pub const LOOPBACK: Self = Self(0x11);
    pub const AUDIO_MGMT: Self = Self(0x12);
    pub const AUDIO_DATA: Self = Self(0x13);
    pub const SVC: Self = Self(0x14);
    pub const FIRMWARE: Self = Self(0x15);
    pub const RAW: Self = Self(0xfe);
    pub const VENDOR: Self = Self(0xff);
}

impl fmt::Display for BundleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Bus-wide bundle identifier.
/// 总线范围内的捆绑包标识符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(pub u32);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A functional unit of a remote peripheral and its connections.
///
/// Created by the enumeration layer; the lifecycle core only consumes it.
#[derive(Debug)]
pub struct Bundle {
    id: BundleId,
    class: BundleClass,
    connections: Vec<Arc<Connection>>,
}

impl Bundle {
    pub fn new(id: BundleId, class: BundleClass, connections: Vec<Connection>) -> Self {
        Self {
            id,
            class,
            connections: connections.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn id(&self) -> BundleId {
        self.id
    }

    pub fn class(&self) -> BundleClass {
        self.class
    }

    /// Connections in declared order.
    /// 按声明顺序排列的连接。
    pub fn connections(&self) -> &[Arc<Connection>] {
        &self.connections
    }

    pub fn connection(&self, name: &str) -> Option<&Arc<Connection>> {
        self.connections.iter().find(|c| c.name() == name)
    }
}
