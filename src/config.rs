//! 定义了驱动程序和连接生命周期的可配置参数。
//! Defines configurable parameters for the driver and the connection lifecycle.

use crate::bundle::BundleClass;
use std::time::Duration;

/// A structure containing all configurable parameters for the lifecycle core.
///
/// 包含生命周期核心所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// Driver identity and the bundle classes it claims.
    /// 驱动程序标识及其声明的捆绑包类别。
    pub driver: DriverConfig,

    /// Bounds on the calls that exchange messages with the peer.
    /// 与对端交换消息的调用的时间上限。
    pub timing: TimingConfig,
}

/// Driver identity and id table.
///
/// 驱动程序标识和ID表。
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// The driver name, used in diagnostics.
    /// 驱动程序名称，用于诊断。
    pub name: String,
    /// The bundle classes this driver accepts. A bundle whose class is not
    /// listed here is never brought up.
    /// 该驱动程序接受的捆绑包类别。未在此列出的类别的捆绑包永远不会被启动。
    pub id_table: Vec<BundleClass>,
}

/// Timing parameters for connection bring-up.
///
/// 连接启动的时间参数。
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// How long to wait for the peer to answer the version query. An elapsed
    /// wait is reported as a version negotiation failure.
    /// 等待对端应答版本查询的时间。超时将报告为版本协商失败。
    pub version_query_timeout: Duration,
    /// How long a protocol may spend in `connection_init`.
    /// 协议在 `connection_init` 中可以花费的时间。
    pub connection_init_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "legacy".to_string(),
            id_table: vec![
                BundleClass::GPIO,
                BundleClass::I2C,
                BundleClass::UART,
                BundleClass::HID,
                BundleClass::USB,
                BundleClass::SDIO,
                BundleClass::POWER_SUPPLY,
                BundleClass::PWM,
                BundleClass::SPI,
                BundleClass::DISPLAY,
                BundleClass::CAMERA,
                BundleClass::SENSOR,
                BundleClass::LIGHTS,
                BundleClass::VIBRATOR,
                BundleClass::LOOPBACK,
                BundleClass::AUDIO_MGMT,
                BundleClass::AUDIO_DATA,
                BundleClass::SVC,
                BundleClass::FIRMWARE,
                BundleClass::RAW,
            ],
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            version_query_timeout: Duration::from_secs(1),
            connection_init_timeout: Duration::from_secs(5),
        }
    }
}
