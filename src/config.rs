//! 仿真配置
//!
//! 所有仿真常量（GPSRP 超时、重试次数、缓冲区大小等）都在搭建仿真时显式传入，
//! 不使用全局变量；可以从 JSON 读取，缺省字段取默认值。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sim::SimTime;

/// GPSRP 重传请求的超时（纳秒），默认 50us
pub const DEFAULT_GPSRP_TIMEOUT_NS: u64 = 50_000;
/// 每个重传请求最多尝试的次数
pub const DEFAULT_GPSRP_ATTEMPTS: u32 = 8;

/// GPSRP 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsrpConfig {
    /// 每次请求等待的时长（纳秒）
    pub timeout_ns: u64,
    /// 尝试次数预算
    pub attempts: u32,
}

impl Default for GpsrpConfig {
    fn default() -> Self {
        Self {
            timeout_ns: DEFAULT_GPSRP_TIMEOUT_NS,
            attempts: DEFAULT_GPSRP_ATTEMPTS,
        }
    }
}

impl GpsrpConfig {
    pub fn timeout(&self) -> SimTime {
        SimTime(self.timeout_ns)
    }
}

/// 节点缓冲区参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// 每个端口的缓冲区大小（MB）
    pub buffer_size_mb: u32,
    /// 不限缓冲区（不会因拥塞丢包）
    pub unlimited: bool,
    /// 活动节点保存 GoS packet 副本的内存（KB）
    pub dmgp_size_kb: u32,
    /// 每个 tick 节点最多交换的字节数
    pub switching_octets_per_tick: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size_mb: 1,
            unlimited: false,
            dmgp_size_kb: 1024,
            switching_octets_per_tick: 12_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub gpsrp: GpsrpConfig,
    pub buffer: BufferConfig,
    /// 节点服务周期（纳秒）
    pub tick_ns: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gpsrp: GpsrpConfig::default(),
            buffer: BufferConfig::default(),
            tick_ns: 1_000,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: SimConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn tick(&self) -> SimTime {
        SimTime(self.tick_ns)
    }

    /// 检查参数组合是否合理
    pub fn validate(&self) -> Result<()> {
        if self.tick_ns == 0 {
            return Err(Error::Config("tick_ns must be > 0".into()));
        }
        if self.gpsrp.timeout_ns == 0 {
            return Err(Error::Config("gpsrp.timeout_ns must be > 0".into()));
        }
        if self.gpsrp.attempts == 0 {
            return Err(Error::Config("gpsrp.attempts must be > 0".into()));
        }
        if !self.buffer.unlimited && self.buffer.buffer_size_mb == 0 {
            return Err(Error::Config(
                "buffer.buffer_size_mb must be > 0 unless buffer.unlimited is set".into(),
            ));
        }
        if self.buffer.switching_octets_per_tick == 0 {
            return Err(Error::Config(
                "buffer.switching_octets_per_tick must be > 0".into(),
            ));
        }
        Ok(())
    }
}
