//! IPv4 头部与 GoS 选项
//!
//! 选项字段用于扩展信令：GoS 等级、流内唯一编号、以及 packet 经过的活动节点列表。
//! GPSRP 依赖这份列表沿原路向上游请求重传。

use std::net::Ipv4Addr;

/// 不含选项的固定头部
pub const IPV4_HEADER_BYTES: u32 = 20;
/// IPv4 选项字段最多 40 字节
pub const IPV4_MAX_OPTIONS_BYTES: u32 = 40;
/// 选项里最多记录的活动节点数（1 + 4 + 8 * 4 = 37 字节，补齐后 40）
pub const MAX_CROSSED_ACTIVE_NODES: usize = 8;
pub const DEFAULT_IPV4_TTL: u8 = 64;

/// GoS 等级：低两位是优先级，第三位表示需要备份 LSP。
pub mod gos {
    pub const LEVEL0: u8 = 0;
    pub const LEVEL1: u8 = 1;
    pub const LEVEL2: u8 = 2;
    pub const LEVEL3: u8 = 3;
    pub const BACKUP_LSP: u8 = 0b100;

    pub fn priority(level: u8) -> u8 {
        level & 0b11
    }

    pub fn requires_backup_lsp(level: u8) -> bool {
        level & BACKUP_LSP != 0
    }

    /// 只有优先级大于 0 的 packet 受 GPSRP/DMGP 保护
    pub fn is_protected(level: u8) -> bool {
        priority(level) > 0
    }
}

/// IPv4 选项中的 GoS 信令
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4Options {
    gos_level: u8,
    local_unique_id: u32,
    crossed_active_nodes: Vec<Ipv4Addr>,
}

impl Ipv4Options {
    pub fn new(gos_level: u8, local_unique_id: u32) -> Self {
        Self {
            gos_level,
            local_unique_id,
            crossed_active_nodes: Vec::new(),
        }
    }

    pub fn gos_level(&self) -> u8 {
        self.gos_level
    }

    pub fn set_gos_level(&mut self, level: u8) {
        self.gos_level = level;
    }

    pub fn local_unique_id(&self) -> u32 {
        self.local_unique_id
    }

    pub fn set_local_unique_id(&mut self, id: u32) {
        self.local_unique_id = id;
    }

    /// 追加一个经过的活动节点。列表已满时拒绝并返回 false。
    pub fn record_crossed_active_node(&mut self, addr: Ipv4Addr) -> bool {
        if self.crossed_active_nodes.len() >= MAX_CROSSED_ACTIVE_NODES {
            return false;
        }
        self.crossed_active_nodes.push(addr);
        true
    }

    /// 按经过的先后顺序
    pub fn crossed_active_nodes(&self) -> &[Ipv4Addr] {
        &self.crossed_active_nodes
    }

    pub fn has_crossed_active_nodes(&self) -> bool {
        !self.crossed_active_nodes.is_empty()
    }

    /// 是否需要在头部里携带选项
    pub fn is_used(&self) -> bool {
        self.gos_level != 0 || !self.crossed_active_nodes.is_empty()
    }

    /// 选项字段在线路上的长度，按 4 字节对齐。
    pub fn size_bytes(&self) -> u32 {
        if !self.is_used() {
            return 0;
        }
        // GoS 1 字节 + local id 4 字节 + 每个节点 4 字节
        let raw = 1 + 4 + 4 * self.crossed_active_nodes.len() as u32;
        raw.div_ceil(4).saturating_mul(4).min(IPV4_MAX_OPTIONS_BYTES)
    }
}

/// IPv4 头部
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub origin: Ipv4Addr,
    pub target: Ipv4Addr,
    pub ttl: u8,
    pub options: Ipv4Options,
}

impl Ipv4Header {
    pub fn new(origin: Ipv4Addr, target: Ipv4Addr) -> Self {
        Self {
            origin,
            target,
            ttl: DEFAULT_IPV4_TTL,
            options: Ipv4Options::default(),
        }
    }

    pub fn size_bytes(&self) -> u32 {
        IPV4_HEADER_BYTES + self.options.size_bytes()
    }
}
