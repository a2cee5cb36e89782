//! 链路
//!
//! 点到点全双工链路，两端各绑定一个节点端口。每个方向各自计算串行化时延。

use std::net::Ipv4Addr;

use super::id::{LinkId, NodeId, PortId};
use crate::sim::SimTime;

/// 端口上记录的链路绑定：对端是谁、接在对端哪个端口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkBinding {
    pub link: LinkId,
    pub peer: NodeId,
    pub peer_port: PortId,
    pub peer_address: Ipv4Addr,
}

/// 链路一端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEnd {
    pub node: NodeId,
    pub port: PortId,
}

#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub ends: [LinkEnd; 2],
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 每个方向的发送端忙到何时（下标与 `ends` 对应，表示从该端发出）
    busy_until: [SimTime; 2],
}

impl Link {
    pub fn new(id: LinkId, a: LinkEnd, b: LinkEnd, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            id,
            ends: [a, b],
            latency,
            bandwidth_bps,
            busy_until: [SimTime::ZERO; 2],
        }
    }

    /// 对端；`from` 不在链路上时返回 None
    pub fn peer_of(&self, from: NodeId) -> Option<LinkEnd> {
        match self.ends {
            [a, b] if a.node == from => Some(b),
            [a, b] if b.node == from => Some(a),
            _ => None,
        }
    }

    /// 传输指定字节数所需的时间：ceil(bytes*8 / bps)
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 从 `from` 发出 `bytes` 字节：占用该方向的发送端，返回（对端, 到达时间）。
    pub(crate) fn transmit(&mut self, from: NodeId, bytes: u32, now: SimTime) -> Option<(LinkEnd, SimTime)> {
        let dir = if self.ends[0].node == from {
            0
        } else if self.ends[1].node == from {
            1
        } else {
            return None;
        };
        let start = now.max(self.busy_until[dir]);
        let depart = start.saturating_add(self.tx_time(bytes));
        self.busy_until[dir] = depart;
        Some((self.ends[1 - dir], depart.saturating_add(self.latency)))
    }
}
