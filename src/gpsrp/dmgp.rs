//! DMGP：活动节点保存 GoS packet 副本的内存
//!
//! 按字节预算保存最近转发的受保护 packet，空间不够时先淘汰最早保存的副本。

use std::collections::VecDeque;

use tracing::trace;

use crate::net::{FlowId, Packet, PortId};

/// 一份副本，连同它当初被转发出去的端口
#[derive(Debug, Clone)]
pub struct DmgpEntry {
    pub flow_id: FlowId,
    pub packet_id: u32,
    pub port: PortId,
    pub packet: Packet,
}

#[derive(Debug)]
pub struct Dmgp {
    capacity_bytes: u64,
    used_bytes: u64,
    entries: VecDeque<DmgpEntry>,
}

impl Dmgp {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            entries: VecDeque::new(),
        }
    }

    pub fn with_size_kb(kb: u32) -> Self {
        Self::new((kb as u64).saturating_mul(1024))
    }

    /// 保存一份副本。比整个预算还大的 packet 不保存，返回 false。
    pub fn store(&mut self, port: PortId, pkt: &Packet) -> bool {
        let sz = pkt.size() as u64;
        if sz > self.capacity_bytes {
            return false;
        }
        let flow_id = pkt.flow_id();
        let packet_id = pkt.local_unique_id();
        self.remove(flow_id, packet_id);

        while self.used_bytes.saturating_add(sz) > self.capacity_bytes {
            let Some(old) = self.entries.pop_front() else { break };
            self.used_bytes = self.used_bytes.saturating_sub(old.packet.size() as u64);
            trace!(flow_id = old.flow_id, packet_id = old.packet_id, "DMGP 淘汰旧副本");
        }

        self.used_bytes = self.used_bytes.saturating_add(sz);
        self.entries.push_back(DmgpEntry {
            flow_id,
            packet_id,
            port,
            packet: pkt.clone(),
        });
        true
    }

    pub fn lookup(&self, flow_id: FlowId, packet_id: u32) -> Option<&DmgpEntry> {
        self.entries
            .iter()
            .find(|e| e.flow_id == flow_id && e.packet_id == packet_id)
    }

    /// 取一份用于重发的拷贝；原副本保留，可以应答后续请求。
    pub fn copy_for_resend(&self, flow_id: FlowId, packet_id: u32) -> Option<(PortId, Packet)> {
        self.lookup(flow_id, packet_id)
            .map(|e| (e.port, e.packet.clone()))
    }

    pub fn remove(&mut self, flow_id: FlowId, packet_id: u32) -> Option<DmgpEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.flow_id == flow_id && e.packet_id == packet_id)?;
        let entry = self.entries.remove(pos)?;
        self.used_bytes = self.used_bytes.saturating_sub(entry.packet.size() as u64);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}
