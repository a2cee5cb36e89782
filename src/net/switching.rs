//! 标签交换表
//!
//! 标签分配由外部完成，这里只保存结果：入口 LER 的 FEC 表（目的地址 → 压入的标签）
//! 和入标签映射（入端口 + 标签 → 操作）。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::id::PortId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOp {
    Push(u32),
    Swap(u32),
    Pop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEntry {
    /// None：弹出后在本地交付
    pub out_port: Option<PortId>,
    pub op: LabelOp,
}

#[derive(Debug, Default, Clone)]
pub struct SwitchingTable {
    fec: HashMap<Ipv4Addr, (PortId, u32)>,
    ilm: HashMap<(PortId, u32), SwitchEntry>,
}

impl SwitchingTable {
    /// 入口 LER：发往 `target` 的 packet 压入 `label` 后从 `out_port` 发出
    pub fn add_fec(&mut self, target: Ipv4Addr, out_port: PortId, label: u32) {
        self.fec.insert(target, (out_port, label));
    }

    pub fn fec(&self, target: Ipv4Addr) -> Option<(PortId, u32)> {
        self.fec.get(&target).copied()
    }

    pub fn add_label_binding(&mut self, in_port: PortId, in_label: u32, entry: SwitchEntry) {
        self.ilm.insert((in_port, in_label), entry);
    }

    pub fn lookup(&self, in_port: PortId, label: u32) -> Option<SwitchEntry> {
        self.ilm.get(&(in_port, label)).copied()
    }

    pub fn len(&self) -> usize {
        self.fec.len() + self.ilm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fec.is_empty() && self.ilm.is_empty()
    }
}
