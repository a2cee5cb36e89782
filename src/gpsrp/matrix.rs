//! 重传请求矩阵
//!
//! 每个节点一份。请求按 (flow_id, packet_id) 索引，按插入顺序遍历。
//! 周期性 `sweep` 严格分三步：全部倒计时 → 对到期的请求重试 → 清除失效请求，
//! 这样本次到期的请求在同一次 sweep 内就确定是重试还是清除。

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::config::GpsrpConfig;
use crate::error::{Error, Result};
use crate::net::{FlowId, PortId};
use crate::sim::SimTime;

use super::request::{BackwardPath, RetransmissionRequest};

/// `sweep` 产生的一次重试：向 `target` 再次请求 (flow_id, packet_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsrpRetry {
    pub flow_id: FlowId,
    pub packet_id: u32,
    pub outgoing_port: PortId,
    pub target: Ipv4Addr,
}

#[derive(Debug)]
pub struct RetransmissionMatrix {
    cfg: GpsrpConfig,
    next_order: u64,
    /// insertion_order -> 请求
    entries: BTreeMap<u64, RetransmissionRequest>,
    /// (flow_id, packet_id) -> insertion_order
    index: HashMap<(FlowId, u32), u64>,
}

impl RetransmissionMatrix {
    pub fn new(cfg: GpsrpConfig) -> Self {
        Self {
            cfg,
            next_order: 0,
            entries: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GpsrpConfig {
        &self.cfg
    }

    /// 登记一个新请求。同一个 packet 已有仍有效的请求时返回 `DuplicateRequest`；
    /// 已失效的旧请求会被替换。
    pub fn register(
        &mut self,
        flow_id: FlowId,
        packet_id: u32,
        outgoing_port: PortId,
        backward_path: BackwardPath,
    ) -> Result<&mut RetransmissionRequest> {
        if let Some(&order) = self.index.get(&(flow_id, packet_id)) {
            let purgeable = self.entries.get(&order).is_none_or(|e| e.is_purgeable());
            if !purgeable {
                return Err(Error::DuplicateRequest { flow_id, packet_id });
            }
            self.entries.remove(&order);
        }

        let order = self.next_order;
        self.next_order += 1;
        let req = RetransmissionRequest::new(
            order,
            flow_id,
            packet_id,
            outgoing_port,
            backward_path,
            &self.cfg,
        );
        debug!(flow_id, packet_id, order, path_len = req.backward_path().len(), "登记重传请求");
        self.index.insert((flow_id, packet_id), order);
        Ok(self.entries.entry(order).or_insert(req))
    }

    pub fn lookup(&self, flow_id: FlowId, packet_id: u32) -> Option<&RetransmissionRequest> {
        let order = self.index.get(&(flow_id, packet_id))?;
        self.entries.get(order)
    }

    pub fn lookup_mut(
        &mut self,
        flow_id: FlowId,
        packet_id: u32,
    ) -> Option<&mut RetransmissionRequest> {
        let order = self.index.get(&(flow_id, packet_id))?;
        self.entries.get_mut(order)
    }

    /// 直接删除（例如请求的 packet 已经到达）
    pub fn remove(&mut self, flow_id: FlowId, packet_id: u32) -> Option<RetransmissionRequest> {
        let order = self.index.remove(&(flow_id, packet_id))?;
        self.entries.remove(&order)
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &RetransmissionRequest> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有请求倒计时
    pub fn tick_all(&mut self, elapsed: SimTime) {
        for req in self.entries.values_mut() {
            req.tick(elapsed);
        }
    }

    /// 清除所有失效请求，返回清除的数量
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        let index = &mut self.index;
        self.entries.retain(|_, req| {
            if req.is_purgeable() {
                trace!(flow_id = req.flow_id(), packet_id = req.packet_id(), "清除重传请求");
                index.remove(&(req.flow_id(), req.packet_id()));
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    /// 周期性处理：倒计时、对到期请求取下一个上游节点并重新计时、清除失效请求。
    ///
    /// 返回本次需要重新发出的请求，按插入顺序。
    pub fn sweep(&mut self, elapsed: SimTime) -> Vec<GpsrpRetry> {
        self.tick_all(elapsed);

        let mut retries = Vec::new();
        for req in self.entries.values_mut() {
            if !req.is_retryable() {
                continue;
            }
            if let Some(target) = req.pop_next_crossed_node() {
                req.reset_after_expiry();
                retries.push(GpsrpRetry {
                    flow_id: req.flow_id(),
                    packet_id: req.packet_id(),
                    outgoing_port: req.outgoing_port(),
                    target,
                });
            }
        }

        let purged = self.purge();
        if !retries.is_empty() || purged > 0 {
            debug!(retries = retries.len(), purged, remaining = self.entries.len(), "重传矩阵 sweep");
        }
        retries
    }

    /// 清空；插入序号继续递增
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
