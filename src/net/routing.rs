//! 控制报文的逐跳路由
//!
//! GPSRP 请求/应答、ICMP 等不走 LSP，需要按 IP 目的地址逐跳转发。
//! 这里按最短跳数预计算 (from, dst) 的下一跳；多个等价下一跳时取编号最小的，
//! 保证仿真结果可复现。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    dirty: bool,
    /// (from, dst) -> 所有等价最短路径的下一跳（升序）
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            dirty: true,
            next_hops: HashMap::new(),
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 按邻接表重建。`adj[from]` 为 `from` 的所有邻居（链路全双工，邻接关系对称）。
    pub fn ensure_built(&mut self, adj: &[Vec<NodeId>]) {
        if !self.dirty {
            return;
        }

        let n = adj.len();
        self.next_hops.clear();

        // 对每个 dst 做 BFS 得到跳数 dist[*]，
        // 再为每个 from 选出满足 dist[next] = dist[from] - 1 的邻居。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();
            dist[dst_idx] = 0;
            q.push_back(NodeId(dst_idx));

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &nb in &adj[v.0] {
                    if dist[nb.0] == u32::MAX {
                        dist[nb.0] = dv.saturating_add(1);
                        q.push_back(nb);
                    }
                }
            }

            for from_idx in 0..n {
                let df = dist[from_idx];
                if from_idx == dst_idx || df == u32::MAX {
                    continue;
                }
                let mut cands: Vec<NodeId> = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .collect();
                cands.sort();
                cands.dedup();
                if !cands.is_empty() {
                    self.next_hops.insert((NodeId(from_idx), NodeId(dst_idx)), cands);
                }
            }
        }

        self.dirty = false;
    }

    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 确定性的下一跳（编号最小的候选）
    pub fn next_hop(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.next_hops(from, dst).and_then(|c| c.first().copied())
    }
}
