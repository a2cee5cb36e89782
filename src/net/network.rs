//! 网络拓扑管理
//!
//! 持有节点与链路，负责跨节点交接：节点输出的 `Transmit` 在这里变成
//! 链路传输和对端的 `DeliverPacket` 事件。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::deliver_packet::DeliverPacket;
use super::id::{LinkId, NodeId, PortId};
use super::label::LabelAllocator;
use super::link::{Link, LinkBinding, LinkEnd};
use super::node::{MplsNode, NodeAction};
use super::packet::{Packet, PacketIdAllocator};
use super::routing::RoutingTable;
use super::stats::Stats;
use super::switching::{LabelOp, SwitchEntry};
use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, info, trace, warn};

pub struct Network {
    cfg: SimConfig,
    nodes: Vec<MplsNode>,
    links: Vec<Link>,
    by_address: HashMap<Ipv4Addr, NodeId>,
    routing: RoutingTable,
    ids: PacketIdAllocator,
    labels: LabelAllocator,
    pub stats: Stats,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Network {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            nodes: Vec::new(),
            links: Vec::new(),
            by_address: HashMap::new(),
            routing: RoutingTable::new(),
            ids: PacketIdAllocator::default(),
            labels: LabelAllocator::default(),
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    /// 添加节点；`active` 节点参与 GPSRP
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        address: Ipv4Addr,
        active: bool,
        num_ports: usize,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(MplsNode::new(id, name, address, active, num_ports, &self.cfg));
        self.by_address.insert(address, id);
        self.routing.mark_dirty();
        id
    }

    pub fn node(&self, id: NodeId) -> &MplsNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MplsNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MplsNode> {
        self.nodes.iter()
    }

    pub fn node_by_address(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.by_address.get(&addr).copied()
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// 用两端各自第一个空闲端口连接两个节点（全双工）
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> Result<LinkId> {
        let free_port = |node: &MplsNode| {
            node.ports().first_available_port().ok_or_else(|| {
                Error::Config(format!("node {} has no free port", node.name()))
            })
        };
        let pa = free_port(&self.nodes[a.0])?;
        let pb = free_port(&self.nodes[b.0])?;
        let id = LinkId(self.links.len());
        let addr_a = self.nodes[a.0].address();
        let addr_b = self.nodes[b.0].address();

        self.nodes[a.0].ports_mut().connect_link(
            pa,
            LinkBinding {
                link: id,
                peer: b,
                peer_port: pb,
                peer_address: addr_b,
            },
        )?;
        self.nodes[b.0].ports_mut().connect_link(
            pb,
            LinkBinding {
                link: id,
                peer: a,
                peer_port: pa,
                peer_address: addr_a,
            },
        )?;
        self.links.push(Link::new(
            id,
            LinkEnd { node: a, port: pa },
            LinkEnd { node: b, port: pb },
            latency,
            bandwidth_bps,
        ));
        self.routing.mark_dirty();
        debug!(link = %id, a = %a, b = %b, "🔗 连接链路");
        Ok(id)
    }

    /// `node` 上直连 `peer` 的端口
    pub fn port_towards(&self, node: NodeId, peer: NodeId) -> Result<PortId> {
        self.nodes[node.0]
            .ports()
            .ports()
            .find(|p| p.link().is_some_and(|l| l.peer == peer))
            .map(|p| p.id())
            .ok_or_else(|| Error::Config(format!("{node} is not adjacent to {peer}")))
    }

    /// 沿 `path` 建立一条 LSP：入口按 FEC 压标签，中间交换，出口弹出后交付。
    /// 返回每一跳使用的标签。
    pub fn install_lsp(&mut self, path: &[NodeId]) -> Result<Vec<u32>> {
        if path.len() < 2 {
            return Err(Error::Config("an LSP needs at least two nodes".into()));
        }
        let labels = (0..path.len() - 1)
            .map(|_| self.labels.next_label())
            .collect::<Result<Vec<u32>>>()?;
        let last = path.len() - 1;
        let target = self.nodes[path[last].0].address();

        let out_port = self.port_towards(path[0], path[1])?;
        self.nodes[path[0].0]
            .switching_mut()
            .add_fec(target, out_port, labels[0]);

        for i in 1..last {
            let in_port = self.port_towards(path[i], path[i - 1])?;
            let out_port = self.port_towards(path[i], path[i + 1])?;
            self.nodes[path[i].0].switching_mut().add_label_binding(
                in_port,
                labels[i - 1],
                SwitchEntry {
                    out_port: Some(out_port),
                    op: LabelOp::Swap(labels[i]),
                },
            );
        }

        let in_port = self.port_towards(path[last], path[last - 1])?;
        self.nodes[path[last].0].switching_mut().add_label_binding(
            in_port,
            labels[last - 1],
            SwitchEntry {
                out_port: None,
                op: LabelOp::Pop,
            },
        );
        info!(hops = last, labels = ?labels, "建立 LSP");
        Ok(labels)
    }

    /// 为控制报文计算逐跳路由并写入各节点
    pub fn build_routes(&mut self) -> Result<()> {
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for link in &self.links {
            let [a, b] = link.ends;
            adj[a.node.0].push(b.node);
            adj[b.node.0].push(a.node);
        }
        self.routing.ensure_built(&adj);

        for from in 0..self.nodes.len() {
            for dst in 0..self.nodes.len() {
                let Some(nh) = self.routing.next_hop(NodeId(from), NodeId(dst)) else {
                    continue;
                };
                let port = self.port_towards(NodeId(from), nh)?;
                let addr = self.nodes[dst].address();
                self.nodes[from].set_route(addr, port);
            }
        }
        Ok(())
    }

    pub fn next_packet_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    /// 创建一个从 `from` 发往 `to` 的 IPv4 数据包
    pub fn make_packet(
        &mut self,
        from: NodeId,
        to: NodeId,
        data_bytes: u32,
        gos_level: u8,
        local_unique_id: u32,
    ) -> Packet {
        let id = self.ids.next_id();
        let origin = self.nodes[from.0].address();
        let target = self.nodes[to.0].address();
        Packet::new_ipv4(id, origin, target, data_bytes).with_gos(gos_level, local_unique_id)
    }

    /// 节点本地产生的流量
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id()))]
    pub fn inject(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        self.stats.injected_pkts += 1;
        let mut out = Vec::new();
        self.nodes[at.0].originate(pkt, &mut out);
        self.apply_actions(at, out, sim);
    }

    /// 链路把 packet 送到节点端口
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id()))]
    pub fn deliver(&mut self, to: NodeId, port: PortId, pkt: Packet, sim: &mut Simulator) {
        debug!("📬 数据包到达节点端口");
        let mut out = Vec::new();
        self.nodes[to.0].receive(port, pkt, &mut self.ids, &mut out);
        self.apply_actions(to, out, sim);
    }

    /// 所有节点执行一个 tick
    pub fn tick_nodes(&mut self, elapsed: SimTime, sim: &mut Simulator) {
        for i in 0..self.nodes.len() {
            let mut out = Vec::new();
            self.nodes[i].on_tick(elapsed, &mut self.ids, &mut out);
            self.apply_actions(NodeId(i), out, sim);
        }
    }

    /// 没有排队的 packet 也没有未完成的重传请求
    pub fn is_idle(&self) -> bool {
        self.nodes
            .iter()
            .all(|n| !n.ports().has_waiting_packets() && n.matrix().is_empty())
    }

    fn apply_actions(&mut self, from: NodeId, actions: Vec<NodeAction>, sim: &mut Simulator) {
        for action in actions {
            match action {
                NodeAction::Transmit { port, pkt } => self.transmit(from, port, pkt, sim),
                NodeAction::Deliver(pkt) => {
                    self.stats.delivered_pkts += 1;
                    self.stats.delivered_bytes += pkt.size() as u64;
                    info!(pkt_id = pkt.id(), node = %from, "✅ 数据包送达目的地");
                }
                NodeAction::Dropped(pkt) => {
                    self.stats.dropped_pkts += 1;
                    debug!(pkt_id = pkt.id(), node = %from, "拥塞丢包");
                }
                NodeAction::Discard { pkt, reason } => {
                    self.stats.discarded_pkts += 1;
                    debug!(pkt_id = pkt.id(), node = %from, ?reason, "数据包被丢弃");
                }
            }
        }
    }

    fn transmit(&mut self, from: NodeId, port: PortId, pkt: Packet, sim: &mut Simulator) {
        let binding = self.nodes[from.0]
            .ports()
            .port(port)
            .ok()
            .and_then(|p| p.link().copied());
        let Some(binding) = binding else {
            warn!(node = %from, port = %port, pkt_id = pkt.id(), "端口没有连接链路，丢弃");
            self.stats.discarded_pkts += 1;
            return;
        };

        let now = sim.now();
        let link = &mut self.links[binding.link.0];
        let Some((end, arrive)) = link.transmit(from, pkt.size(), now) else {
            warn!(link = %binding.link, node = %from, "链路两端不包含发送节点");
            self.stats.discarded_pkts += 1;
            return;
        };
        trace!(link = %binding.link, now = ?now, arrive = ?arrive, to = %end.node, "调度数据包到达事件");
        sim.schedule(
            arrive,
            DeliverPacket {
                to: end.node,
                port: end.port,
                pkt,
            },
        );
    }
}
