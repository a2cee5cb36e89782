//! MPLS 节点
//!
//! 节点拥有自己的 PortSet、重传矩阵和 DMGP，只在自己的事件处理里修改它们。
//! 节点不直接访问网络：所有输出（发往链路、本地交付、丢弃）都以 `NodeAction`
//! 返回，由 `Network` 负责跨节点的交接。
//!
//! 每个 tick 先服务 PortSet，再 sweep 重传矩阵，本 tick 发现的丢包在 sweep 前已经登记。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, info, trace, warn};

use super::id::{NodeId, PortId};
use super::label::Label;
use super::packet::{GpsrpKind, GpsrpMessage, Packet, PacketIdAllocator, PacketKind};
use super::stats::NodeStats;
use super::switching::{LabelOp, SwitchingTable};
use crate::config::SimConfig;
use crate::error::Error;
use crate::gpsrp::{BackwardPath, Dmgp, RetransmissionMatrix};
use crate::port::PortSet;
use crate::sim::SimTime;

/// packet 被节点丢弃（非拥塞）的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NoLabelBinding,
    TtlExpired,
    NoRoute,
    /// 链路把 packet 送到了不存在的端口
    InvalidPort,
}

/// 节点处理 packet 的结果
#[derive(Debug)]
pub enum NodeAction {
    /// 从本地端口发往链路
    Transmit { port: PortId, pkt: Packet },
    /// 到达目的地
    Deliver(Packet),
    /// 入口缓冲区拥塞丢包
    Dropped(Packet),
    Discard { pkt: Packet, reason: DiscardReason },
}

#[derive(Debug)]
pub struct MplsNode {
    id: NodeId,
    name: String,
    address: Ipv4Addr,
    /// 活动节点参与 GPSRP：记录经过、保存副本、请求重传
    active: bool,
    ports: PortSet,
    matrix: RetransmissionMatrix,
    dmgp: Dmgp,
    switching: SwitchingTable,
    /// 控制报文的下一跳端口
    routes: HashMap<Ipv4Addr, PortId>,
    switching_octets_per_tick: u32,
    available_octets: u64,
    next_label_id: u32,
    pub stats: NodeStats,
}

impl MplsNode {
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        address: Ipv4Addr,
        active: bool,
        num_ports: usize,
        cfg: &SimConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            active,
            ports: PortSet::from_config(num_ports, &cfg.buffer),
            matrix: RetransmissionMatrix::new(cfg.gpsrp),
            dmgp: Dmgp::with_size_kb(cfg.buffer.dmgp_size_kb),
            switching: SwitchingTable::default(),
            routes: HashMap::new(),
            switching_octets_per_tick: cfg.buffer.switching_octets_per_tick,
            available_octets: 0,
            next_label_id: 0,
            stats: NodeStats::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortSet {
        &mut self.ports
    }

    pub fn matrix(&self) -> &RetransmissionMatrix {
        &self.matrix
    }

    pub fn dmgp(&self) -> &Dmgp {
        &self.dmgp
    }

    pub fn switching(&self) -> &SwitchingTable {
        &self.switching
    }

    pub fn switching_mut(&mut self) -> &mut SwitchingTable {
        &mut self.switching
    }

    pub fn set_route(&mut self, target: Ipv4Addr, port: PortId) {
        self.routes.insert(target, port);
    }

    pub fn set_switching_octets_per_tick(&mut self, octets: u32) {
        self.switching_octets_per_tick = octets;
    }

    /// 发往 `target` 的控制报文走哪个端口：直连优先，其次查路由
    pub fn route_port(&self, target: Ipv4Addr) -> Option<PortId> {
        self.ports
            .port_connected_to(target)
            .or_else(|| self.routes.get(&target).copied())
    }

    /// 清空缓冲、重传请求和 DMGP；拓扑与交换表保留
    pub fn reset(&mut self) {
        self.ports.reset();
        self.matrix.reset();
        self.dmgp.reset();
        self.available_octets = 0;
    }

    /// 链路送来的 packet 进入入口端口缓冲
    #[tracing::instrument(skip(self, pkt, ids, out), fields(node_name = %self.name, in_port = %port, pkt_id = pkt.id(), flow_id = pkt.flow_id()))]
    pub fn receive(
        &mut self,
        port: PortId,
        pkt: Packet,
        ids: &mut PacketIdAllocator,
        out: &mut Vec<NodeAction>,
    ) {
        self.stats.received_pkts += 1;
        if let Err(e) = self.ports.port(port) {
            warn!(error = %e, "入口端口无效");
            return self.discard(pkt, DiscardReason::InvalidPort, out);
        }
        match self.ports.enqueue(port, pkt) {
            Ok(()) => {}
            Err(Error::CongestionDrop { packet, .. }) => {
                self.on_congestion_drop(port, *packet, ids, out);
            }
            Err(e) => warn!(error = %e, "入队失败"),
        }
    }

    /// 本地产生的流量，不经过入口缓冲直接交换
    #[tracing::instrument(skip(self, pkt, out), fields(node_name = %self.name, pkt_id = pkt.id(), flow_id = pkt.flow_id()))]
    pub fn originate(&mut self, pkt: Packet, out: &mut Vec<NodeAction>) {
        debug!("📦 本地产生数据包");
        match pkt.kind() {
            PacketKind::Mpls => self.forward_by_address(pkt, out),
            _ => self.switch_unlabeled(pkt, out),
        }
    }

    /// 一个 tick：先按交换能力服务端口，再推进重传矩阵
    #[tracing::instrument(skip(self, ids, out), fields(node_name = %self.name))]
    pub fn on_tick(&mut self, elapsed: SimTime, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        self.service_ports(ids, out);

        for retry in self.matrix.sweep(elapsed) {
            self.stats.gpsrp_retries += 1;
            debug!(flow_id = retry.flow_id, packet_id = retry.packet_id, target = %retry.target, "🔁 重试重传请求");
            self.send_gpsrp(
                GpsrpKind::Request,
                retry.flow_id,
                retry.packet_id,
                retry.target,
                Some(retry.outgoing_port),
                ids,
                out,
            );
        }
    }

    fn service_ports(&mut self, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        if !self.ports.has_waiting_packets() {
            // 空闲时不积攒交换能力
            self.available_octets = 0;
            return;
        }
        self.available_octets = self
            .available_octets
            .saturating_add(self.switching_octets_per_tick as u64);

        loop {
            let budget = self.available_octets.min(u32::MAX as u64) as u32;
            if !self.ports.can_switch_packet(budget) {
                break;
            }
            let Some((port, pkt)) = self.ports.next_packet() else {
                break;
            };
            self.available_octets = self.available_octets.saturating_sub(pkt.size() as u64);
            self.switch(port, pkt, ids, out);
        }

        if !self.ports.has_waiting_packets() {
            self.available_octets = 0;
        }
    }

    fn switch(&mut self, in_port: PortId, pkt: Packet, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        self.stats.switched_pkts += 1;
        trace!(port = %in_port, pkt_id = pkt.id(), kind = ?pkt.kind(), "交换数据包");
        match pkt.kind() {
            PacketKind::Mpls => self.switch_mpls(in_port, pkt, ids, out),
            PacketKind::Gpsrp if pkt.target() == self.address => {
                self.handle_gpsrp(in_port, pkt, ids, out)
            }
            _ => self.switch_unlabeled(pkt, out),
        }
    }

    /// 无标签的 packet：到达目的地则交付；入口 LER 按 FEC 压标签；否则按地址转发。
    fn switch_unlabeled(&mut self, pkt: Packet, out: &mut Vec<NodeAction>) {
        if pkt.target() == self.address {
            self.deliver_local(pkt, out);
            return;
        }
        if pkt.kind() == PacketKind::Ipv4 {
            if let Some((out_port, value)) = self.switching.fec(pkt.target()) {
                let exp = pkt.gos_level();
                let label = Label::new(self.alloc_label_id(), value).with_exp(exp);
                let mut pkt = pkt.into_mpls();
                if let Some(stack) = pkt.labels_mut() {
                    stack.push(label);
                }
                trace!(label = value, port = %out_port, "入口压入标签");
                self.transmit_labeled(out_port, pkt, out);
                return;
            }
        }
        self.forward_by_address(pkt, out);
    }

    fn switch_mpls(&mut self, in_port: PortId, mut pkt: Packet, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        self.note_arrival(&pkt);

        let Some(top) = pkt.labels().and_then(|s| s.top()).map(|l| l.value) else {
            let pkt = pkt.strip_mpls();
            return self.switch_unlabeled(pkt, out);
        };
        let Some(entry) = self.switching.lookup(in_port, top) else {
            debug!(port = %in_port, label = top, "没有匹配的标签绑定");
            return self.discard(pkt, DiscardReason::NoLabelBinding, out);
        };

        match entry.op {
            LabelOp::Swap(value) => {
                let ttl = pkt.labels_mut().and_then(|stack| {
                    stack.swap_top(value);
                    stack.decrement_top_ttl()
                });
                if ttl == Some(0) {
                    return self.discard(pkt, DiscardReason::TtlExpired, out);
                }
                match entry.out_port {
                    Some(port) => self.transmit_labeled(port, pkt, out),
                    None => self.discard(pkt, DiscardReason::NoRoute, out),
                }
            }
            LabelOp::Push(value) => {
                let label_id = self.alloc_label_id();
                if let Some(stack) = pkt.labels_mut() {
                    let (exp, ttl) = stack.top().map_or((0, 0), |l| (l.exp, l.ttl));
                    stack.push(Label::new(label_id, value).with_exp(exp).with_ttl(ttl));
                }
                match entry.out_port {
                    Some(port) => self.transmit_labeled(port, pkt, out),
                    None => self.discard(pkt, DiscardReason::NoRoute, out),
                }
            }
            LabelOp::Pop => {
                let remaining = pkt.labels_mut().map_or(0, |stack| {
                    stack.pop();
                    stack.len()
                });
                match (remaining, entry.out_port) {
                    (0, Some(port)) => {
                        let pkt = pkt.strip_mpls();
                        out.push(NodeAction::Transmit { port, pkt });
                    }
                    (0, None) => {
                        let pkt = pkt.strip_mpls();
                        self.switch_unlabeled(pkt, out);
                    }
                    (_, Some(port)) => self.transmit_labeled(port, pkt, out),
                    // 内层标签仍属于本节点
                    (_, None) => self.switch_mpls(in_port, pkt, ids, out),
                }
            }
        }
    }

    /// 发出带标签的 packet。活动节点给受保护的 packet 记录经过并保存副本。
    fn transmit_labeled(&mut self, port: PortId, mut pkt: Packet, out: &mut Vec<NodeAction>) {
        if self.active && pkt.is_gos_protected() {
            let addr = self.address;
            let opts = pkt.options_mut();
            if !opts.crossed_active_nodes().contains(&addr) && !opts.record_crossed_active_node(addr) {
                trace!("经过节点列表已满");
            }
            self.dmgp.store(port, &pkt);
        }
        out.push(NodeAction::Transmit { port, pkt });
    }

    fn forward_by_address(&mut self, mut pkt: Packet, out: &mut Vec<NodeAction>) {
        if pkt.target() == self.address {
            return self.deliver_local(pkt, out);
        }
        pkt.ipv4.ttl = pkt.ipv4.ttl.saturating_sub(1);
        if pkt.ipv4.ttl == 0 {
            return self.discard(pkt, DiscardReason::TtlExpired, out);
        }
        match self.route_port(pkt.target()) {
            Some(port) => out.push(NodeAction::Transmit { port, pkt }),
            None => self.discard(pkt, DiscardReason::NoRoute, out),
        }
    }

    fn deliver_local(&mut self, pkt: Packet, out: &mut Vec<NodeAction>) {
        self.note_arrival(&pkt);
        self.stats.delivered_pkts += 1;
        out.push(NodeAction::Deliver(pkt));
    }

    fn discard(&mut self, pkt: Packet, reason: DiscardReason, out: &mut Vec<NodeAction>) {
        debug!(pkt_id = pkt.id(), ?reason, "丢弃数据包");
        self.stats.discarded_pkts += 1;
        out.push(NodeAction::Discard { pkt, reason });
    }

    /// 等待重传的 packet 到达，撤销请求
    fn note_arrival(&mut self, pkt: &Packet) {
        if !pkt.is_gos_protected() {
            return;
        }
        if self.matrix.remove(pkt.flow_id(), pkt.local_unique_id()).is_some() {
            self.stats.gpsrp_recovered += 1;
            info!(flow_id = pkt.flow_id(), packet_id = pkt.local_unique_id(), "✅ 重传的数据包已到达");
        }
    }

    fn on_congestion_drop(&mut self, port: PortId, pkt: Packet, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        self.stats.congestion_drops += 1;
        if self.active && pkt.kind() == PacketKind::Mpls && pkt.is_gos_protected() {
            self.request_retransmission(port, &pkt, ids, out);
        }
        out.push(NodeAction::Dropped(pkt));
    }

    /// 登记重传请求并立即向最近的上游活动节点发出第一次请求
    fn request_retransmission(&mut self, port: PortId, pkt: &Packet, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        let path = BackwardPath::from_crossed_nodes(pkt.options().crossed_active_nodes(), self.address);
        if path.is_empty() {
            trace!("没有可询问的上游活动节点");
            return;
        }
        let flow_id = pkt.flow_id();
        let packet_id = pkt.local_unique_id();
        let target = match self.matrix.register(flow_id, packet_id, port, path) {
            Ok(req) => req.pop_next_crossed_node(),
            Err(Error::DuplicateRequest { .. }) => {
                self.stats.gpsrp_duplicates += 1;
                return;
            }
            Err(e) => {
                warn!(error = %e, "登记重传请求失败");
                return;
            }
        };
        if let Some(target) = target {
            self.stats.gpsrp_requests += 1;
            info!(flow_id, packet_id, target = %target, "📮 请求上游重传");
            self.send_gpsrp(GpsrpKind::Request, flow_id, packet_id, target, Some(port), ids, out);
        }
    }

    fn handle_gpsrp(&mut self, in_port: PortId, pkt: Packet, ids: &mut PacketIdAllocator, out: &mut Vec<NodeAction>) {
        let Some(msg) = pkt.gpsrp().copied() else {
            return;
        };
        let requester = pkt.origin();
        match msg.kind {
            GpsrpKind::Request => match self.dmgp.copy_for_resend(msg.flow_id, msg.packet_id) {
                Some((port, copy)) => {
                    self.stats.gpsrp_resent += 1;
                    debug!(flow_id = msg.flow_id, packet_id = msg.packet_id, port = %port, "从 DMGP 重发");
                    out.push(NodeAction::Transmit { port, pkt: copy });
                    self.send_gpsrp(GpsrpKind::Acknowledge, msg.flow_id, msg.packet_id, requester, Some(in_port), ids, out);
                }
                None => {
                    self.stats.gpsrp_denied += 1;
                    self.send_gpsrp(GpsrpKind::Deny, msg.flow_id, msg.packet_id, requester, Some(in_port), ids, out);
                }
            },
            GpsrpKind::Acknowledge => {
                trace!(flow_id = msg.flow_id, packet_id = msg.packet_id, "上游确认重发");
            }
            GpsrpKind::Deny => {
                // 上游没有副本：立即问下一个节点，没有就放弃
                let next = self.matrix.lookup_mut(msg.flow_id, msg.packet_id).map(|req| {
                    let next = req.pop_next_crossed_node();
                    if next.is_some() {
                        req.force_reset();
                    }
                    (next, req.outgoing_port())
                });
                match next {
                    Some((Some(target), port)) => {
                        self.stats.gpsrp_retries += 1;
                        self.send_gpsrp(GpsrpKind::Request, msg.flow_id, msg.packet_id, target, Some(port), ids, out);
                    }
                    Some((None, _)) => {
                        self.matrix.remove(msg.flow_id, msg.packet_id);
                    }
                    None => {}
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn send_gpsrp(
        &mut self,
        kind: GpsrpKind,
        flow_id: u32,
        packet_id: u32,
        target: Ipv4Addr,
        fallback_port: Option<PortId>,
        ids: &mut PacketIdAllocator,
        out: &mut Vec<NodeAction>,
    ) {
        let msg = GpsrpMessage {
            kind,
            flow_id,
            packet_id,
        };
        let pkt = Packet::new_gpsrp(ids.next_id(), self.address, target, msg);
        match self.route_port(target).or(fallback_port) {
            Some(port) => out.push(NodeAction::Transmit { port, pkt }),
            None => self.discard(pkt, DiscardReason::NoRoute, out),
        }
    }

    fn alloc_label_id(&mut self) -> u32 {
        let id = self.next_label_id;
        self.next_label_id = self.next_label_id.wrapping_add(1);
        id
    }
}
