use crate::config::SimConfig;
use crate::net::{
    gos, DiscardReason, GpsrpKind, GpsrpMessage, Label, LabelOp, LinkBinding, LinkId, MplsNode,
    NodeAction, NodeId, Packet, PacketIdAllocator, PacketKind, PortId, SwitchEntry,
};
use crate::sim::SimTime;
use std::net::Ipv4Addr;

const ORIGIN: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const UPSTREAM: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
const SELF_ADDR: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);
const DOWNSTREAM: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 4);
const TARGET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);

const TICK: SimTime = SimTime(1_000);

/// 端口 0 接上游，端口 1 接下游
fn lsr(active: bool) -> MplsNode {
    let mut node = MplsNode::new(NodeId(1), "lsr", SELF_ADDR, active, 2, &SimConfig::default());
    let bind = |peer: usize, addr: Ipv4Addr| LinkBinding {
        link: LinkId(peer),
        peer: NodeId(peer),
        peer_port: PortId(0),
        peer_address: addr,
    };
    node.ports_mut().connect_link(PortId(0), bind(0, UPSTREAM)).unwrap();
    node.ports_mut().connect_link(PortId(1), bind(2, DOWNSTREAM)).unwrap();
    node
}

fn labeled(id: u64, label: u32, local_id: u32) -> Packet {
    let mut pkt = Packet::new_ipv4(id, ORIGIN, TARGET, 500)
        .with_gos(gos::LEVEL1, local_id)
        .into_mpls();
    pkt.labels_mut().unwrap().push(Label::new(0, label));
    pkt
}

fn transmits(out: &[NodeAction]) -> Vec<(PortId, &Packet)> {
    out.iter()
        .filter_map(|a| match a {
            NodeAction::Transmit { port, pkt } => Some((*port, pkt)),
            _ => None,
        })
        .collect()
}

fn gpsrp_sent(out: &[NodeAction]) -> Vec<(PortId, Ipv4Addr, GpsrpMessage)> {
    transmits(out)
        .into_iter()
        .filter_map(|(port, pkt)| pkt.gpsrp().map(|m| (port, pkt.target(), *m)))
        .collect()
}

fn tick(node: &mut MplsNode, ids: &mut PacketIdAllocator) -> Vec<NodeAction> {
    let mut out = Vec::new();
    node.on_tick(TICK, ids, &mut out);
    out
}

#[test]
fn ingress_pushes_label_from_fec() {
    let mut node = lsr(false);
    node.switching_mut().add_fec(TARGET, PortId(1), 100);

    let mut out = Vec::new();
    let pkt = Packet::new_ipv4(1, ORIGIN, TARGET, 500).with_gos(gos::LEVEL2, 1);
    node.originate(pkt, &mut out);

    let sent = transmits(&out);
    assert_eq!(sent.len(), 1);
    let (port, pkt) = sent[0];
    assert_eq!(port, PortId(1));
    assert_eq!(pkt.kind(), PacketKind::Mpls);
    let top = pkt.labels().and_then(|s| s.top()).copied().expect("label");
    assert_eq!(top.value, 100);
    assert_eq!(top.exp, gos::LEVEL2);
    assert!(top.bos);
}

#[test]
fn lsr_swaps_label_and_records_itself_when_active() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(true);
    node.switching_mut().add_label_binding(
        PortId(0),
        100,
        SwitchEntry {
            out_port: Some(PortId(1)),
            op: LabelOp::Swap(200),
        },
    );

    let mut out = Vec::new();
    node.receive(PortId(0), labeled(1, 100, 5), &mut ids, &mut out);
    assert!(out.is_empty());
    assert_eq!(node.ports().queued_packets(), 1);

    let out = tick(&mut node, &mut ids);
    let sent = transmits(&out);
    assert_eq!(sent.len(), 1);
    let (port, pkt) = sent[0];
    assert_eq!(port, PortId(1));
    let top = pkt.labels().and_then(|s| s.top()).copied().expect("label");
    assert_eq!(top.value, 200);
    assert_eq!(top.ttl, 254);
    assert_eq!(pkt.options().crossed_active_nodes(), &[SELF_ADDR]);

    // 副本与发出的 packet 一致
    let entry = node.dmgp().lookup(u32::from(ORIGIN), 5).expect("dmgp copy");
    assert_eq!(entry.port, PortId(1));
    assert_eq!(&entry.packet, pkt);
    assert_eq!(node.stats.switched_pkts, 1);
}

#[test]
fn passive_lsr_keeps_no_copies() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(false);
    node.switching_mut().add_label_binding(
        PortId(0),
        100,
        SwitchEntry {
            out_port: Some(PortId(1)),
            op: LabelOp::Swap(200),
        },
    );
    let mut out = Vec::new();
    node.receive(PortId(0), labeled(1, 100, 5), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);

    let (_, pkt) = transmits(&out)[0];
    assert!(pkt.options().crossed_active_nodes().is_empty());
    assert!(node.dmgp().is_empty());
}

#[test]
fn egress_pops_last_label_and_delivers() {
    let mut ids = PacketIdAllocator::default();
    let mut node = MplsNode::new(NodeId(1), "ler", TARGET, false, 1, &SimConfig::default());
    node.switching_mut().add_label_binding(
        PortId(0),
        300,
        SwitchEntry {
            out_port: None,
            op: LabelOp::Pop,
        },
    );

    let mut out = Vec::new();
    node.receive(PortId(0), labeled(1, 300, 5), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);

    assert_eq!(out.len(), 1);
    match &out[0] {
        NodeAction::Deliver(pkt) => {
            assert_eq!(pkt.kind(), PacketKind::Ipv4);
            assert_eq!(pkt.id(), 1);
        }
        other => panic!("expected delivery, got {other:?}"),
    }
    assert_eq!(node.stats.delivered_pkts, 1);
}

#[test]
fn unknown_label_is_discarded() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(false);
    let mut out = Vec::new();
    node.receive(PortId(0), labeled(1, 999, 5), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);

    assert!(matches!(
        out.as_slice(),
        [NodeAction::Discard {
            reason: DiscardReason::NoLabelBinding,
            ..
        }]
    ));
    assert_eq!(node.stats.discarded_pkts, 1);
}

#[test]
fn switching_capacity_limits_packets_per_tick() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(false);
    node.set_switching_octets_per_tick(1_000);
    node.switching_mut().add_label_binding(
        PortId(0),
        100,
        SwitchEntry {
            out_port: Some(PortId(1)),
            op: LabelOp::Swap(200),
        },
    );

    let mut out = Vec::new();
    for i in 0..3 {
        node.receive(PortId(0), labeled(i, 100, i as u32), &mut ids, &mut out);
    }
    let size = labeled(0, 100, 0).size() as u64;
    assert!(size <= 1_000 && 2 * size > 1_000);

    assert_eq!(transmits(&tick(&mut node, &mut ids)).len(), 1);
    assert_eq!(transmits(&tick(&mut node, &mut ids)).len(), 2);
    assert!(!node.ports().has_waiting_packets());
}

#[test]
fn congestion_drop_requests_retransmission_from_nearest_active_node() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(true);
    node.ports_mut().set_port_capacity(PortId(0), 100).unwrap();

    let far = Ipv4Addr::new(10, 0, 0, 7);
    let mut pkt = labeled(1, 100, 42);
    pkt.options_mut().record_crossed_active_node(far);
    pkt.options_mut().record_crossed_active_node(UPSTREAM);

    let mut out = Vec::new();
    node.receive(PortId(0), pkt.clone(), &mut ids, &mut out);

    assert!(out.iter().any(|a| matches!(a, NodeAction::Dropped(p) if p.id() == 1)));
    let requests = gpsrp_sent(&out);
    assert_eq!(
        requests,
        vec![(
            PortId(0),
            UPSTREAM,
            GpsrpMessage {
                kind: GpsrpKind::Request,
                flow_id: u32::from(ORIGIN),
                packet_id: 42,
            }
        )]
    );
    assert_eq!(node.stats.congestion_drops, 1);
    assert_eq!(node.stats.gpsrp_requests, 1);
    let req = node.matrix().lookup(u32::from(ORIGIN), 42).expect("request");
    assert_eq!(req.backward_path().front(), Some(far));

    // 同一个 packet 再次被丢：请求已在进行中
    let mut out = Vec::new();
    node.receive(PortId(0), pkt, &mut ids, &mut out);
    assert!(gpsrp_sent(&out).is_empty());
    assert_eq!(node.stats.gpsrp_duplicates, 1);
}

#[test]
fn unprotected_or_passive_drops_do_not_request() {
    let mut ids = PacketIdAllocator::default();

    let mut passive = lsr(false);
    passive.ports_mut().set_port_capacity(PortId(0), 100).unwrap();
    let mut pkt = labeled(1, 100, 1);
    pkt.options_mut().record_crossed_active_node(UPSTREAM);
    let mut out = Vec::new();
    passive.receive(PortId(0), pkt, &mut ids, &mut out);
    assert!(gpsrp_sent(&out).is_empty());
    assert!(passive.matrix().is_empty());

    let mut active = lsr(true);
    active.ports_mut().set_port_capacity(PortId(0), 100).unwrap();
    let mut pkt = Packet::new_ipv4(2, ORIGIN, TARGET, 500).into_mpls();
    pkt.labels_mut().unwrap().push(Label::new(0, 100));
    let mut out = Vec::new();
    active.receive(PortId(0), pkt, &mut ids, &mut out);
    assert!(gpsrp_sent(&out).is_empty());
    assert_eq!(active.stats.congestion_drops, 1);
}

#[test]
fn request_is_answered_from_dmgp_or_denied() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(true);
    node.switching_mut().add_label_binding(
        PortId(0),
        100,
        SwitchEntry {
            out_port: Some(PortId(1)),
            op: LabelOp::Swap(200),
        },
    );
    let mut out = Vec::new();
    node.receive(PortId(0), labeled(1, 100, 5), &mut ids, &mut out);
    tick(&mut node, &mut ids);

    let request = |id: u64, packet_id: u32| {
        Packet::new_gpsrp(
            id,
            DOWNSTREAM,
            SELF_ADDR,
            GpsrpMessage {
                kind: GpsrpKind::Request,
                flow_id: u32::from(ORIGIN),
                packet_id,
            },
        )
    };

    let mut out = Vec::new();
    node.receive(PortId(1), request(100, 5), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);
    let sent = transmits(&out);
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|(port, p)| *port == PortId(1) && p.id() == 1));
    let acks = gpsrp_sent(&out);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].1, DOWNSTREAM);
    assert_eq!(acks[0].2.kind, GpsrpKind::Acknowledge);
    assert_eq!(node.stats.gpsrp_resent, 1);

    let mut out = Vec::new();
    node.receive(PortId(1), request(101, 6), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);
    let denies = gpsrp_sent(&out);
    assert_eq!(denies.len(), 1);
    assert_eq!(denies[0].2.kind, GpsrpKind::Deny);
    assert_eq!(node.stats.gpsrp_denied, 1);
}

#[test]
fn deny_moves_on_to_the_next_active_node() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(true);
    node.ports_mut().set_port_capacity(PortId(0), 100).unwrap();
    let far = Ipv4Addr::new(10, 0, 0, 7);
    node.set_route(far, PortId(0));

    let mut pkt = labeled(1, 100, 42);
    pkt.options_mut().record_crossed_active_node(far);
    pkt.options_mut().record_crossed_active_node(UPSTREAM);
    let mut out = Vec::new();
    node.receive(PortId(0), pkt, &mut ids, &mut out);
    node.ports_mut().set_port_capacity(PortId(0), 1_000_000).unwrap();

    let deny = |id: u64, from: Ipv4Addr| {
        Packet::new_gpsrp(
            id,
            from,
            SELF_ADDR,
            GpsrpMessage {
                kind: GpsrpKind::Deny,
                flow_id: u32::from(ORIGIN),
                packet_id: 42,
            },
        )
    };

    let mut out = Vec::new();
    node.receive(PortId(0), deny(100, UPSTREAM), &mut ids, &mut out);
    let out = tick(&mut node, &mut ids);
    let requests = gpsrp_sent(&out);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, far);
    assert_eq!(requests[0].2.kind, GpsrpKind::Request);
    // 路径已用完，sweep 清除了请求
    assert!(node.matrix().is_empty());

    // 没有对应请求的 Deny 被忽略
    let mut out = Vec::new();
    node.receive(PortId(0), deny(101, far), &mut ids, &mut out);
    assert!(gpsrp_sent(&tick(&mut node, &mut ids)).is_empty());
}

#[test]
fn reset_clears_runtime_state() {
    let mut ids = PacketIdAllocator::default();
    let mut node = lsr(true);
    node.ports_mut().set_port_capacity(PortId(0), 100).unwrap();
    let mut pkt = labeled(1, 100, 42);
    pkt.options_mut().record_crossed_active_node(Ipv4Addr::new(10, 0, 0, 7));
    pkt.options_mut().record_crossed_active_node(UPSTREAM);
    let mut out = Vec::new();
    node.receive(PortId(0), pkt, &mut ids, &mut out);
    assert!(!node.matrix().is_empty());

    node.reset();
    assert!(node.matrix().is_empty());
    assert!(node.dmgp().is_empty());
    assert_eq!(node.ports().port_connected_to(UPSTREAM), Some(PortId(0)));
}

#[test]
fn packet_on_unknown_port_is_discarded_and_counted() {
    let mut node = lsr(true);
    let mut ids = PacketIdAllocator::default();
    let mut out = Vec::new();

    node.receive(PortId(9), labeled(5, 100, 1), &mut ids, &mut out);

    assert_eq!(out.len(), 1);
    assert!(matches!(
        &out[0],
        NodeAction::Discard { pkt, reason: DiscardReason::InvalidPort } if pkt.id() == 5
    ));
    assert_eq!(node.stats.received_pkts, 1);
    assert_eq!(node.stats.discarded_pkts, 1);
    assert_eq!(node.stats.congestion_drops, 0);
    assert!(!node.ports().has_waiting_packets());
}
