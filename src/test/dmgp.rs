use crate::gpsrp::Dmgp;
use crate::net::{gos, Packet, PortId};
use std::net::Ipv4Addr;

const A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);

/// GoS 选项占 8 字节，总大小为 `size`
fn gos_pkt(id: u64, local_id: u32, size: u32) -> Packet {
    let pkt = Packet::new_ipv4(id, A, B, size - 48).with_gos(gos::LEVEL1, local_id);
    assert_eq!(pkt.size(), size);
    pkt
}

#[test]
fn dmgp_stores_and_resends_copies() {
    let mut dmgp = Dmgp::new(10_000);
    let pkt = gos_pkt(1, 7, 1000);
    assert!(dmgp.store(PortId(2), &pkt));
    assert_eq!(dmgp.used_bytes(), 1000);

    let (port, copy) = dmgp.copy_for_resend(u32::from(A), 7).expect("copy");
    assert_eq!(port, PortId(2));
    assert_eq!(copy, pkt);
    // 重发后副本仍保留
    assert_eq!(dmgp.len(), 1);
    assert!(dmgp.copy_for_resend(u32::from(A), 8).is_none());
}

#[test]
fn dmgp_evicts_oldest_copies_first() {
    let mut dmgp = Dmgp::new(2500);
    assert!(dmgp.store(PortId(0), &gos_pkt(1, 1, 1000)));
    assert!(dmgp.store(PortId(0), &gos_pkt(2, 2, 1000)));
    assert!(dmgp.store(PortId(0), &gos_pkt(3, 3, 1000)));

    assert_eq!(dmgp.len(), 2);
    assert!(dmgp.lookup(u32::from(A), 1).is_none());
    assert!(dmgp.lookup(u32::from(A), 2).is_some());
    assert!(dmgp.lookup(u32::from(A), 3).is_some());
    assert!(dmgp.used_bytes() <= dmgp.capacity_bytes());
}

#[test]
fn dmgp_replaces_same_packet_and_rejects_oversized() {
    let mut dmgp = Dmgp::with_size_kb(1);
    assert_eq!(dmgp.capacity_bytes(), 1024);

    assert!(dmgp.store(PortId(0), &gos_pkt(1, 1, 500)));
    assert!(dmgp.store(PortId(1), &gos_pkt(2, 1, 600)));
    assert_eq!(dmgp.len(), 1);
    assert_eq!(dmgp.used_bytes(), 600);
    assert_eq!(dmgp.lookup(u32::from(A), 1).map(|e| e.port), Some(PortId(1)));

    assert!(!dmgp.store(PortId(0), &gos_pkt(3, 2, 2000)));
    assert_eq!(dmgp.len(), 1);

    assert_eq!(dmgp.remove(u32::from(A), 1).map(|e| e.packet.id()), Some(2));
    assert!(dmgp.is_empty());
    assert_eq!(dmgp.used_bytes(), 0);

    dmgp.store(PortId(0), &gos_pkt(4, 3, 100));
    dmgp.reset();
    assert!(dmgp.is_empty());
    assert_eq!(dmgp.used_bytes(), 0);
}
