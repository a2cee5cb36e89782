//! 网络模拟模块
//!
//! 包含 packet 与标签栈模型、MPLS 节点、链路和网络拓扑。

// 子模块声明
mod id;
mod ipv4;
mod label;
mod packet;
mod link;
mod switching;
mod routing;
mod node;
mod stats;
mod network;
mod deliver_packet;
mod node_tick;
mod inject_flow;
mod net_world;

// 重新导出公共接口
pub use id::{LinkId, NodeId, PortId};
pub use ipv4::{
    gos, Ipv4Header, Ipv4Options, DEFAULT_IPV4_TTL, IPV4_HEADER_BYTES, IPV4_MAX_OPTIONS_BYTES,
    MAX_CROSSED_ACTIVE_NODES,
};
pub use label::{Label, LabelAllocator, LabelStack, DEFAULT_LABEL_TTL, MAX_LABEL_VALUE, MAX_RESERVED_LABEL, MPLS_LABEL_BYTES};
pub use packet::{
    FlowId, GpsrpKind, GpsrpMessage, IcmpMessage, MplsContent, MplsPdu, Packet, PacketBody,
    PacketIdAllocator, PacketKind, TcpPayload, GPSRP_BODY_BYTES, ICMP_HEADER_BYTES, TCP_HEADER_BYTES,
};
pub use link::{Link, LinkBinding, LinkEnd};
pub use switching::{LabelOp, SwitchEntry, SwitchingTable};
pub use routing::RoutingTable;
pub use node::{DiscardReason, MplsNode, NodeAction};
pub use stats::{NodeStats, Stats};
pub use network::Network;
pub use deliver_packet::DeliverPacket;
pub use node_tick::NodeTick;
pub use inject_flow::InjectFlow;
pub use net_world::NetWorld;
