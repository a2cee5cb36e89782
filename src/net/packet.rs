//! 数据包类型
//!
//! `Packet` 由公共部分（编号、IPv4 头部）和 `PacketBody` 组成。MPLS packet
//! 的内容要么是 TCP 载荷填充，要么是完整封装的另一个 packet，二者互斥。
//! 大小总是按当前内容现算，标签栈或载荷变化后不会出现过期值。

use std::net::Ipv4Addr;

use super::ipv4::{Ipv4Header, Ipv4Options};
use super::label::LabelStack;

/// TCP 头部
pub const TCP_HEADER_BYTES: u32 = 20;
/// ICMP 头部
pub const ICMP_HEADER_BYTES: u32 = 8;
/// GPSRP 消息体：类型 1 字节 + flow id 4 字节 + packet id 4 字节
pub const GPSRP_BODY_BYTES: u32 = 9;

/// 流标识：源地址的 32 位值
pub type FlowId = u32;

/// TCP 载荷（只关心大小）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpPayload {
    pub data_bytes: u32,
}

impl TcpPayload {
    pub fn new(data_bytes: u32) -> Self {
        Self { data_bytes }
    }

    pub fn size_bytes(&self) -> u32 {
        TCP_HEADER_BYTES.saturating_add(self.data_bytes)
    }
}

/// MPLS packet 的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MplsContent {
    /// 普通数据：外层 IPv4 头 + TCP 载荷
    Payload(TcpPayload),
    /// 封装的完整 packet（自带头部）
    Carried(Box<Packet>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MplsPdu {
    pub labels: LabelStack,
    pub content: MplsContent,
}

/// ICMP 消息；traceroute 类诊断可附带标签栈快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub label_snapshot: Option<LabelStack>,
}

/// GPSRP 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsrpKind {
    /// 请求重传 (flow_id, packet_id)
    Request,
    /// 请求的 packet 已重新发出
    Acknowledge,
    /// 收到请求的节点没有副本
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsrpMessage {
    pub kind: GpsrpKind,
    pub flow_id: FlowId,
    pub packet_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketBody {
    Ipv4(TcpPayload),
    Mpls(MplsPdu),
    Icmp(IcmpMessage),
    Gpsrp(GpsrpMessage),
}

/// packet 变体标签，供统计与报表使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Ipv4,
    Mpls,
    Icmp,
    Gpsrp,
}

/// 网络数据包
///
/// `Clone` 是深拷贝：标签栈、选项、封装的 packet 都各自独立。
/// 编号在创建时确定，之后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: u64,
    pub ipv4: Ipv4Header,
    pub body: PacketBody,
}

impl Packet {
    pub fn new_ipv4(id: u64, origin: Ipv4Addr, target: Ipv4Addr, data_bytes: u32) -> Self {
        Self {
            id,
            ipv4: Ipv4Header::new(origin, target),
            body: PacketBody::Ipv4(TcpPayload::new(data_bytes)),
        }
    }

    /// 空标签栈的 MPLS packet，载荷为 TCP 填充
    pub fn new_mpls(id: u64, origin: Ipv4Addr, target: Ipv4Addr, data_bytes: u32) -> Self {
        Self {
            id,
            ipv4: Ipv4Header::new(origin, target),
            body: PacketBody::Mpls(MplsPdu {
                labels: LabelStack::new(),
                content: MplsContent::Payload(TcpPayload::new(data_bytes)),
            }),
        }
    }

    /// 把 `inner` 整个封装进一个 MPLS packet；地址沿用内层。
    pub fn new_mpls_carrying(id: u64, inner: Packet) -> Self {
        Self {
            id,
            ipv4: Ipv4Header::new(inner.ipv4.origin, inner.ipv4.target),
            body: PacketBody::Mpls(MplsPdu {
                labels: LabelStack::new(),
                content: MplsContent::Carried(Box::new(inner)),
            }),
        }
    }

    pub fn new_icmp(
        id: u64,
        origin: Ipv4Addr,
        target: Ipv4Addr,
        icmp_type: u8,
        icmp_code: u8,
        label_snapshot: Option<LabelStack>,
    ) -> Self {
        Self {
            id,
            ipv4: Ipv4Header::new(origin, target),
            body: PacketBody::Icmp(IcmpMessage {
                icmp_type,
                icmp_code,
                label_snapshot,
            }),
        }
    }

    pub fn new_gpsrp(id: u64, origin: Ipv4Addr, target: Ipv4Addr, msg: GpsrpMessage) -> Self {
        Self {
            id,
            ipv4: Ipv4Header::new(origin, target),
            body: PacketBody::Gpsrp(msg),
        }
    }

    /// 设置 GoS 选项
    pub fn with_gos(mut self, gos_level: u8, local_unique_id: u32) -> Self {
        self.ipv4.options = Ipv4Options::new(gos_level, local_unique_id);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> PacketKind {
        match self.body {
            PacketBody::Ipv4(_) => PacketKind::Ipv4,
            PacketBody::Mpls(_) => PacketKind::Mpls,
            PacketBody::Icmp(_) => PacketKind::Icmp,
            PacketBody::Gpsrp(_) => PacketKind::Gpsrp,
        }
    }

    pub fn origin(&self) -> Ipv4Addr {
        self.ipv4.origin
    }

    pub fn target(&self) -> Ipv4Addr {
        self.ipv4.target
    }

    pub fn flow_id(&self) -> FlowId {
        u32::from(self.ipv4.origin)
    }

    pub fn gos_level(&self) -> u8 {
        self.ipv4.options.gos_level()
    }

    pub fn local_unique_id(&self) -> u32 {
        self.ipv4.options.local_unique_id()
    }

    pub fn options(&self) -> &Ipv4Options {
        &self.ipv4.options
    }

    pub fn options_mut(&mut self) -> &mut Ipv4Options {
        &mut self.ipv4.options
    }

    /// 线路上的总字节数
    pub fn size(&self) -> u32 {
        match &self.body {
            PacketBody::Ipv4(payload) => self.ipv4.size_bytes() + payload.size_bytes(),
            PacketBody::Mpls(pdu) => {
                let inner = match &pdu.content {
                    MplsContent::Payload(payload) => self.ipv4.size_bytes() + payload.size_bytes(),
                    MplsContent::Carried(carried) => carried.size(),
                };
                pdu.labels.size_bytes().saturating_add(inner)
            }
            PacketBody::Icmp(icmp) => {
                let snapshot = icmp.label_snapshot.as_ref().map_or(0, |s| s.size_bytes());
                self.ipv4.size_bytes() + ICMP_HEADER_BYTES + snapshot
            }
            PacketBody::Gpsrp(_) => self.ipv4.size_bytes() + GPSRP_BODY_BYTES,
        }
    }

    pub fn labels(&self) -> Option<&LabelStack> {
        match &self.body {
            PacketBody::Mpls(pdu) => Some(&pdu.labels),
            _ => None,
        }
    }

    pub fn labels_mut(&mut self) -> Option<&mut LabelStack> {
        match &mut self.body {
            PacketBody::Mpls(pdu) => Some(&mut pdu.labels),
            _ => None,
        }
    }

    pub fn carried(&self) -> Option<&Packet> {
        match &self.body {
            PacketBody::Mpls(MplsPdu {
                content: MplsContent::Carried(inner),
                ..
            }) => Some(inner),
            _ => None,
        }
    }

    pub fn icmp(&self) -> Option<&IcmpMessage> {
        match &self.body {
            PacketBody::Icmp(icmp) => Some(icmp),
            _ => None,
        }
    }

    pub fn gpsrp(&self) -> Option<&GpsrpMessage> {
        match &self.body {
            PacketBody::Gpsrp(msg) => Some(msg),
            _ => None,
        }
    }

    /// 是否受 GPSRP 保护
    pub fn is_gos_protected(&self) -> bool {
        super::ipv4::gos::is_protected(self.gos_level())
    }

    /// 入口 LER：把 IPv4 packet 变成空栈的 MPLS packet。其他 IPv4 类消息整体封装。
    pub fn into_mpls(self) -> Packet {
        match self.body {
            PacketBody::Mpls(_) => self,
            PacketBody::Ipv4(payload) => Packet {
                id: self.id,
                ipv4: self.ipv4,
                body: PacketBody::Mpls(MplsPdu {
                    labels: LabelStack::new(),
                    content: MplsContent::Payload(payload),
                }),
            },
            PacketBody::Icmp(_) | PacketBody::Gpsrp(_) => {
                let id = self.id;
                Packet::new_mpls_carrying(id, self)
            }
        }
    }

    /// 出口 LER：标签栈已空时还原出 IPv4 packet；栈非空则原样返回。
    pub fn strip_mpls(self) -> Packet {
        match self.body {
            PacketBody::Mpls(pdu) if pdu.labels.is_empty() => match pdu.content {
                MplsContent::Payload(payload) => Packet {
                    id: self.id,
                    ipv4: self.ipv4,
                    body: PacketBody::Ipv4(payload),
                },
                MplsContent::Carried(inner) => *inner,
            },
            body => Packet {
                id: self.id,
                ipv4: self.ipv4,
                body,
            },
        }
    }
}

/// 分配全局唯一的 packet 编号
#[derive(Debug, Default)]
pub struct PacketIdAllocator {
    next: u64,
}

impl PacketIdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}
