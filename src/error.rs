//! 错误类型
//!
//! 端口拥塞丢包、重传请求重复、端口索引越界等都通过 `Error` 返回给调用方。

use thiserror::Error;

use crate::net::{Packet, PortId};

/// 本 crate 的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// 缓冲区已满，packet 被丢弃；packet 本身随错误一起交还给调用方。
    #[error("port {port} congested, dropped packet {} ({} bytes)", .packet.id(), .packet.size())]
    CongestionDrop { port: PortId, packet: Box<Packet> },

    /// 同一个 (flow_id, packet_id) 已有未完成的重传请求
    #[error("retransmission of packet {packet_id} in flow {flow_id} already requested")]
    DuplicateRequest { flow_id: u32, packet_id: u32 },

    /// 端口索引越界（拓扑接线错误）
    #[error("port index {index} out of range, port set has {len} ports")]
    InvalidPortIndex { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 拥塞丢包属于正常结果，节点层据此触发重传请求。
    pub fn is_congestion_drop(&self) -> bool {
        matches!(self, Error::CongestionDrop { .. })
    }

    /// 取回被丢弃的 packet（仅 `CongestionDrop`）。
    pub fn into_dropped_packet(self) -> Option<Packet> {
        match self {
            Error::CongestionDrop { packet, .. } => Some(*packet),
            _ => None,
        }
    }
}
