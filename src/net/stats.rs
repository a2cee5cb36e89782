//! 统计信息

use serde::Serialize;

/// 全网统计
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub injected_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 缓冲区拥塞丢包
    pub dropped_pkts: u64,
    /// 其他原因丢弃（无标签绑定、TTL 耗尽、无路由、无效端口）
    pub discarded_pkts: u64,
}

/// 单个节点的统计
#[derive(Debug, Default, Clone, Serialize)]
pub struct NodeStats {
    pub received_pkts: u64,
    pub switched_pkts: u64,
    pub delivered_pkts: u64,
    pub congestion_drops: u64,
    pub discarded_pkts: u64,
    /// 首次发出的重传请求
    pub gpsrp_requests: u64,
    /// sweep 触发的重试
    pub gpsrp_retries: u64,
    /// 重传请求已在进行中
    pub gpsrp_duplicates: u64,
    /// 收到请求后从 DMGP 重发的 packet
    pub gpsrp_resent: u64,
    /// 收到请求但没有副本
    pub gpsrp_denied: u64,
    /// 等待中的 packet 重新到达
    pub gpsrp_recovered: u64,
}
