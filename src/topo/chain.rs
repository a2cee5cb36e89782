//! 链式 MPLS 拓扑构建

use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::net::{NetWorld, NodeId};
use crate::sim::SimTime;

/// 地址最后一个字节放得下的 LSR 数量
pub const MAX_CHAIN_LSRS: usize = 253;

/// 链式拓扑配置选项
#[derive(Debug, Clone)]
pub struct ChainOpts {
    /// 中间 LSR 的数量
    pub lsrs: usize,
    /// 中间 LSR 是否为活动节点（参与 GPSRP）
    pub active_lsrs: bool,
    pub link_gbps: u64,
    pub link_latency: SimTime,
    /// 最后一个 LSR 的端口缓冲（字节），None 表示沿用配置
    pub bottleneck_capacity_bytes: Option<u64>,
    /// 最后一个 LSR 每个 tick 的交换字节数，None 表示沿用配置
    pub bottleneck_octets_per_tick: Option<u32>,
}

impl Default for ChainOpts {
    fn default() -> Self {
        Self {
            lsrs: 2,
            active_lsrs: true,
            link_gbps: 10,
            link_latency: SimTime::from_micros(1),
            bottleneck_capacity_bytes: None,
            bottleneck_octets_per_tick: None,
        }
    }
}

/// 构建 chain 拓扑
///
/// 拓扑结构：ler0 <-> lsr1 <-> ... <-> lsrN <-> ler1，地址依次为 10.0.0.1, 10.0.0.2, ...
/// 并沿整条链建立 ler0 -> ler1 的 LSP。
/// 返回：(入口 LER, 出口 LER, LSP 路径)
pub fn build_chain(world: &mut NetWorld, opts: &ChainOpts) -> Result<(NodeId, NodeId, Vec<NodeId>)> {
    // ler0、ler1 和 LSR 共用 10.0.0.1..=10.0.0.255
    if opts.lsrs > MAX_CHAIN_LSRS {
        return Err(Error::Config(format!(
            "chain supports at most {MAX_CHAIN_LSRS} LSRs, got {}",
            opts.lsrs
        )));
    }
    let net = &mut world.net;
    let addr = |i: usize| Ipv4Addr::new(10, 0, 0, (i + 1) as u8);

    let mut path = Vec::with_capacity(opts.lsrs + 2);
    path.push(net.add_node("ler0", addr(0), false, 1));
    for i in 1..=opts.lsrs {
        path.push(net.add_node(format!("lsr{i}"), addr(i), opts.active_lsrs, 2));
    }
    path.push(net.add_node("ler1", addr(opts.lsrs + 1), false, 1));

    let bps = opts.link_gbps.saturating_mul(1_000_000_000);
    for pair in path.windows(2) {
        net.connect(pair[0], pair[1], opts.link_latency, bps)?;
    }
    net.build_routes()?;
    net.install_lsp(&path)?;

    if opts.lsrs > 0 {
        let bottleneck = net.node_mut(path[opts.lsrs]);
        if let Some(cap) = opts.bottleneck_capacity_bytes {
            let ports: Vec<_> = bottleneck.ports().ports().map(|p| p.id()).collect();
            for port in ports {
                bottleneck.ports_mut().set_port_capacity(port, cap)?;
            }
        }
        if let Some(octets) = opts.bottleneck_octets_per_tick {
            bottleneck.set_switching_octets_per_tick(octets);
        }
    }

    let ingress = path[0];
    let egress = path[path.len() - 1];
    Ok((ingress, egress, path))
}
