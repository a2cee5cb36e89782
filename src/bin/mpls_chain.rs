//! 链式 MPLS 拓扑仿真
//!
//! ler0 -> lsr1 -> ... -> lsrN -> ler1 单流发包，瓶颈在最后一个 LSR。
//! 运行结束后在 stdout 输出 JSON 统计；日志写到 stderr。

use std::path::PathBuf;

use clap::Parser;
use mplsim_rs::config::SimConfig;
use mplsim_rs::error::Result;
use mplsim_rs::net::{gos, InjectFlow, NetWorld, NodeTick};
use mplsim_rs::sim::{SimTime, Simulator};
use mplsim_rs::topo::{build_chain, ChainOpts};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "mpls_chain", about = "链式 MPLS 拓扑仿真：GoS 流经拥塞 LSR，GPSRP 本地重传")]
struct Args {
    /// 仿真参数 JSON，缺省字段取默认值
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    lsrs: usize,
    /// LSR 不参与 GPSRP
    #[arg(long)]
    passive: bool,
    #[arg(long, default_value_t = 100)]
    pkts: u64,
    /// TCP 载荷字节数
    #[arg(long, default_value_t = 1000)]
    data_bytes: u32,
    /// 两个 packet 注入间隔（微秒）
    #[arg(long, default_value_t = 1)]
    gap_us: u64,
    #[arg(long, default_value_t = gos::LEVEL1)]
    gos_level: u8,
    #[arg(long, default_value_t = 10)]
    link_gbps: u64,
    /// 单向链路传播时延（微秒）
    #[arg(long, default_value_t = 1)]
    link_latency_us: u64,
    /// 瓶颈 LSR 的端口缓冲（字节）
    #[arg(long)]
    bottleneck_bytes: Option<u64>,
    /// 瓶颈 LSR 每个 tick 的交换字节数
    #[arg(long)]
    bottleneck_octets: Option<u32>,
    /// 不限缓冲区
    #[arg(long)]
    unlimited: bool,
    /// 仿真运行到多少毫秒
    #[arg(long, default_value_t = 10)]
    until_ms: u64,
}

fn main() -> Result<()> {
    // 初始化 tracing；stdout 留给 JSON 统计
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if args.unlimited {
        cfg.buffer.unlimited = true;
    }
    cfg.validate()?;

    let mut sim = Simulator::default();
    let mut world = NetWorld::new(cfg);

    let opts = ChainOpts {
        lsrs: args.lsrs,
        active_lsrs: !args.passive,
        link_gbps: args.link_gbps,
        link_latency: SimTime::from_micros(args.link_latency_us),
        bottleneck_capacity_bytes: args.bottleneck_bytes,
        bottleneck_octets_per_tick: args.bottleneck_octets,
    };
    let (ingress, egress, _path) = build_chain(&mut world, &opts)?;

    sim.schedule(
        SimTime::ZERO,
        InjectFlow {
            src: ingress,
            dst: egress,
            data_bytes: args.data_bytes,
            gos_level: args.gos_level,
            next_local_id: 0,
            remaining: args.pkts,
            gap: SimTime::from_micros(args.gap_us),
        },
    );
    sim.schedule(SimTime::ZERO, NodeTick { interval: cfg.tick() });

    sim.run_until(SimTime::from_millis(args.until_ms), &mut world);

    let nodes: Vec<_> = world
        .net
        .nodes()
        .map(|n| {
            json!({
                "name": n.name(),
                "address": n.address().to_string(),
                "active": n.is_active(),
                "queued_pkts": n.ports().queued_packets(),
                "pending_requests": n.matrix().len(),
                "dmgp_entries": n.dmgp().len(),
                "stats": n.stats,
            })
        })
        .collect();
    let summary = json!({
        "now_ns": sim.now().0,
        "executed_events": sim.executed_events(),
        "network": world.net.stats,
        "nodes": nodes,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
