//! 端口集合
//!
//! 一个节点的全部入口端口。出队按轮询（round-robin）进行：从上次服务端口的
//! 下一个开始，每个端口最多检查一次，保证有流量的端口不会被连续饿死超过 N-1 次。

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::config::BufferConfig;
use crate::error::{Error, Result};
use crate::net::{LinkBinding, Packet, PortId};

use super::port::Port;
use super::{artificial_threshold_bytes, mb_to_bytes, percent_of};

/// 人为拥塞期间保存的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArtificialCongestion {
    /// 强制前的真实占用量
    saved_occupancy: u64,
    /// 叠加在真实占用上的强制部分
    offset: u64,
}

#[derive(Debug)]
pub struct PortSet {
    ports: Vec<Port>,
    buffer_size_mb: u32,
    last_served: usize,
    unlimited: bool,
    artificial: Option<ArtificialCongestion>,
}

impl PortSet {
    pub fn new(num_ports: usize, buffer_size_mb: u32) -> Self {
        let capacity = mb_to_bytes(buffer_size_mb);
        Self {
            ports: (0..num_ports).map(|i| Port::new(PortId(i), capacity)).collect(),
            buffer_size_mb,
            last_served: 0,
            unlimited: false,
            artificial: None,
        }
    }

    pub fn from_config(num_ports: usize, cfg: &BufferConfig) -> Self {
        let mut set = Self::new(num_ports, cfg.buffer_size_mb);
        set.set_unlimited_buffer(cfg.unlimited);
        set
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn port(&self, id: PortId) -> Result<&Port> {
        let len = self.ports.len();
        self.ports
            .get(id.0)
            .ok_or(Error::InvalidPortIndex { index: id.0, len })
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> Result<&mut Port> {
        let len = self.ports.len();
        self.ports
            .get_mut(id.0)
            .ok_or(Error::InvalidPortIndex { index: id.0, len })
    }

    /// 绑定链路；端口已连接时是 no-op，返回 Ok(false)。
    pub fn connect_link(&mut self, id: PortId, binding: LinkBinding) -> Result<bool> {
        Ok(self.port_mut(id)?.connect_link(binding))
    }

    pub fn disconnect_link(&mut self, id: PortId) -> Result<bool> {
        Ok(self.port_mut(id)?.disconnect_link())
    }

    pub fn is_available(&self, id: PortId) -> Result<bool> {
        Ok(self.port(id)?.is_available())
    }

    /// 第一个空闲（未接链路）的端口
    pub fn first_available_port(&self) -> Option<PortId> {
        self.ports.iter().find(|p| p.is_available()).map(|p| p.id())
    }

    /// 直接连到 `addr` 这个节点的本地端口
    pub fn port_connected_to(&self, addr: Ipv4Addr) -> Option<PortId> {
        self.ports
            .iter()
            .find(|p| p.link().is_some_and(|l| l.peer_address == addr))
            .map(|p| p.id())
    }

    /// 入队到指定端口。拥塞时返回 `CongestionDrop`，packet 在错误里交还。
    ///
    /// 人为拥塞期间，强制的占用量同样参与准入判断：集合占用量加上 packet
    /// 超过共享容量即丢弃。
    pub fn enqueue(&mut self, id: PortId, pkt: Packet) -> Result<()> {
        let sz = pkt.size() as u64;
        let pkt_id = pkt.id();
        self.port(id)?;
        if self.artificial.is_some()
            && !self.unlimited
            && self.occupancy_bytes().saturating_add(sz) > self.capacity_bytes()
        {
            debug!(port = %id, pkt_id, size = sz, "🗑️  人为拥塞，丢弃数据包");
            return Err(Error::CongestionDrop {
                port: id,
                packet: Box::new(pkt),
            });
        }
        self.port_mut(id)?.enqueue(pkt).inspect_err(|_| {
            debug!(port = %id, pkt_id, size = sz, "🗑️  缓冲区已满，丢弃数据包");
        })
    }

    /// 从指定端口出队；不影响轮询位置。
    pub fn dequeue(&mut self, id: PortId) -> Result<Option<Packet>> {
        Ok(self.port_mut(id)?.dequeue())
    }

    /// 轮询取下一个 packet，连同它所在的端口一起返回。
    ///
    /// 从 `(last_served + 1) mod N` 开始，每个端口检查一次；取到 packet 的端口
    /// 成为新的 `last_served`。全部为空时返回 None，`last_served` 不变。
    pub fn next_packet(&mut self) -> Option<(PortId, Packet)> {
        let n = self.ports.len();
        if n == 0 {
            return None;
        }
        for step in 1..=n {
            let idx = (self.last_served + step) % n;
            if let Some(pkt) = self.ports[idx].dequeue() {
                self.last_served = idx;
                trace!(port = idx, pkt_id = pkt.id(), "轮询取出数据包");
                return Some((PortId(idx), pkt));
            }
        }
        None
    }

    /// 轮询下一个 packet 能否在 `max_octets` 内交换，但不出队。
    ///
    /// 注意副作用：途经的空端口会推进 `last_served`，与真正跳过它们一样，
    /// 因而随后的 `next_packet` 恰好从被检查的那个端口取包。整圈都为空时
    /// `last_served` 绕回原位。
    pub fn can_switch_packet(&mut self, max_octets: u32) -> bool {
        let n = self.ports.len();
        if n == 0 {
            return false;
        }
        for _ in 0..n {
            let idx = (self.last_served + 1) % n;
            let port = &self.ports[idx];
            if port.has_waiting_packet() {
                return port.can_switch_packet(max_octets);
            }
            self.last_served = idx;
        }
        false
    }

    pub fn last_served_port(&self) -> PortId {
        PortId(self.last_served)
    }

    pub fn has_waiting_packets(&self) -> bool {
        self.ports.iter().any(|p| p.has_waiting_packet())
    }

    pub fn queued_packets(&self) -> usize {
        self.ports.iter().map(|p| p.len()).sum()
    }

    /// 集合的占用量：各端口真实占用之和，人为拥塞期间再加上强制部分
    pub fn occupancy_bytes(&self) -> u64 {
        let offset = self.artificial.map_or(0, |a| a.offset);
        self.real_occupancy_bytes().saturating_add(offset)
    }

    /// 各端口真实占用之和
    pub fn real_occupancy_bytes(&self) -> u64 {
        self.ports.iter().map(|p| p.occupancy_bytes()).sum()
    }

    pub fn buffer_size_mb(&self) -> u32 {
        self.buffer_size_mb
    }

    /// 端口共享的缓冲区容量（字节）
    pub fn capacity_bytes(&self) -> u64 {
        mb_to_bytes(self.buffer_size_mb)
    }

    pub fn artificial_threshold_bytes(&self) -> u64 {
        artificial_threshold_bytes(self.capacity_bytes())
    }

    /// 拥塞程度：各端口占用率的最大值；人为拥塞时强制的占用量同样计入。
    pub fn congestion_level(&self) -> u8 {
        let worst_port = self
            .ports
            .iter()
            .map(|p| p.congestion_level())
            .max()
            .unwrap_or(0);
        match self.artificial {
            Some(_) => worst_port.max(percent_of(self.occupancy_bytes(), self.capacity_bytes())),
            None => worst_port,
        }
    }

    /// 修改共享缓冲区大小；单独指定过容量的端口不受影响。
    pub fn set_buffer_size_mb(&mut self, mb: u32) {
        self.buffer_size_mb = mb;
        let capacity = mb_to_bytes(mb);
        for p in &mut self.ports {
            p.apply_shared_capacity(capacity);
        }
    }

    /// 单独指定某个端口的容量
    pub fn set_port_capacity(&mut self, id: PortId, capacity_bytes: u64) -> Result<()> {
        self.port_mut(id)?.override_capacity(capacity_bytes);
        Ok(())
    }

    /// 无限缓冲：所有端口入队不再检查容量；已有的占用统计不变。
    pub fn set_unlimited_buffer(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
        for p in &mut self.ports {
            p.set_unlimited(unlimited);
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn is_artificially_congested(&self) -> bool {
        self.artificial.is_some()
    }

    /// 开关人为拥塞，重复设置同一个值是 no-op。
    ///
    /// 打开：仅当占用量低于 97% 阈值时，保存真实占用并强制到阈值。
    /// 关闭：去掉强制部分，占用量回到各端口的真实值。
    pub fn set_artificially_congested(&mut self, congested: bool) {
        match (congested, self.artificial) {
            (true, None) => {
                let threshold = self.artificial_threshold_bytes();
                let real = self.real_occupancy_bytes();
                if real < threshold {
                    debug!(real, forced = threshold, "人为拥塞开启");
                    self.artificial = Some(ArtificialCongestion {
                        saved_occupancy: real,
                        offset: threshold - real,
                    });
                }
            }
            (false, Some(state)) => {
                self.artificial = None;
                debug!(
                    saved = state.saved_occupancy,
                    restored = self.real_occupancy_bytes(),
                    "人为拥塞关闭"
                );
            }
            _ => {}
        }
    }

    /// 清空所有端口与拥塞状态；链路绑定保留。
    pub fn reset(&mut self) {
        for p in &mut self.ports {
            p.reset();
        }
        self.last_served = 0;
        self.artificial = None;
    }
}
