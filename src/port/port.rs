//! 单个端口
//!
//! 尾丢弃的 FIFO 缓冲：超出容量的 packet 直接被拒绝，并随错误返还给调用方。

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Error, Result};
use crate::net::{LinkBinding, Packet, PortId};

use super::percent_of;

#[derive(Debug)]
pub struct Port {
    id: PortId,
    link: Option<LinkBinding>,
    queue: VecDeque<Packet>,
    occupancy_bytes: u64,
    capacity_bytes: u64,
    /// 容量由端口自己指定，不跟随 PortSet 的缓冲区大小
    capacity_overridden: bool,
    unlimited: bool,
}

impl Port {
    pub fn new(id: PortId, capacity_bytes: u64) -> Self {
        Self {
            id,
            link: None,
            queue: VecDeque::new(),
            occupancy_bytes: 0,
            capacity_bytes,
            capacity_overridden: false,
            unlimited: false,
        }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    /// 绑定链路；已绑定时不做任何事并返回 false。
    pub fn connect_link(&mut self, binding: LinkBinding) -> bool {
        if self.link.is_some() {
            return false;
        }
        self.link = Some(binding);
        true
    }

    /// 解除链路绑定；本来就空闲时返回 false。
    pub fn disconnect_link(&mut self) -> bool {
        self.link.take().is_some()
    }

    pub fn link(&self) -> Option<&LinkBinding> {
        self.link.as_ref()
    }

    /// 未绑定链路的端口可用于新连接
    pub fn is_available(&self) -> bool {
        self.link.is_none()
    }

    /// 入队：超出容量且不是无限缓冲时返回 `CongestionDrop`。
    pub(crate) fn enqueue(&mut self, pkt: Packet) -> Result<()> {
        let sz = pkt.size() as u64;
        if !self.unlimited && self.occupancy_bytes.saturating_add(sz) > self.capacity_bytes {
            return Err(Error::CongestionDrop {
                port: self.id,
                packet: Box::new(pkt),
            });
        }
        self.occupancy_bytes = self.occupancy_bytes.saturating_add(sz);
        trace!(port = %self.id, pkt_id = pkt.id(), size = sz, occupancy = self.occupancy_bytes, "入队");
        self.queue.push_back(pkt);
        Ok(())
    }

    pub(crate) fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.queue.pop_front()?;
        self.occupancy_bytes = self.occupancy_bytes.saturating_sub(pkt.size() as u64);
        Some(pkt)
    }

    pub fn peek(&self) -> Option<&Packet> {
        self.queue.front()
    }

    pub fn has_waiting_packet(&self) -> bool {
        !self.queue.is_empty()
    }

    /// 队首 packet 能否在 `max_octets` 内交换出去；没有 packet 时为 false。
    pub fn can_switch_packet(&self, max_octets: u32) -> bool {
        self.queue.front().is_some_and(|p| p.size() <= max_octets)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn occupancy_bytes(&self) -> u64 {
        self.occupancy_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn is_capacity_overridden(&self) -> bool {
        self.capacity_overridden
    }

    /// 拥塞程度（0..=100）
    pub fn congestion_level(&self) -> u8 {
        percent_of(self.occupancy_bytes, self.capacity_bytes)
    }

    /// 清空队列；链路绑定保留
    pub(crate) fn reset(&mut self) {
        self.queue.clear();
        self.occupancy_bytes = 0;
    }

    pub(crate) fn apply_shared_capacity(&mut self, capacity_bytes: u64) {
        if !self.capacity_overridden {
            self.capacity_bytes = capacity_bytes;
        }
    }

    pub(crate) fn override_capacity(&mut self, capacity_bytes: u64) {
        self.capacity_bytes = capacity_bytes;
        self.capacity_overridden = true;
    }

    pub(crate) fn set_unlimited(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
    }
}
