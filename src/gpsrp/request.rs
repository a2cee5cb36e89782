//! 单个重传请求
//!
//! 状态不单独存储，由超时、剩余次数和回溯路径推导：
//! Pending（超时未到）→ Retryable（超时到期且还有次数和路径）→ Purgeable。

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::net::Ipv4Addr;

use crate::config::GpsrpConfig;
use crate::net::{FlowId, PortId};
use crate::sim::SimTime;

/// 回溯路径：最近的上游活动节点在最前，从前端逐个取出。
///
/// 与标签栈（LIFO）不同，这里只允许从队首消费。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackwardPath {
    nodes: VecDeque<Ipv4Addr>,
}

impl BackwardPath {
    pub fn new(nodes: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    /// 由 packet 记录的活动节点列表（按经过顺序）构造：反转后最近的在前，
    /// 并去掉请求者自己。
    pub fn from_crossed_nodes(crossed: &[Ipv4Addr], requester: Ipv4Addr) -> Self {
        Self::new(crossed.iter().rev().copied().filter(|&a| a != requester))
    }

    pub fn pop_front(&mut self) -> Option<Ipv4Addr> {
        self.nodes.pop_front()
    }

    pub fn front(&self) -> Option<Ipv4Addr> {
        self.nodes.front().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Retryable,
    Purgeable,
}

/// 一个未完成的重传请求
#[derive(Debug, Clone)]
pub struct RetransmissionRequest {
    insertion_order: u64,
    flow_id: FlowId,
    packet_id: u32,
    outgoing_port: PortId,
    backward_path: BackwardPath,
    timeout: SimTime,
    attempts_remaining: u32,
    full_timeout: SimTime,
}

impl RetransmissionRequest {
    pub fn new(
        insertion_order: u64,
        flow_id: FlowId,
        packet_id: u32,
        outgoing_port: PortId,
        backward_path: BackwardPath,
        cfg: &GpsrpConfig,
    ) -> Self {
        Self {
            insertion_order,
            flow_id,
            packet_id,
            outgoing_port,
            backward_path,
            timeout: cfg.timeout(),
            attempts_remaining: cfg.attempts,
            full_timeout: cfg.timeout(),
        }
    }

    pub fn insertion_order(&self) -> u64 {
        self.insertion_order
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn packet_id(&self) -> u32 {
        self.packet_id
    }

    pub fn outgoing_port(&self) -> PortId {
        self.outgoing_port
    }

    pub fn backward_path(&self) -> &BackwardPath {
        &self.backward_path
    }

    pub fn timeout(&self) -> SimTime {
        self.timeout
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// 超时倒计时，减到 0 为止
    pub fn tick(&mut self, elapsed: SimTime) {
        self.timeout = self.timeout.saturating_sub(elapsed);
    }

    /// 超时到期且还有次数时，重新计时并消耗一次尝试；否则不变。
    pub fn reset_after_expiry(&mut self) {
        if self.timeout.is_zero() && self.attempts_remaining > 0 {
            self.timeout = self.full_timeout;
            self.attempts_remaining -= 1;
        }
    }

    /// 无条件重新计时并消耗一次尝试；次数已耗尽时超时也清零，请求随即可被清除。
    pub fn force_reset(&mut self) {
        match self.attempts_remaining.checked_sub(1) {
            Some(left) => {
                self.attempts_remaining = left;
                self.timeout = self.full_timeout;
            }
            None => {
                self.attempts_remaining = 0;
                self.timeout = SimTime::ZERO;
            }
        }
    }

    /// 取出下一个要询问的上游活动节点
    pub fn pop_next_crossed_node(&mut self) -> Option<Ipv4Addr> {
        self.backward_path.pop_front()
    }

    pub fn state(&self) -> RequestState {
        if self.is_purgeable() {
            RequestState::Purgeable
        } else if self.timeout.is_zero() {
            RequestState::Retryable
        } else {
            RequestState::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == RequestState::Pending
    }

    pub fn is_retryable(&self) -> bool {
        self.timeout.is_zero() && self.attempts_remaining > 0 && !self.backward_path.is_empty()
    }

    pub fn is_purgeable(&self) -> bool {
        self.backward_path.is_empty() || (self.attempts_remaining == 0 && self.timeout.is_zero())
    }
}

// 只按插入顺序比较：用于确定的遍历顺序，不代表优先级。
impl Ord for RetransmissionRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.insertion_order.cmp(&other.insertion_order)
    }
}

impl PartialOrd for RetransmissionRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RetransmissionRequest {
    fn eq(&self, other: &Self) -> bool {
        self.insertion_order == other.insertion_order
    }
}

impl Eq for RetransmissionRequest {}
