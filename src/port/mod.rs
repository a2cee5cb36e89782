//! 端口与端口集合
//!
//! 每个节点的入口由一组带缓冲的端口组成。`Port` 是单个 FIFO 缓冲，
//! `PortSet` 负责轮询调度、拥塞汇总、缓冲区策略和人为拥塞。

mod port;
mod port_set;

pub use port::Port;
pub use port_set::PortSet;

/// 1 MB 对应的字节数
pub const BYTES_PER_MB: u64 = 1_048_576;

/// 人为拥塞时把占用量强制到容量的 97%
pub const ARTIFICIAL_CONGESTION_RATIO: f64 = 0.97;

pub fn mb_to_bytes(mb: u32) -> u64 {
    (mb as u64).saturating_mul(BYTES_PER_MB)
}

/// 人为拥塞阈值（字节，向下取整）。1 MB 时为 1017118。
pub fn artificial_threshold_bytes(capacity_bytes: u64) -> u64 {
    (capacity_bytes as f64 * ARTIFICIAL_CONGESTION_RATIO) as u64
}

/// 占用率百分比，截断到 [0, 100]
pub(crate) fn percent_of(occupancy: u64, capacity: u64) -> u8 {
    if capacity == 0 {
        return if occupancy == 0 { 0 } else { 100 };
    }
    let pct = (occupancy as u128).saturating_mul(100) / capacity as u128;
    pct.min(100) as u8
}
