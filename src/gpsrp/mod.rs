//! GPSRP 主动重传
//!
//! 节点因拥塞丢掉受保护的 GoS packet 后，沿 packet 记录的活动节点列表
//! 逐跳向上游请求重传。`RetransmissionMatrix` 保存未完成的请求，
//! `Dmgp` 是活动节点保存 GoS packet 副本的内存。

mod dmgp;
mod matrix;
mod request;

pub use dmgp::{Dmgp, DmgpEntry};
pub use matrix::{GpsrpRetry, RetransmissionMatrix};
pub use request::{BackwardPath, RequestState, RetransmissionRequest};
