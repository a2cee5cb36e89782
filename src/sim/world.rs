//! 世界 trait
//!
//! 事件通过 `as_any_mut` 向下转型拿到具体的网络状态。

use super::simulator::Simulator;
use std::any::Any;

pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件调用一次
    fn on_event_done(&mut self, _sim: &mut Simulator) {}
}
