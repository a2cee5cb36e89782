//! 事件 trait

use super::simulator::Simulator;
use super::world::World;

/// 可调度事件。`self: Box<Self>` 让事件在执行时拿回 packet 等所有权。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
