//! 节点时钟事件（驱动端口服务与重传矩阵）

use super::net_world::NetWorld;
use crate::sim::{Event, SimTime, Simulator, World};
use tracing::trace;

/// 事件：所有节点执行一个 tick，然后按同样的间隔重新调度自己。
///
/// 网络空闲且没有其他待执行事件时不再重新调度，`Simulator::run` 因此可以结束。
#[derive(Debug)]
pub struct NodeTick {
    pub interval: SimTime,
}

impl Event for NodeTick {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let NodeTick { interval } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.tick_nodes(interval, sim);

        if w.net.is_idle() && sim.pending_events() == 0 {
            trace!(now = ?sim.now(), "网络空闲，停止 tick");
            return;
        }
        if interval.is_zero() {
            return;
        }
        sim.schedule_in(interval, NodeTick { interval });
    }
}
