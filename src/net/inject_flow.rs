//! 流量注入事件

use super::id::NodeId;
use super::net_world::NetWorld;
use crate::sim::{Event, SimTime, Simulator, World};

/// 事件：从 `src` 向 `dst` 周期性注入数据包。
///
/// 每个 packet 的 GoS 本地编号从 `next_local_id` 开始递增。
#[derive(Debug)]
pub struct InjectFlow {
    pub src: NodeId,
    pub dst: NodeId,
    pub data_bytes: u32,
    pub gos_level: u8,
    pub next_local_id: u32,
    pub remaining: u64,
    pub gap: SimTime,
}

impl Event for InjectFlow {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let mut me = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        if me.remaining == 0 {
            return;
        }

        let pkt = w
            .net
            .make_packet(me.src, me.dst, me.data_bytes, me.gos_level, me.next_local_id);
        w.net.inject(me.src, pkt, sim);

        me.remaining -= 1;
        me.next_local_id = me.next_local_id.wrapping_add(1);
        if me.remaining > 0 {
            sim.schedule_in(me.gap, InjectFlow { ..me });
        }
    }
}
