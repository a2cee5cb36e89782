//! 数据包交付事件
//!
//! 链路传输结束后，把 packet 交给对端节点的某个端口。

use super::id::{NodeId, PortId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace};

/// 事件：把一个 packet 放进某个节点端口的缓冲区。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub port: PortId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id(), flow_id = self.pkt.flow_id(), to = %self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, port, pkt } = *self;

        debug!(
            kind = ?pkt.kind(),
            size_bytes = pkt.size(),
            target = %pkt.target(),
            port = %port,
            now = ?sim.now(),
            "📨 数据包到达事件执行"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.deliver(to, port, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}
