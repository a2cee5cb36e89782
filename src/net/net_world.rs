//! 网络世界实现
//!
//! 事件通过向下转型拿到这里持有的 `Network`。

use super::network::Network;
use crate::config::SimConfig;
use crate::sim::World;
use std::any::Any;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl NetWorld {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            net: Network::new(cfg),
        }
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
