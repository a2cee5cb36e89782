//! 拓扑构建

mod chain;

pub use chain::{build_chain, ChainOpts, MAX_CHAIN_LSRS};
