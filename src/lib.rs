pub mod config;
pub mod error;
pub mod gpsrp;
pub mod net;
pub mod port;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
