mod dmgp;
mod label_stack;
mod node;
mod routing_table;
mod sim_time;
