use crate::net::{NodeId, RoutingTable};
use std::collections::HashSet;

fn undirected(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<NodeId>> {
    let mut adj = vec![Vec::new(); n];
    for &(a, b) in edges {
        adj[a].push(NodeId(b));
        adj[b].push(NodeId(a));
    }
    adj
}

#[test]
fn routing_table_builds_next_hops_for_shortest_paths() {
    // Diamond:
    // 0 - 1 - 3
    //  \- 2 -/
    let adj = undirected(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);

    let mut rt = RoutingTable::new();
    rt.ensure_built(&adj);

    let nh_03: HashSet<NodeId> = rt
        .next_hops(NodeId(0), NodeId(3))
        .expect("next_hops(0,3)")
        .iter()
        .copied()
        .collect();
    assert_eq!(nh_03, HashSet::from([NodeId(1), NodeId(2)]));

    assert_eq!(rt.next_hops(NodeId(0), NodeId(1)).unwrap(), &[NodeId(1)]);
    assert_eq!(rt.next_hops(NodeId(1), NodeId(3)).unwrap(), &[NodeId(3)]);
    assert_eq!(rt.next_hops(NodeId(3), NodeId(0)).unwrap(), &[NodeId(1), NodeId(2)]);
    assert!(rt.next_hops(NodeId(0), NodeId(0)).is_none());
}

#[test]
fn routing_table_next_hop_picks_smallest_candidate() {
    let adj = undirected(4, &[(0, 2), (0, 1), (1, 3), (2, 3)]);
    let mut rt = RoutingTable::new();
    rt.ensure_built(&adj);

    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));
    assert_eq!(rt.next_hop(NodeId(3), NodeId(0)), Some(NodeId(1)));
}

#[test]
fn routing_table_has_no_route_between_disconnected_nodes() {
    let adj = undirected(4, &[(0, 1), (2, 3)]);
    let mut rt = RoutingTable::new();
    rt.ensure_built(&adj);

    assert_eq!(rt.next_hop(NodeId(0), NodeId(1)), Some(NodeId(1)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), None);
}

#[test]
fn routing_table_requires_mark_dirty_to_rebuild() {
    let mut adj = undirected(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);

    let mut rt = RoutingTable::new();
    assert!(rt.is_dirty());
    rt.ensure_built(&adj);
    assert!(!rt.is_dirty());
    let before: HashSet<NodeId> = rt
        .next_hops(NodeId(0), NodeId(3))
        .unwrap()
        .iter()
        .copied()
        .collect();
    assert_eq!(before, HashSet::from([NodeId(1), NodeId(2)]));

    // 去掉 0-1 链路但不标记 dirty
    adj = undirected(4, &[(0, 2), (1, 3), (2, 3)]);
    rt.ensure_built(&adj);
    assert_eq!(rt.next_hops(NodeId(0), NodeId(3)).unwrap(), &[NodeId(1), NodeId(2)]);

    rt.mark_dirty();
    rt.ensure_built(&adj);
    assert_eq!(rt.next_hops(NodeId(0), NodeId(3)).unwrap(), &[NodeId(2)]);
}
