use std::collections::VecDeque;

use super::model::Adjacency;

/// Breadth-first layers around `source`: entry `d - 1` holds the nodes first
/// reached at exactly `d` hops, for `d` in `1..=max_depth`. Stops early once a
/// layer comes up empty.
pub fn bfs_layers(adjacency: &Adjacency, source: usize, max_depth: usize) -> Vec<Vec<usize>> {
    let node_count = adjacency.len();
    if source >= node_count || max_depth == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    visited[source] = true;
    let mut frontier = vec![source];
    let mut layers = Vec::new();

    for _depth in 1..=max_depth {
        let mut next = Vec::new();
        for &node in &frontier {
            for &neighbor in adjacency.neighbors(node) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        layers.push(next.clone());
        frontier = next;
    }

    layers
}

/// Every node within `depth` hops of `source`, excluding the source itself.
pub fn nodes_within(adjacency: &Adjacency, source: usize, depth: usize) -> Vec<usize> {
    bfs_layers(adjacency, source, depth)
        .into_iter()
        .flatten()
        .collect()
}

/// The exact frontier at `layer` hops, or nothing if the graph runs out first.
pub fn nodes_at_layer(adjacency: &Adjacency, source: usize, layer: usize) -> Vec<usize> {
    let mut layers = bfs_layers(adjacency, source, layer);
    if layers.len() == layer {
        layers.pop().unwrap_or_default()
    } else {
        Vec::new()
    }
}

/// Hop distance from `source` to every node, `None` when unreachable.
pub fn bfs_distances(adjacency: &Adjacency, source: usize) -> Vec<Option<usize>> {
    let node_count = adjacency.len();
    let mut distances = vec![None; node_count];
    if source >= node_count {
        return distances;
    }

    distances[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        let Some(depth) = distances[node] else {
            continue;
        };
        for &next in adjacency.neighbors(node) {
            if distances[next].is_none() {
                distances[next] = Some(depth + 1);
                queue.push_back(next);
            }
        }
    }

    distances
}
