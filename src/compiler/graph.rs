use crate::dsl::{Edge, Node};
use std::collections::{HashMap, HashSet, VecDeque};

/// Adjacency list keyed by node id. Neighbors keep edge declaration order.
/// Edges whose endpoints are unknown still appear here; callers that need
/// well-formed graphs must check references first.
pub fn adjacency<'a>(edges: &'a [Edge]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adj.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
    }
    adj
}

/// Finds one cycle with a depth-first search restarted from every unvisited
/// node, in node-array order.
///
/// The returned path is closed: its first and last element are the same node,
/// e.g. `["A", "B", "A"]`. Returns `None` for a DAG.
pub fn detect_cycle(nodes: &[Node], edges: &[Edge]) -> Option<Vec<String>> {
    let adj = adjacency(edges);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    for root in nodes {
        if visited.contains(root.id.as_str()) {
            continue;
        }

        // Explicit stack of (node, next neighbor index) so deep graphs cannot
        // overflow the call stack.
        let mut path: Vec<&str> = vec![root.id.as_str()];
        let mut frames: Vec<(&str, usize)> = vec![(root.id.as_str(), 0)];
        visited.insert(root.id.as_str());
        on_stack.insert(root.id.as_str());

        while let Some((current, cursor)) = frames.last_mut() {
            let current = *current;
            let neighbors = adj.get(current).map(|v| v.as_slice()).unwrap_or(&[]);

            if *cursor >= neighbors.len() {
                frames.pop();
                path.pop();
                on_stack.remove(current);
                continue;
            }

            let next = neighbors[*cursor];
            *cursor += 1;

            if on_stack.contains(next) {
                let start = path.iter().position(|id| *id == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }

            if visited.insert(next) {
                on_stack.insert(next);
                path.push(next);
                frames.push((next, 0));
            }
        }
    }

    None
}

/// Kahn's algorithm with a FIFO queue seeded by zero in-degree nodes in array
/// order. Ties are therefore broken by original position.
///
/// Returns `None` if the edges induce a cycle. Edges referencing unknown ids
/// are ignored.
pub fn topological_sort<'a>(nodes: &'a [Node], edges: &[Edge]) -> Option<Vec<&'a Node>> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];

    for edge in edges {
        let (Some(&u), Some(&v)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) else {
            continue;
        };
        adj[u].push(v);
        in_degree[v] += 1;
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(u) = queue.pop_front() {
        order.push(&nodes[u]);
        for &v in &adj[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    if order.len() < nodes.len() {
        return None;
    }
    Some(order)
}

/// Every node from which `target` can be reached, excluding `target` itself.
pub fn ancestors<'a>(edges: &'a [Edge], target: &str) -> HashSet<&'a str> {
    let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        reverse.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = reverse.get(target).cloned().unwrap_or_default();
    while let Some(id) = stack.pop() {
        if id == target || !seen.insert(id) {
            continue;
        }
        if let Some(parents) = reverse.get(id) {
            stack.extend(parents.iter().copied());
        }
    }
    seen
}
