use std::collections::{BTreeMap, BTreeSet};

/// Order lines so every line comes after the lines it depends on.
///
/// `graph` maps each line to the lines it depends on. Edges pointing at
/// lines outside the graph are ignored. Each pass emits every line whose
/// dependencies have all been emitted already; a pass that emits nothing
/// means the remaining lines are stuck behind a cycle. In that case the
/// lines that actually sit on a cycle are returned as the error, sorted.
pub fn dependency_order(graph: &BTreeMap<usize, Vec<usize>>) -> Result<Vec<usize>, Vec<usize>> {
    let mut pending: BTreeSet<usize> = graph.keys().copied().collect();
    let mut order = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let before = pending.len();

        for line in pending.clone() {
            let blocked = graph[&line]
                .iter()
                .any(|dep| *dep != line && pending.contains(dep));
            if !blocked {
                pending.remove(&line);
                order.push(line);
            }
        }

        if pending.len() == before {
            return Err(cycle_members(graph, &pending));
        }
    }

    Ok(order)
}

/// Of the stalled lines, keep those that can reach themselves
fn cycle_members(graph: &BTreeMap<usize, Vec<usize>>, stalled: &BTreeSet<usize>) -> Vec<usize> {
    stalled
        .iter()
        .copied()
        .filter(|&start| reaches(graph, stalled, start, start))
        .collect()
}

fn reaches(
    graph: &BTreeMap<usize, Vec<usize>>,
    within: &BTreeSet<usize>,
    from: usize,
    target: usize,
) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = graph[&from].clone();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if !within.contains(&node) || !seen.insert(node) {
            continue;
        }
        stack.extend(graph[&node].iter().copied());
    }
    false
}
