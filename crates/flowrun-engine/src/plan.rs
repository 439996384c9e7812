use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use flowrun_core::error::ValidationError;
use flowrun_core::graph::Graph;

/// One node to execute, with the nodes whose output it consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Position of the node in `graph.nodes`.
    pub index: usize,
    /// Predecessor positions in edge declaration order, deduplicated.
    pub predecessors: Vec<usize>,
}

/// A weakly connected component, in topological order.
///
/// Steps of one chain run sequentially; separate chains share no data and
/// may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub chains: Vec<Chain>,
    roots: Vec<usize>,
}

impl ExecutionPlan {
    /// Node positions with no incoming edge, in input order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Total number of steps across all chains.
    pub fn len(&self) -> usize {
        self.chains.iter().map(|c| c.steps.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Flattened execution order, chain by chain.
    pub fn order(&self) -> Vec<usize> {
        self.chains
            .iter()
            .flat_map(|c| c.steps.iter().map(|s| s.index))
            .collect()
    }
}

/// Build the execution plan for a graph.
///
/// Nodes are addressed by position; no node holds a reference to another.
/// Ordering is Kahn's algorithm with ties broken by input position, so the
/// plan is a pure function of the graph.
pub fn plan(graph: &Graph) -> Result<ExecutionPlan, ValidationError> {
    let n = graph.nodes.len();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, node) in graph.nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(ValidationError::DuplicateNode(node.id.clone()));
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    let mut components = DisjointSet::new(n);

    for edge in &graph.edges {
        let lookup = |id: &str| {
            index
                .get(id)
                .copied()
                .ok_or_else(|| ValidationError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: id.to_string(),
                })
        };
        let source = lookup(&edge.source)?;
        let target = lookup(&edge.target)?;

        successors[source].push(target);
        in_degree[target] += 1;
        if !predecessors[target].contains(&source) {
            predecessors[target].push(source);
        }
        components.union(source, target);
    }

    let roots: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();

    let mut ready: BinaryHeap<Reverse<usize>> = roots.iter().map(|&i| Reverse(i)).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(current)) = ready.pop() {
        order.push(current);
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != n {
        return Err(ValidationError::Cycle);
    }

    // Group by component; chains are ordered by their first node's position.
    let mut chain_of: HashMap<usize, usize> = HashMap::new();
    let mut chain_heads: Vec<usize> = Vec::new();
    for i in 0..n {
        let root = components.find(i);
        if !chain_of.contains_key(&root) {
            chain_of.insert(root, chain_heads.len());
            chain_heads.push(root);
        }
    }

    let mut chains = vec![Chain { steps: Vec::new() }; chain_heads.len()];
    for idx in order {
        let chain = chain_of[&components.find(idx)];
        chains[chain].steps.push(PlanStep {
            index: idx,
            predecessors: std::mem::take(&mut predecessors[idx]),
        });
    }

    Ok(ExecutionPlan { chains, roots })
}

/// Union-find over node positions.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the lower position as representative.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
