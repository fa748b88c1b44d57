//! Processor arena for one topology snapshot.
//!
//! Processors are stored once, in snapshot order, and addressed by id. The
//! `parent` field is only ever used as a lookup key into the arena, so nested
//! groups never form owning cycles.

use std::collections::HashMap;

use pipetrace_core::models::{Connection, Processor, TopologySnapshot, Versions};
use tracing::warn;

/// Upper bound on parent-chain walks; deeper chains are treated as cyclic.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct Topology {
    processors: Vec<Processor>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    versions: Option<Versions>,
}

impl Topology {
    /// Build the arena from a snapshot.
    ///
    /// A repeated processor id keeps its first occurrence. Connections whose
    /// endpoints are not part of the snapshot are kept (the producer owns the
    /// edge list) but reported.
    pub fn from_snapshot(snapshot: TopologySnapshot) -> Self {
        let mut processors = Vec::with_capacity(snapshot.processors.len());
        let mut index = HashMap::with_capacity(snapshot.processors.len());

        for p in snapshot.processors {
            if index.contains_key(&p.id) {
                warn!(processor = %p.id, "duplicate processor id in topology; keeping the first");
                continue;
            }
            index.insert(p.id.clone(), processors.len());
            processors.push(p);
        }

        let topology = Self {
            processors,
            index,
            connections: snapshot.connections,
            versions: snapshot.versions,
        };

        let dangling = topology.dangling_connections().count();
        if dangling > 0 {
            warn!(dangling, "topology has connections to unknown processors");
        }

        topology
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Processors in snapshot order.
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn processor(&self, id: &str) -> Option<&Processor> {
        self.index.get(id).map(|&i| &self.processors[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn versions(&self) -> Option<&Versions> {
        self.versions.as_ref()
    }

    /// Connections whose `from` or `to` is not a processor of this snapshot.
    pub fn dangling_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(|c| !self.contains(&c.from) || !self.contains(&c.to))
    }

    /// Processors downstream of `id` (targets of its outgoing connections).
    pub fn successors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.from == id)
            .map(|c| c.to.as_str())
    }

    /// Processors upstream of `id`.
    pub fn predecessors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.to == id)
            .map(|c| c.from.as_str())
    }

    /// The parent processor of `id`, if it has one that exists in the arena.
    pub fn parent_of(&self, id: &str) -> Option<&Processor> {
        self.processor(id)
            .and_then(|p| p.parent.as_deref())
            .and_then(|parent| self.processor(parent))
    }

    /// Direct children of `parent`, in snapshot order.
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Processor> + 'a {
        self.processors
            .iter()
            .filter(move |p| p.parent.as_deref() == Some(parent))
    }

    /// Nesting depth of `id`: 0 for roots and for processors whose parent is
    /// unknown. Cyclic parent chains stop at [`MAX_NESTING`].
    pub fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            if depth >= MAX_NESTING || parent.id == id {
                break;
            }
            current = &parent.id;
        }
        depth
    }

    /// Depth-first ordering of the processor tree: each root followed by its
    /// descendants, siblings in snapshot order. Processors unreachable from a
    /// root (cyclic parents) are appended at the end.
    pub fn tree_order(&self) -> Vec<(usize, &Processor)> {
        let mut out = Vec::with_capacity(self.processors.len());
        let mut visited = vec![false; self.processors.len()];

        let roots = self
            .processors
            .iter()
            .filter(|p| p.parent.as_deref().map_or(true, |parent| !self.contains(parent)));

        for root in roots {
            self.visit(root, 0, &mut visited, &mut out);
        }
        for (i, p) in self.processors.iter().enumerate() {
            if !visited[i] {
                visited[i] = true;
                out.push((0, p));
            }
        }
        out
    }

    fn visit<'a>(
        &'a self,
        p: &'a Processor,
        depth: usize,
        visited: &mut [bool],
        out: &mut Vec<(usize, &'a Processor)>,
    ) {
        let Some(&i) = self.index.get(&p.id) else {
            return;
        };
        if visited[i] || depth >= MAX_NESTING {
            return;
        }
        visited[i] = true;
        out.push((depth, p));
        for child in self.children(&p.id) {
            self.visit(child, depth + 1, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(id: &str, parent: Option<&str>) -> Processor {
        Processor {
            id: id.to_string(),
            name: id.to_uppercase(),
            parent: parent.map(str::to_string),
            kind: "processor".to_string(),
        }
    }

    fn conn(from: &str, to: &str) -> Connection {
        Connection {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn sample() -> Topology {
        Topology::from_snapshot(TopologySnapshot {
            processors: vec![
                proc("pipeline", None),
                proc("stt", Some("pipeline")),
                proc("llm", Some("pipeline")),
                proc("tts", None),
            ],
            connections: vec![conn("stt", "llm"), conn("llm", "tts")],
            versions: None,
        })
    }

    #[test]
    fn test_lookup_and_order() {
        let t = sample();
        assert_eq!(t.processors().len(), 4);
        assert_eq!(t.processor("llm").map(|p| p.name.as_str()), Some("LLM"));
        assert!(t.processor("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut first = proc("a", None);
        first.name = "first".to_string();
        let mut second = proc("a", None);
        second.name = "second".to_string();
        let t = Topology::from_snapshot(TopologySnapshot {
            processors: vec![first, second],
            ..Default::default()
        });
        assert_eq!(t.processors().len(), 1);
        assert_eq!(t.processor("a").unwrap().name, "first");
    }

    #[test]
    fn test_parent_children_depth() {
        let t = sample();
        assert_eq!(t.parent_of("stt").map(|p| p.id.as_str()), Some("pipeline"));
        let children: Vec<_> = t.children("pipeline").map(|p| p.id.as_str()).collect();
        assert_eq!(children, vec!["stt", "llm"]);
        assert_eq!(t.depth("pipeline"), 0);
        assert_eq!(t.depth("llm"), 1);
        assert_eq!(t.depth("unknown"), 0);
    }

    #[test]
    fn test_tree_order_depth_first() {
        let t = sample();
        let order: Vec<_> = t
            .tree_order()
            .into_iter()
            .map(|(d, p)| (d, p.id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(0, "pipeline"), (1, "stt"), (1, "llm"), (0, "tts")]
        );
    }

    #[test]
    fn test_cyclic_parents_do_not_hang() {
        let t = Topology::from_snapshot(TopologySnapshot {
            processors: vec![proc("a", Some("b")), proc("b", Some("a"))],
            ..Default::default()
        });
        assert!(t.depth("a") <= MAX_NESTING);
        let order = t.tree_order();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_edges_and_dangling() {
        let mut snapshot = TopologySnapshot {
            processors: vec![proc("a", None), proc("b", None)],
            connections: vec![conn("a", "b"), conn("b", "ghost")],
            versions: None,
        };
        snapshot.processors.push(proc("c", None));
        let t = Topology::from_snapshot(snapshot);

        assert_eq!(t.successors("a").collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(t.predecessors("b").collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(t.dangling_connections().count(), 1);
    }
}
