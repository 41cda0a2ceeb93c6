//! The graph kernel: a typed, labeled multi-digraph with ordered edges.
//!
//! [`Graph`] is the data structure every other component operates on.
//! Function graphs and pattern graphs are both instances of it; the matcher,
//! the op-structure transformations, and the model builder only ever talk to
//! the operations defined here.
//!
//! # Identity
//!
//! Nodes have two identities. The *public* [`NodeId`] is the stable
//! identifier external consumers see; it survives transformations, and two
//! node instances may deliberately share one (the matcher's duplication
//! pre-pass relies on this). The *internal* [`NodeRef`] names one node
//! instance of one graph value; all kernel operations take and return
//! `NodeRef`s. The same split applies to edges via [`EdgeRef`].
//!
//! # Edge numbering
//!
//! [`add_edge`](Graph::add_edge) assigns the next unused out-number at the
//! source and in-number at the target, scoped to the edge kind, so a freshly
//! built graph has contiguous numbers starting at 0 within every
//! (endpoint, kind) scope. Mutating operations that move edges
//! ([`update_edge_source`](Graph::update_edge_source),
//! [`merge_nodes`](Graph::merge_nodes), …) assign fresh numbers on the new
//! endpoint and leave the vacated number unused; consumers that need
//! contiguity after a batch of such updates call
//! [`repack_edge_numbers`](Graph::repack_edge_numbers).

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    ir::{
        edge::{Direction, EdgeKind, EdgeLabel},
        id::NodeId,
        node::NodeKind,
    },
    Error, Result,
};

/// Internal identity of one node instance within one [`Graph`].
///
/// A `NodeRef` is only meaningful for the graph it was obtained from and
/// becomes stale when that node is deleted. Use
/// [`Graph::contains`] to test liveness.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    /// Returns the raw slot index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.0)
    }
}

/// Internal identity of one edge instance within one [`Graph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeRef(pub(crate) usize);

impl EdgeRef {
    /// Returns the raw slot index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeRef({})", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    id: NodeId,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
struct EdgeSlot {
    source: NodeRef,
    target: NodeRef,
    label: EdgeLabel,
}

/// A typed, labeled multi-digraph with ordered edges.
///
/// See the [module documentation](self) for the identity and edge-numbering
/// contracts. Node payloads are [`NodeKind`] values; edge payloads are
/// [`EdgeLabel`]s (kind plus the two per-endpoint numbers).
///
/// Deleted slots are tombstoned, so `NodeRef`/`EdgeRef` values for the
/// surviving entities remain valid across deletions.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<NodeSlot>>,
    edges: Vec<Option<EdgeSlot>>,
    outgoing: Vec<Vec<EdgeRef>>,
    incoming: Vec<Vec<EdgeRef>>,
}

impl Graph {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Graph::default()
    }

    /// Returns `true` if the graph contains no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|slot| slot.is_some()).count()
    }

    // ------------------------------------------------------------------
    // Node operations
    // ------------------------------------------------------------------

    /// Adds a node, assigning a fresh public identifier.
    ///
    /// The fresh identifier is one larger than the largest identifier
    /// present, or 0 for an empty graph.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeRef {
        let id = self
            .nodes
            .iter()
            .flatten()
            .map(|slot| slot.id.raw())
            .max()
            .map_or(0, |max| max + 1);
        self.add_node_with_id(NodeId::new(id), kind)
    }

    /// Adds a node carrying the given public identifier.
    ///
    /// The identifier is not required to be fresh: adding a second node with
    /// an identifier already present denotes "the same logical node" (only
    /// the matcher's duplication pre-pass and deserialization do this).
    pub fn add_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> NodeRef {
        let node = NodeRef(self.nodes.len());
        self.nodes.push(Some(NodeSlot { id, kind }));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        node
    }

    /// Returns `true` if the node is live in this graph.
    #[must_use]
    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes
            .get(node.0)
            .is_some_and(|slot| slot.is_some())
    }

    /// Returns `true` if the edge is live in this graph.
    #[must_use]
    pub fn contains_edge(&self, edge: EdgeRef) -> bool {
        self.edges
            .get(edge.0)
            .is_some_and(|slot| slot.is_some())
    }

    fn node_slot(&self, node: NodeRef) -> &NodeSlot {
        self.nodes[node.0]
            .as_ref()
            .expect("stale NodeRef passed to graph operation")
    }

    fn edge_slot(&self, edge: EdgeRef) -> &EdgeSlot {
        self.edges[edge.0]
            .as_ref()
            .expect("stale EdgeRef passed to graph operation")
    }

    /// Returns the public identifier of a node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn node_id(&self, node: NodeRef) -> NodeId {
        self.node_slot(node).id
    }

    /// Returns the kind of a node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn node_kind(&self, node: NodeRef) -> &NodeKind {
        &self.node_slot(node).kind
    }

    /// Replaces the kind of a node, keeping its identity and edges.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    pub fn set_node_kind(&mut self, node: NodeRef, kind: NodeKind) {
        self.nodes[node.0]
            .as_mut()
            .expect("stale NodeRef passed to graph operation")
            .kind = kind;
    }

    /// Returns the first live node carrying the given public identifier.
    #[must_use]
    pub fn find_node(&self, id: NodeId) -> Option<NodeRef> {
        self.node_refs().find(|&n| self.node_id(n) == id)
    }

    /// Returns every live node carrying the given public identifier.
    #[must_use]
    pub fn nodes_with_id(&self, id: NodeId) -> Vec<NodeRef> {
        self.node_refs().filter(|&n| self.node_id(n) == id).collect()
    }

    /// Returns an iterator over all live nodes.
    pub fn node_refs(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| NodeRef(i))
    }

    /// Returns an iterator over all live nodes with their kinds.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeRef, &NodeKind)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (NodeRef(i), &s.kind)))
    }

    /// Deletes a node and every edge incident on it.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    pub fn delete_node(&mut self, node: NodeRef) {
        let incident: Vec<EdgeRef> = self
            .incoming[node.0]
            .iter()
            .chain(self.outgoing[node.0].iter())
            .copied()
            .collect();
        for edge in incident {
            if self.contains_edge(edge) {
                self.delete_edge(edge);
            }
        }
        assert!(
            self.nodes[node.0].take().is_some(),
            "stale NodeRef passed to graph operation"
        );
    }

    /// Deletes a node, redirecting its outgoing edges to its unique
    /// predecessor.
    ///
    /// The edges from the predecessor into `node` are removed together with
    /// the node, so a chain `p -> node -> s` becomes `p -> s`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the node does not have exactly one
    /// distinct predecessor.
    pub fn delete_node_keep_edges(&mut self, node: NodeRef) -> Result<()> {
        let preds: FxHashSet<NodeRef> = self.predecessors(node).collect();
        if preds.len() != 1 {
            return Err(Error::precondition(
                "delete_node_keep_edges",
                format!(
                    "node {} has {} distinct predecessors, expected exactly 1",
                    self.node_id(node),
                    preds.len()
                ),
            ));
        }
        let pred = *preds.iter().next().expect("checked non-empty");
        let out: Vec<EdgeRef> = self.outgoing[node.0].clone();
        for edge in out {
            self.update_edge_source(edge, pred)?;
        }
        self.delete_node(node);
        Ok(())
    }

    /// Redirects every edge incident on `discard` to `keep`, then deletes
    /// `discard`.
    ///
    /// Edges running between the two nodes (in either direction) would become
    /// self-loops; they are removed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the two refs name the same node.
    pub fn merge_nodes(&mut self, keep: NodeRef, discard: NodeRef) -> Result<()> {
        if keep == discard {
            return Err(Error::GraphError(format!(
                "cannot merge node {} with itself",
                self.node_id(keep)
            )));
        }
        for edge in self.edges_between(keep, discard) {
            self.delete_edge(edge);
        }
        for edge in self.edges_between(discard, keep) {
            self.delete_edge(edge);
        }
        self.redirect_in_edges(discard, keep)?;
        self.redirect_out_edges(discard, keep)?;
        self.delete_node(discard);
        Ok(())
    }

    /// Redirects every edge entering `from` so that it enters `to` instead.
    ///
    /// Each moved edge receives the next unused in-number at `to` for its
    /// kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `to` is stale.
    pub fn redirect_in_edges(&mut self, from: NodeRef, to: NodeRef) -> Result<()> {
        let edges: Vec<EdgeRef> = self.incoming[from.0].clone();
        for edge in edges {
            self.update_edge_target(edge, to)?;
        }
        Ok(())
    }

    /// Redirects every edge leaving `from` so that it leaves `to` instead.
    ///
    /// Each moved edge receives the next unused out-number at `to` for its
    /// kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `to` is stale.
    pub fn redirect_out_edges(&mut self, from: NodeRef, to: NodeRef) -> Result<()> {
        let edges: Vec<EdgeRef> = self.outgoing[from.0].clone();
        for edge in edges {
            self.update_edge_source(edge, to)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edge operations
    // ------------------------------------------------------------------

    /// Adds an edge of the given kind, assigning the next unused out-number
    /// at `source` and in-number at `target` for that kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is stale.
    pub fn add_edge(&mut self, kind: EdgeKind, source: NodeRef, target: NodeRef) -> Result<EdgeRef> {
        let out_nr = self.next_edge_number(source, kind, Direction::Out)?;
        let in_nr = self.next_edge_number(target, kind, Direction::In)?;
        self.add_edge_with_numbers(kind, source, target, out_nr, in_nr)
    }

    /// Adds an edge with explicitly chosen edge numbers.
    ///
    /// Used when reconstructing a graph whose numbering must be preserved
    /// verbatim (subgraph extraction, deserialization, the matcher's
    /// duplication pre-pass). The caller is responsible for keeping numbers
    /// unique within their (endpoint, kind) scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is stale.
    pub fn add_edge_with_numbers(
        &mut self,
        kind: EdgeKind,
        source: NodeRef,
        target: NodeRef,
        out_nr: u32,
        in_nr: u32,
    ) -> Result<EdgeRef> {
        if !self.contains(source) {
            return Err(Error::GraphError(format!(
                "edge source {source:?} is not in the graph"
            )));
        }
        if !self.contains(target) {
            return Err(Error::GraphError(format!(
                "edge target {target:?} is not in the graph"
            )));
        }
        let edge = EdgeRef(self.edges.len());
        self.edges.push(Some(EdgeSlot {
            source,
            target,
            label: EdgeLabel { kind, out_nr, in_nr },
        }));
        self.outgoing[source.0].push(edge);
        self.incoming[target.0].push(edge);
        Ok(edge)
    }

    /// Deletes an edge.
    ///
    /// The numbers it occupied are left unused; they are not backfilled.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    pub fn delete_edge(&mut self, edge: EdgeRef) {
        let slot = self.edges[edge.0]
            .take()
            .expect("stale EdgeRef passed to graph operation");
        self.outgoing[slot.source.0].retain(|&e| e != edge);
        self.incoming[slot.target.0].retain(|&e| e != edge);
    }

    /// Returns the label of an edge.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    #[must_use]
    pub fn edge_label(&self, edge: EdgeRef) -> EdgeLabel {
        self.edge_slot(edge).label
    }

    /// Returns the source node of an edge.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    #[must_use]
    pub fn edge_source(&self, edge: EdgeRef) -> NodeRef {
        self.edge_slot(edge).source
    }

    /// Returns the target node of an edge.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    #[must_use]
    pub fn edge_target(&self, edge: EdgeRef) -> NodeRef {
        self.edge_slot(edge).target
    }

    /// Returns an iterator over all live edges.
    pub fn edge_refs(&self) -> impl Iterator<Item = EdgeRef> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| EdgeRef(i))
    }

    /// Reassigns the source endpoint of an edge.
    ///
    /// The edge receives the next unused out-number at the new source for
    /// its kind; the number vacated at the old source is left unused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `new_source` is stale.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    pub fn update_edge_source(&mut self, edge: EdgeRef, new_source: NodeRef) -> Result<()> {
        let kind = self.edge_label(edge).kind;
        let new_nr = self.next_edge_number(new_source, kind, Direction::Out)?;
        let slot = self.edges[edge.0]
            .as_mut()
            .expect("stale EdgeRef passed to graph operation");
        let old_source = slot.source;
        slot.source = new_source;
        slot.label.out_nr = new_nr;
        self.outgoing[old_source.0].retain(|&e| e != edge);
        self.outgoing[new_source.0].push(edge);
        Ok(())
    }

    /// Reassigns the target endpoint of an edge.
    ///
    /// The edge receives the next unused in-number at the new target for its
    /// kind; the number vacated at the old target is left unused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `new_target` is stale.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is stale.
    pub fn update_edge_target(&mut self, edge: EdgeRef, new_target: NodeRef) -> Result<()> {
        let kind = self.edge_label(edge).kind;
        let new_nr = self.next_edge_number(new_target, kind, Direction::In)?;
        let slot = self.edges[edge.0]
            .as_mut()
            .expect("stale EdgeRef passed to graph operation");
        let old_target = slot.target;
        slot.target = new_target;
        slot.label.in_nr = new_nr;
        self.incoming[old_target.0].retain(|&e| e != edge);
        self.incoming[new_target.0].push(edge);
        Ok(())
    }

    fn next_edge_number(&self, node: NodeRef, kind: EdgeKind, dir: Direction) -> Result<u32> {
        if !self.contains(node) {
            return Err(Error::GraphError(format!(
                "endpoint {node:?} is not in the graph"
            )));
        }
        Ok(self
            .edge_numbers(node, kind, dir)
            .last()
            .map_or(0, |max| max + 1))
    }

    /// Re-packs the edge numbers of every (endpoint, kind) scope so that
    /// they are contiguous starting at 0 again, preserving relative order.
    ///
    /// Intended to be called once after a batch of edge-moving updates, never
    /// from within a single-edge operation (consumers depend on numbers
    /// staying stable during a transaction).
    pub fn repack_edge_numbers(&mut self) {
        for node in 0..self.nodes.len() {
            if self.nodes[node].is_none() {
                continue;
            }
            for kind in EdgeKind::ALL {
                let mut out: Vec<EdgeRef> = self.outgoing[node]
                    .iter()
                    .copied()
                    .filter(|&e| self.edge_label(e).kind == kind)
                    .collect();
                out.sort_by_key(|&e| self.edge_label(e).out_nr);
                for (nr, edge) in out.into_iter().enumerate() {
                    self.edges[edge.0]
                        .as_mut()
                        .expect("live edge in adjacency list")
                        .label
                        .out_nr = nr as u32;
                }
                let mut inn: Vec<EdgeRef> = self.incoming[node]
                    .iter()
                    .copied()
                    .filter(|&e| self.edge_label(e).kind == kind)
                    .collect();
                inn.sort_by_key(|&e| self.edge_label(e).in_nr);
                for (nr, edge) in inn.into_iter().enumerate() {
                    self.edges[edge.0]
                        .as_mut()
                        .expect("live edge in adjacency list")
                        .label
                        .in_nr = nr as u32;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns an iterator over the edges entering a node.
    pub fn in_edges(&self, node: NodeRef) -> impl Iterator<Item = EdgeRef> + '_ {
        self.incoming[node.0].iter().copied()
    }

    /// Returns an iterator over the edges leaving a node.
    pub fn out_edges(&self, node: NodeRef) -> impl Iterator<Item = EdgeRef> + '_ {
        self.outgoing[node.0].iter().copied()
    }

    /// Returns an iterator over the edges of one kind entering a node.
    pub fn in_edges_of_kind(
        &self,
        node: NodeRef,
        kind: EdgeKind,
    ) -> impl Iterator<Item = EdgeRef> + '_ {
        self.in_edges(node)
            .filter(move |&e| self.edge_label(e).kind == kind)
    }

    /// Returns an iterator over the edges of one kind leaving a node.
    pub fn out_edges_of_kind(
        &self,
        node: NodeRef,
        kind: EdgeKind,
    ) -> impl Iterator<Item = EdgeRef> + '_ {
        self.out_edges(node)
            .filter(move |&e| self.edge_label(e).kind == kind)
    }

    /// Returns an iterator over the predecessors of a node across all edge
    /// kinds (with multiplicity).
    pub fn predecessors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.in_edges(node).map(|e| self.edge_source(e))
    }

    /// Returns an iterator over the successors of a node across all edge
    /// kinds (with multiplicity).
    pub fn successors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.out_edges(node).map(|e| self.edge_target(e))
    }

    /// Returns an iterator over the predecessors of a node restricted to one
    /// edge kind.
    pub fn predecessors_via(
        &self,
        node: NodeRef,
        kind: EdgeKind,
    ) -> impl Iterator<Item = NodeRef> + '_ {
        self.in_edges_of_kind(node, kind).map(|e| self.edge_source(e))
    }

    /// Returns an iterator over the successors of a node restricted to one
    /// edge kind.
    pub fn successors_via(
        &self,
        node: NodeRef,
        kind: EdgeKind,
    ) -> impl Iterator<Item = NodeRef> + '_ {
        self.out_edges_of_kind(node, kind).map(|e| self.edge_target(e))
    }

    /// Returns the distinct neighbours of a node in both directions.
    #[must_use]
    pub fn neighbours(&self, node: NodeRef) -> FxHashSet<NodeRef> {
        self.predecessors(node)
            .chain(self.successors(node))
            .collect()
    }

    /// Returns every edge running from `source` to `target`.
    #[must_use]
    pub fn edges_between(&self, source: NodeRef, target: NodeRef) -> Vec<EdgeRef> {
        self.outgoing[source.0]
            .iter()
            .copied()
            .filter(|&e| self.edge_target(e) == target)
            .collect()
    }

    /// Sorts the given edges ascending by their in-number.
    #[must_use]
    pub fn sorted_by_in_number(&self, edges: impl IntoIterator<Item = EdgeRef>) -> Vec<EdgeRef> {
        let mut sorted: Vec<EdgeRef> = edges.into_iter().collect();
        sorted.sort_by_key(|&e| self.edge_label(e).in_nr);
        sorted
    }

    /// Sorts the given edges ascending by their out-number.
    #[must_use]
    pub fn sorted_by_out_number(&self, edges: impl IntoIterator<Item = EdgeRef>) -> Vec<EdgeRef> {
        let mut sorted: Vec<EdgeRef> = edges.into_iter().collect();
        sorted.sort_by_key(|&e| self.edge_label(e).out_nr);
        sorted
    }

    /// Returns the sorted edge numbers at a node for one kind and direction.
    #[must_use]
    pub fn edge_numbers(&self, node: NodeRef, kind: EdgeKind, dir: Direction) -> Vec<u32> {
        let mut numbers: Vec<u32> = match dir {
            Direction::In => self
                .in_edges_of_kind(node, kind)
                .map(|e| self.edge_label(e).in_nr)
                .collect(),
            Direction::Out => self
                .out_edges_of_kind(node, kind)
                .map(|e| self.edge_label(e).out_nr)
                .collect(),
        };
        numbers.sort_unstable();
        numbers
    }

    /// Returns the number of *distinct* edge numbers at a node for one kind
    /// and direction.
    ///
    /// Parallel edges sharing a number count once.
    #[must_use]
    pub fn distinct_edge_numbers(&self, node: NodeRef, kind: EdgeKind, dir: Direction) -> usize {
        let mut numbers = self.edge_numbers(node, kind, dir);
        numbers.dedup();
        numbers.len()
    }

    /// Extracts the subgraph induced by a set of nodes.
    ///
    /// Node identifiers, kinds, and the labels of the surviving edges are
    /// preserved verbatim (edge numbers are *not* re-packed). The returned
    /// map translates refs of this graph to refs of the extracted one.
    #[must_use]
    pub fn extract_subgraph(
        &self,
        keep: &FxHashSet<NodeRef>,
    ) -> (Graph, FxHashMap<NodeRef, NodeRef>) {
        let mut sub = Graph::new();
        let mut map: FxHashMap<NodeRef, NodeRef> = FxHashMap::default();
        for node in self.node_refs().filter(|n| keep.contains(n)) {
            let new = sub.add_node_with_id(self.node_id(node), self.node_kind(node).clone());
            map.insert(node, new);
        }
        for edge in self.edge_refs() {
            let (src, dst) = (self.edge_source(edge), self.edge_target(edge));
            if let (Some(&new_src), Some(&new_dst)) = (map.get(&src), map.get(&dst)) {
                let label = self.edge_label(edge);
                sub.add_edge_with_numbers(label.kind, new_src, new_dst, label.out_nr, label.in_nr)
                    .expect("endpoints were just added");
            }
        }
        (sub, map)
    }
}

// ----------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct NodeRepr {
    id: NodeId,
    kind: NodeKind,
}

#[derive(Serialize, Deserialize)]
struct EdgeRepr {
    source: usize,
    target: usize,
    kind: EdgeKind,
    #[serde(rename = "out-nr")]
    out_nr: u32,
    #[serde(rename = "in-nr")]
    in_nr: u32,
}

#[derive(Serialize, Deserialize)]
struct GraphRepr {
    nodes: Vec<NodeRepr>,
    edges: Vec<EdgeRepr>,
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let order: Vec<NodeRef> = self.node_refs().collect();
        let position: FxHashMap<NodeRef, usize> =
            order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let repr = GraphRepr {
            nodes: order
                .iter()
                .map(|&n| NodeRepr {
                    id: self.node_id(n),
                    kind: self.node_kind(n).clone(),
                })
                .collect(),
            edges: self
                .edge_refs()
                .map(|e| {
                    let label = self.edge_label(e);
                    EdgeRepr {
                        source: position[&self.edge_source(e)],
                        target: position[&self.edge_target(e)],
                        kind: label.kind,
                        out_nr: label.out_nr,
                        in_nr: label.in_nr,
                    }
                })
                .collect(),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = GraphRepr::deserialize(deserializer)?;
        let mut graph = Graph::new();
        let refs: Vec<NodeRef> = repr
            .nodes
            .into_iter()
            .map(|n| graph.add_node_with_id(n.id, n.kind))
            .collect();
        for edge in repr.edges {
            let src = *refs
                .get(edge.source)
                .ok_or_else(|| D::Error::custom(format!("edge source {} out of range", edge.source)))?;
            let dst = *refs
                .get(edge.target)
                .ok_or_else(|| D::Error::custom(format!("edge target {} out of range", edge.target)))?;
            graph
                .add_edge_with_numbers(edge.kind, src, dst, edge.out_nr, edge.in_nr)
                .map_err(|e| D::Error::custom(e.to_string()))?;
        }
        Ok(graph)
    }
}
