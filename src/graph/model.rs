use std::collections::{HashMap, HashSet};

use eframe::egui::{Color32, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::color::DEFAULT_NODE_COLOR;
use crate::util::{stable_hash, unit_interval};

use super::payload::GraphPayload;

/// Where a node's current color came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSource {
    #[default]
    Scheme,
    Manual,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub position: Option<Vec2>,
    pub fixed_position: Option<Vec2>,
    pub velocity: Vec2,
    pub selected: bool,
    pub highlighted: bool,
    pub color: Color32,
    pub color_source: ColorSource,
    pub tooltip_text: Option<String>,
}

impl Node {
    fn fresh(id: String, label: String) -> Self {
        Self {
            id,
            label,
            position: None,
            fixed_position: None,
            velocity: Vec2::ZERO,
            selected: false,
            highlighted: false,
            color: DEFAULT_NODE_COLOR,
            color_source: ColorSource::Scheme,
            tooltip_text: None,
        }
    }

    /// Carries layout, selection and styling state over from the same id in a
    /// previous load.
    fn carry_forward(&mut self, previous: &Node) {
        self.position = previous.position;
        self.fixed_position = previous.fixed_position;
        self.velocity = previous.velocity;
        self.selected = previous.selected;
        self.highlighted = previous.highlighted;
        self.color = previous.color;
        self.color_source = previous.color_source;
        self.tooltip_text = previous.tooltip_text.clone();
    }

    /// Marks the node selected and pins it where it currently is, keeping an
    /// existing pin untouched.
    pub fn select_and_pin(&mut self) {
        self.selected = true;
        if self.fixed_position.is_none() {
            let anchor = self.position.unwrap_or(Vec2::ZERO);
            self.position = Some(anchor);
            self.fixed_position = Some(anchor);
        }
    }

    pub fn deselect(&mut self) {
        self.selected = false;
        self.fixed_position = None;
    }

    pub fn pin_at(&mut self, position: Vec2) {
        self.position = Some(position);
        self.fixed_position = Some(position);
        self.velocity = Vec2::ZERO;
    }

    pub fn is_pinned(&self) -> bool {
        self.fixed_position.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub source: usize,
    pub target: usize,
    pub kind: String,
    pub relevance_score: f32,
    pub highlighted: bool,
    pub highlight_label: Option<String>,
}

impl Edge {
    pub fn other_end(&self, index: usize) -> usize {
        if self.source == index {
            self.target
        } else {
            self.source
        }
    }

    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// An edge rejected at ingestion because an endpoint did not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedEdge {
    pub position: usize,
    pub source_id: String,
    pub target_id: String,
    pub missing_source: bool,
    pub missing_target: bool,
}

/// Undirected neighbor lists, one per node index, sorted and deduplicated.
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

pub fn build_adjacency(node_count: usize, edges: &[Edge]) -> Adjacency {
    let mut neighbors = vec![Vec::new(); node_count];
    for edge in edges {
        if edge.source >= node_count || edge.target >= node_count || edge.is_self_loop() {
            continue;
        }
        neighbors[edge.source].push(edge.target);
        neighbors[edge.target].push(edge.source);
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }
    Adjacency { neighbors }
}

/// Deterministic per-edge score in [0, 1] derived from the edge's position
/// in the payload and its endpoint ids.
pub fn relevance_score(position: usize, source_id: &str, target_id: &str) -> f32 {
    // fixed width so 32 and 64 bit targets agree
    let position = (position as u64).to_le_bytes();
    unit_interval(stable_hash([
        position.as_slice(),
        source_id.as_bytes(),
        target_id.as_bytes(),
    ]))
}

#[derive(Clone, Debug, Default)]
pub struct GraphModel {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub dropped_edges: Vec<DroppedEdge>,
    index_by_id: HashMap<String, usize>,
    adjacency: Adjacency,
    incident: Vec<Vec<usize>>,
    revision: u64,
}

impl GraphModel {
    /// Normalizes a payload into simulation-ready nodes and edges, carrying
    /// state forward from `previous` by node id.
    pub fn build(payload: &GraphPayload, previous: Option<&GraphModel>) -> Self {
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        let mut index_by_id = HashMap::with_capacity(payload.nodes.len());

        for raw in &payload.nodes {
            if index_by_id.contains_key(&raw.id) {
                tracing::warn!(id = %raw.id, "duplicate node id in payload, keeping first occurrence");
                continue;
            }

            let mut node = Node::fresh(raw.id.clone(), raw.display_label().to_owned());
            if let Some(prior) = previous.and_then(|model| model.node_by_id(&raw.id)) {
                node.carry_forward(prior);
            }
            index_by_id.insert(raw.id.clone(), nodes.len());
            nodes.push(node);
        }

        let previous_edges = previous
            .map(|model| {
                model
                    .edges
                    .iter()
                    .map(|edge| {
                        (
                            (edge.source_id.as_str(), edge.target_id.as_str(), edge.kind.as_str()),
                            edge,
                        )
                    })
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        let mut edges = Vec::with_capacity(payload.edges.len());
        let mut dropped_edges = Vec::new();
        for (position, raw) in payload.edges.iter().enumerate() {
            let source = index_by_id.get(&raw.source).copied();
            let target = index_by_id.get(&raw.target).copied();
            let (Some(source), Some(target)) = (source, target) else {
                tracing::warn!(
                    position,
                    source = %raw.source,
                    target = %raw.target,
                    "dropping edge with unresolved endpoint"
                );
                dropped_edges.push(DroppedEdge {
                    position,
                    source_id: raw.source.clone(),
                    target_id: raw.target.clone(),
                    missing_source: source.is_none(),
                    missing_target: target.is_none(),
                });
                continue;
            };

            let previous_edge = previous_edges
                .get(&(raw.source.as_str(), raw.target.as_str(), raw.kind()))
                .copied();

            edges.push(Edge {
                source_id: raw.source.clone(),
                target_id: raw.target.clone(),
                source,
                target,
                kind: raw.kind().to_owned(),
                relevance_score: relevance_score(position, &raw.source, &raw.target),
                highlighted: previous_edge.is_some_and(|edge| edge.highlighted),
                highlight_label: previous_edge.and_then(|edge| edge.highlight_label.clone()),
            });
        }

        if !dropped_edges.is_empty() {
            tracing::warn!(
                dropped = dropped_edges.len(),
                kept = edges.len(),
                "graph loaded with dangling edges removed"
            );
        }

        let mut model = Self {
            nodes,
            edges,
            dropped_edges,
            index_by_id,
            adjacency: Adjacency::default(),
            incident: Vec::new(),
            revision: previous.map_or(0, |model| model.revision.wrapping_add(1)),
        };
        model.rebuild_indices();
        model
    }

    fn rebuild_indices(&mut self) {
        self.adjacency = build_adjacency(self.nodes.len(), &self.edges);
        self.incident = vec![Vec::new(); self.nodes.len()];
        for (edge_index, edge) in self.edges.iter().enumerate() {
            self.incident[edge.source].push(edge_index);
            if !edge.is_self_loop() {
                self.incident[edge.target].push(edge_index);
            }
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.neighbors(index)
    }

    /// Edge indices touching `index`; a self-loop is listed once.
    pub fn incident_edges(&self, index: usize) -> &[usize] {
        self.incident.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, index: usize) -> usize {
        self.incident_edges(index).len()
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.selected.then_some(index))
            .collect()
    }

    pub fn selected_ids(&self) -> HashSet<&str> {
        self.nodes
            .iter()
            .filter(|node| node.selected)
            .map(|node| node.id.as_str())
            .collect()
    }

    /// Fuzzy-ranks nodes by label, falling back to id, best match first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<usize> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default();
        let mut ranked = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let by_label = matcher.fuzzy_match(&node.label, query);
                let by_id = matcher.fuzzy_match(&node.id, query);
                by_label.max(by_id).map(|score| (score, index))
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.truncate(limit);
        ranked.into_iter().map(|(_, index)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::payload::{RawEdge, RawNode};

    fn chain_payload() -> GraphPayload {
        GraphPayload {
            nodes: vec![
                RawNode::new("a", "Alpha"),
                RawNode::new("b", "Beta"),
                RawNode::new("c", "Gamma"),
                RawNode::new("d", "Delta"),
            ],
            edges: vec![
                RawEdge::new("a", "b", "discovered"),
                RawEdge::new("b", "c", "cites"),
                RawEdge::new("c", "d", "extends"),
            ],
        }
    }

    #[test]
    fn dangling_edges_are_dropped_and_reported() {
        let mut payload = chain_payload();
        payload.edges.push(RawEdge::new("a", "ghost", "x"));
        payload.edges.push(RawEdge::new("phantom", "ghost", "y"));

        let model = GraphModel::build(&payload, None);

        assert_eq!(model.edges.len(), 3);
        assert_eq!(model.dropped_edges.len(), 2);
        assert_eq!(model.dropped_edges[0].position, 3);
        assert!(!model.dropped_edges[0].missing_source);
        assert!(model.dropped_edges[0].missing_target);
        assert!(model.dropped_edges[1].missing_source);
        assert!(model.edges.iter().all(|edge| edge.source < 4 && edge.target < 4));
    }

    #[test]
    fn relevance_scores_are_stable_across_builds() {
        let payload = chain_payload();
        let first = GraphModel::build(&payload, None);
        let second = GraphModel::build(&payload, Some(&first));

        for (a, b) in first.edges.iter().zip(&second.edges) {
            assert_eq!(a.relevance_score, b.relevance_score);
            assert!((0.0..=1.0).contains(&a.relevance_score));
        }
        assert_ne!(first.edges[0].relevance_score, first.edges[1].relevance_score);
    }

    #[test]
    fn relevance_score_hashes_position_as_eight_bytes() {
        let expected = unit_interval(stable_hash([
            7u64.to_le_bytes().as_slice(),
            b"a".as_slice(),
            b"b".as_slice(),
        ]));
        assert_eq!(relevance_score(7, "a", "b"), expected);
    }

    #[test]
    fn reload_carries_selection_and_pins_forward() {
        let payload = chain_payload();
        let mut first = GraphModel::build(&payload, None);
        first.nodes[1].position = Some(Vec2::new(12.0, -4.0));
        first.nodes[1].select_and_pin();
        first.nodes[2].position = Some(Vec2::new(3.0, 3.0));
        first.nodes[2].color = Color32::RED;
        first.nodes[2].color_source = ColorSource::Manual;

        let mut reordered = payload.clone();
        reordered.nodes.reverse();
        let second = GraphModel::build(&reordered, Some(&first));

        let beta = second.node_by_id("b").unwrap();
        assert!(beta.selected);
        assert_eq!(beta.fixed_position, Some(Vec2::new(12.0, -4.0)));
        let gamma = second.node_by_id("c").unwrap();
        assert_eq!(gamma.color, Color32::RED);
        assert_eq!(gamma.color_source, ColorSource::Manual);
        assert_eq!(second.revision(), first.revision() + 1);
    }

    #[test]
    fn new_nodes_start_unplaced_and_unselected() {
        let model = GraphModel::build(&chain_payload(), None);
        for node in &model.nodes {
            assert!(node.position.is_none());
            assert!(node.fixed_position.is_none());
            assert!(!node.selected);
            assert_eq!(node.velocity, Vec2::ZERO);
            assert_eq!(node.color, DEFAULT_NODE_COLOR);
        }
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut payload = chain_payload();
        payload.nodes.push(RawNode::new("a", "Imposter"));
        let model = GraphModel::build(&payload, None);

        assert_eq!(model.nodes.len(), 4);
        assert_eq!(model.node_by_id("a").unwrap().label, "Alpha");
    }

    #[test]
    fn adjacency_is_undirected_and_deduplicated() {
        let mut payload = chain_payload();
        payload.edges.push(RawEdge::new("b", "a", "again"));
        payload.edges.push(RawEdge::new("d", "d", "self"));
        let model = GraphModel::build(&payload, None);

        assert_eq!(model.neighbors(0), &[1]);
        assert_eq!(model.neighbors(1), &[0, 2]);
        assert_eq!(model.neighbors(3), &[2]);
        assert_eq!(model.degree(1), 3);
        assert_eq!(model.degree(3), 2);
    }

    #[test]
    fn empty_payload_builds_empty_model() {
        let model = GraphModel::build(&GraphPayload::default(), None);
        assert!(model.is_empty());
        assert!(model.adjacency().is_empty());
        assert!(model.neighbors(0).is_empty());
        assert!(model.search("anything", 5).is_empty());
    }

    #[test]
    fn search_prefers_best_label_match() {
        let model = GraphModel::build(&chain_payload(), None);
        let hits = model.search("gam", 3);
        assert_eq!(hits.first().copied(), Some(2));
        assert!(model.search("   ", 3).is_empty());
    }
}
