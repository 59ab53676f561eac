use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::graph::{ColorSource, Edge, GraphModel, Node, bfs_distances};
use crate::settings::RelevanceRange;

pub const DEFAULT_NODE_COLOR: Color32 = Color32::from_rgb(86, 156, 214);
pub const DEFAULT_EDGE_COLOR: Color32 = Color32::from_rgb(128, 134, 142);
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(246, 206, 104);
pub const SELECTED_STROKE_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub const FILTERED_EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(60, 60, 60, 60);

/// Number of fixed stops each gradient is sampled into.
const GRADIENT_STOPS: usize = 10;
const MAX_DEGREE_BUCKET: usize = 9;
const MIN_SEEDS: usize = 3;
const MAX_SEEDS: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Default,
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Rainbow,
    Turbo,
    Cividis,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 8] = [
        Self::Default,
        Self::Viridis,
        Self::Plasma,
        Self::Inferno,
        Self::Magma,
        Self::Rainbow,
        Self::Turbo,
        Self::Cividis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Inferno => "inferno",
            Self::Magma => "magma",
            Self::Rainbow => "rainbow",
            Self::Turbo => "turbo",
            Self::Cividis => "cividis",
        }
    }

    fn gradient(self) -> Option<colorous::Gradient> {
        match self {
            Self::Default => None,
            Self::Viridis => Some(colorous::VIRIDIS),
            Self::Plasma => Some(colorous::PLASMA),
            Self::Inferno => Some(colorous::INFERNO),
            Self::Magma => Some(colorous::MAGMA),
            Self::Rainbow => Some(colorous::RAINBOW),
            Self::Turbo => Some(colorous::TURBO),
            Self::Cividis => Some(colorous::CIVIDIS),
        }
    }

    /// Resolves `t` in [0, 1] to one of the scheme's fixed stops. Stops are
    /// picked by index, not blended.
    pub fn color_at(self, t: f32, fallback: Color32) -> Color32 {
        let Some(gradient) = self.gradient() else {
            return fallback;
        };
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let stop = (t * (GRADIENT_STOPS - 1) as f32).floor() as usize;
        let c = gradient.eval_continuous(stop as f64 / (GRADIENT_STOPS - 1) as f64);
        Color32::from_rgb(c.r, c.g, c.b)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunityDetection {
    #[default]
    None,
    /// Degree buckets: `min(degree / 2, 9)`. Not modularity optimization.
    Louvain,
    /// Nearest of a handful of evenly spaced seed nodes by hop distance. No
    /// edge-betweenness removal happens.
    GirvanNewman,
}

impl CommunityDetection {
    pub const ALL: [CommunityDetection; 3] = [Self::None, Self::Louvain, Self::GirvanNewman];

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Louvain => "louvain",
            Self::GirvanNewman => "girvan-newman",
        }
    }
}

/// Community id per node index.
pub fn detect_communities(model: &GraphModel, algorithm: CommunityDetection) -> Vec<usize> {
    match algorithm {
        CommunityDetection::Louvain => (0..model.nodes.len())
            .map(|index| (model.degree(index) / 2).min(MAX_DEGREE_BUCKET))
            .collect(),
        CommunityDetection::GirvanNewman => seed_distance_communities(model),
        CommunityDetection::None => model.nodes.iter().map(first_char_bucket).collect(),
    }
}

fn first_char_bucket(node: &Node) -> usize {
    node.id.chars().next().map_or(0, |c| c as usize % 10)
}

fn seed_distance_communities(model: &GraphModel) -> Vec<usize> {
    let node_count = model.nodes.len();
    if node_count == 0 {
        return Vec::new();
    }

    let seed_count = (node_count / 20).clamp(MIN_SEEDS, MAX_SEEDS).min(node_count);
    let seed_distances = (0..seed_count)
        .map(|seed| bfs_distances(model.adjacency(), seed * node_count / seed_count))
        .collect::<Vec<_>>();

    (0..node_count)
        .map(|index| {
            let mut best: Option<(usize, usize)> = None;
            for (community, distances) in seed_distances.iter().enumerate() {
                let Some(distance) = distances[index] else {
                    continue;
                };
                if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                    best = Some((community, distance));
                }
            }
            best.map_or(0, |(community, _)| community)
        })
        .collect()
}

/// Recolors scheme-driven nodes in place. Manually colored nodes keep their
/// color under every scheme. Deterministic for identical inputs.
pub fn apply_color_scheme(
    model: &mut GraphModel,
    scheme: ColorScheme,
    community: CommunityDetection,
) {
    if scheme == ColorScheme::Default {
        for node in &mut model.nodes {
            if node.color_source == ColorSource::Scheme {
                node.color = DEFAULT_NODE_COLOR;
            }
        }
        return;
    }

    let node_count = model.nodes.len();
    let positions = if community == CommunityDetection::None {
        let span = node_count.saturating_sub(1).max(1) as f32;
        (0..node_count).map(|index| index as f32 / span).collect::<Vec<_>>()
    } else {
        let communities = detect_communities(model, community);
        let max_community = communities.iter().copied().max().unwrap_or(0);
        communities
            .into_iter()
            .map(|id| {
                if max_community == 0 {
                    0.0
                } else {
                    id as f32 / max_community as f32
                }
            })
            .collect()
    };

    for (node, t) in model.nodes.iter_mut().zip(positions) {
        if node.color_source == ColorSource::Scheme {
            node.color = scheme.color_at(t, DEFAULT_NODE_COLOR);
        }
    }
}

pub fn set_manual_color(node: &mut Node, color: Color32) {
    node.color = color;
    node.color_source = ColorSource::Manual;
}

/// Hands the node back to the active scheme; call `apply_color_scheme` after.
pub fn clear_manual_color(node: &mut Node) {
    node.color_source = ColorSource::Scheme;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub color: Color32,
    pub width_scale: f32,
    pub in_range: bool,
}

/// Resolved stroke for an edge. Edges outside `range` are kept but grayed.
pub fn edge_style(edge: &Edge, scheme: ColorScheme, range: RelevanceRange) -> EdgeStyle {
    let in_range = range.contains(edge.relevance_score);
    if edge.highlighted {
        return EdgeStyle {
            color: HIGHLIGHT_COLOR,
            width_scale: 2.6,
            in_range,
        };
    }
    if !in_range {
        return EdgeStyle {
            color: FILTERED_EDGE_COLOR,
            width_scale: 0.6,
            in_range,
        };
    }

    EdgeStyle {
        color: scheme.color_at(edge.relevance_score, DEFAULT_EDGE_COLOR),
        width_scale: 1.0,
        in_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphPayload, RawEdge, RawNode};

    fn star_with_tail() -> GraphModel {
        // hub "h" linked to five leaves, plus a tail l0 - t
        let mut nodes = vec![RawNode::new("h", "Hub")];
        let mut edges = Vec::new();
        for leaf in 0..5 {
            let id = format!("l{leaf}");
            nodes.push(RawNode::new(id.clone(), id.clone()));
            edges.push(RawEdge::new("h", id, "spoke"));
        }
        nodes.push(RawNode::new("t", "Tail"));
        edges.push(RawEdge::new("l0", "t", "tail"));
        GraphModel::build(&GraphPayload { nodes, edges }, None)
    }

    #[test]
    fn degree_buckets_are_capped() {
        let mut nodes = vec![RawNode::new("hub", "hub")];
        let mut edges = Vec::new();
        for leaf in 0..30 {
            let id = format!("n{leaf}");
            nodes.push(RawNode::new(id.clone(), id.clone()));
            edges.push(RawEdge::new("hub", id, "x"));
        }
        let model = GraphModel::build(&GraphPayload { nodes, edges }, None);
        let communities = detect_communities(&model, CommunityDetection::Louvain);
        assert_eq!(communities[0], MAX_DEGREE_BUCKET);
        assert!(communities[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn louvain_label_buckets_by_half_degree() {
        let model = star_with_tail();
        let communities = detect_communities(&model, CommunityDetection::Louvain);
        // hub degree 5 -> 2, l0 degree 2 -> 1, other leaves degree 1 -> 0
        assert_eq!(communities, vec![2, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn seed_distance_assigns_nearest_seed_with_first_seed_winning_ties() {
        let model = star_with_tail();
        // 7 nodes -> 3 seeds at indices 0 (h), 2 (l1), 4 (l3)
        let communities = detect_communities(&model, CommunityDetection::GirvanNewman);
        assert_eq!(communities[0], 0);
        assert_eq!(communities[2], 1);
        assert_eq!(communities[4], 2);
        // l0 is one hop from h and two from l1/l3
        assert_eq!(communities[1], 0);
        // l2 is two hops from every seed except h (one hop)
        assert_eq!(communities[3], 0);
        // t is two hops from h, three from the others
        assert_eq!(communities[6], 0);
    }

    #[test]
    fn fallback_hashes_first_character() {
        let model = star_with_tail();
        let communities = detect_communities(&model, CommunityDetection::None);
        assert_eq!(communities[0], 'h' as usize % 10);
        assert_eq!(communities[6], 't' as usize % 10);
    }

    #[test]
    fn default_scheme_leaves_manual_colors_alone() {
        let mut model = star_with_tail();
        apply_color_scheme(&mut model, ColorScheme::Viridis, CommunityDetection::None);
        set_manual_color(&mut model.nodes[3], Color32::RED);

        apply_color_scheme(&mut model, ColorScheme::Default, CommunityDetection::None);

        assert_eq!(model.nodes[3].color, Color32::RED);
        assert!(
            model
                .nodes
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != 3)
                .all(|(_, node)| node.color == DEFAULT_NODE_COLOR)
        );
    }

    #[test]
    fn gradient_schemes_are_deterministic_and_piecewise() {
        let mut first = star_with_tail();
        let mut second = star_with_tail();
        apply_color_scheme(&mut first, ColorScheme::Plasma, CommunityDetection::Louvain);
        apply_color_scheme(&mut second, ColorScheme::Plasma, CommunityDetection::Louvain);

        let colors = first.nodes.iter().map(|node| node.color).collect::<Vec<_>>();
        assert_eq!(colors, second.nodes.iter().map(|node| node.color).collect::<Vec<_>>());
        // leaves share a bucket and therefore a color
        assert_eq!(colors[2], colors[3]);
        assert_ne!(colors[0], colors[2]);

        // values inside one stop resolve to the same color
        assert_eq!(
            ColorScheme::Viridis.color_at(0.0, Color32::BLACK),
            ColorScheme::Viridis.color_at(0.1, Color32::BLACK)
        );
        assert_ne!(
            ColorScheme::Viridis.color_at(0.0, Color32::BLACK),
            ColorScheme::Viridis.color_at(1.0, Color32::BLACK)
        );
    }

    #[test]
    fn clearing_manual_color_returns_node_to_scheme() {
        let mut model = star_with_tail();
        set_manual_color(&mut model.nodes[0], Color32::RED);
        clear_manual_color(&mut model.nodes[0]);
        apply_color_scheme(&mut model, ColorScheme::Default, CommunityDetection::None);
        assert_eq!(model.nodes[0].color, DEFAULT_NODE_COLOR);
    }

    #[test]
    fn out_of_range_edges_are_dimmed_not_removed() {
        let model = star_with_tail();
        let edge = &model.edges[0];
        let narrow = RelevanceRange {
            min: (edge.relevance_score + 0.01).min(1.0),
            max: 1.0,
        };
        let style = edge_style(edge, ColorScheme::Turbo, narrow);
        assert!(!style.in_range);
        assert_eq!(style.color, FILTERED_EDGE_COLOR);

        let full = edge_style(edge, ColorScheme::Default, RelevanceRange::default());
        assert!(full.in_range);
        assert_eq!(full.color, DEFAULT_EDGE_COLOR);
    }
}
