//! Node selection and pinning driven by clicks and drags.
//!
//! Every handler leaves the model consistent before returning: a node is
//! pinned exactly when it is selected. Modifier keys are not read here; the
//! host resolves them into a [`ClickMode`] or the `group` flag of a drag.

use eframe::egui::Vec2;

use crate::graph::{GraphModel, nodes_at_layer, nodes_within};
use crate::physics::Reheat;

/// What a click means, as decided by the host from held modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClickMode {
    /// Select and pin the clicked node.
    #[default]
    Plain,
    /// Deselect the clicked node, or everything when clicking the background.
    Deselect,
    /// Grow the selection one hop per repeated click on the same node.
    Neighborhood,
    /// Select only the nodes exactly k hops away, k growing per repeated click.
    ExactLayer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    ClickNode { node: usize, mode: ClickMode },
    ClickBackground { mode: ClickMode },
    DragStart { node: usize },
    /// `position` is the dragged node's new world position; `group` moves the
    /// rest of the selection by the same offset.
    DragMove { node: usize, position: Vec2, group: bool },
    DragEnd { node: usize, position: Vec2 },
}

/// Repeated-click expansion state for one selection mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub source: Option<String>,
    pub depth: usize,
}

impl Anchor {
    fn is_source(&self, id: &str) -> bool {
        self.source.as_deref() == Some(id)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug)]
struct DragSession {
    node: usize,
    start: Vec2,
    /// Start positions of the other selected nodes, captured once.
    group_starts: Vec<(usize, Vec2)>,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionController {
    neighborhood: Anchor,
    exact_layer: Anchor,
    drag: Option<DragSession>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn neighborhood_anchor(&self) -> &Anchor {
        &self.neighborhood
    }

    pub fn exact_layer_anchor(&self) -> &Anchor {
        &self.exact_layer
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_node(&self) -> Option<usize> {
        self.drag.as_ref().map(|drag| drag.node)
    }

    /// Drops an in-flight drag whose indices no longer match the model.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn selected_indices(&self, model: &GraphModel) -> Vec<usize> {
        model.selected_indices()
    }

    /// Applies one input event and returns the reheat the layout should get.
    pub fn apply(&mut self, model: &mut GraphModel, interaction: Interaction) -> Option<Reheat> {
        match interaction {
            Interaction::ClickNode { node, mode } => {
                if node >= model.nodes.len() {
                    tracing::warn!(node, "click on unknown node index");
                    return None;
                }
                match mode {
                    ClickMode::Plain => {
                        model.nodes[node].select_and_pin();
                        None
                    }
                    ClickMode::Deselect => {
                        self.deselect_node(model, node);
                        Some(Reheat::Moderate)
                    }
                    ClickMode::Neighborhood => {
                        self.select_neighborhood(model, node);
                        Some(Reheat::Gentle)
                    }
                    ClickMode::ExactLayer => {
                        self.select_exact_layer(model, node);
                        Some(Reheat::Gentle)
                    }
                }
            }
            Interaction::ClickBackground { mode } => match mode {
                ClickMode::Deselect => {
                    self.deselect_all(model);
                    Some(Reheat::Major)
                }
                ClickMode::Plain | ClickMode::Neighborhood | ClickMode::ExactLayer => None,
            },
            Interaction::DragStart { node } => {
                self.drag_start(model, node);
                self.drag.as_ref().map(|_| Reheat::Gentle)
            }
            Interaction::DragMove {
                node,
                position,
                group,
            } => {
                self.drag_move(model, node, position, group);
                None
            }
            Interaction::DragEnd { node, position } => {
                self.drag_end(model, node, position);
                None
            }
        }
    }

    /// Clears every selection, pin and anchor.
    pub fn deselect_all(&mut self, model: &mut GraphModel) {
        for node in &mut model.nodes {
            node.deselect();
        }
        self.neighborhood.reset();
        self.exact_layer.reset();
        self.drag = None;
        tracing::debug!("deselected all nodes");
    }

    fn deselect_node(&mut self, model: &mut GraphModel, index: usize) {
        let node = &mut model.nodes[index];
        node.deselect();
        if self.neighborhood.is_source(&node.id) {
            self.neighborhood.depth = 0;
        }
        if self.exact_layer.is_source(&node.id) {
            self.exact_layer.depth = 0;
        }
    }

    fn select_neighborhood(&mut self, model: &mut GraphModel, index: usize) {
        let node = &model.nodes[index];
        if !node.selected || !self.neighborhood.is_source(&node.id) || self.neighborhood.depth == 0 {
            self.neighborhood = Anchor {
                source: Some(node.id.clone()),
                depth: 1,
            };
        } else {
            self.neighborhood.depth = (self.neighborhood.depth + 1).min(model.nodes.len().max(1));
        }

        model.nodes[index].select_and_pin();
        let reached = nodes_within(model.adjacency(), index, self.neighborhood.depth);
        for &other in &reached {
            model.nodes[other].select_and_pin();
        }
        tracing::debug!(
            source = %model.nodes[index].id,
            depth = self.neighborhood.depth,
            reached = reached.len(),
            "neighborhood selection"
        );
    }

    fn select_exact_layer(&mut self, model: &mut GraphModel, index: usize) {
        let node = &model.nodes[index];
        if !node.selected || !self.exact_layer.is_source(&node.id) || self.exact_layer.depth == 0 {
            self.exact_layer = Anchor {
                source: Some(node.id.clone()),
                depth: 1,
            };
        } else {
            self.exact_layer.depth = (self.exact_layer.depth + 1).min(model.nodes.len().max(1));
        }

        for other in 0..model.nodes.len() {
            if other != index && model.nodes[other].selected {
                self.deselect_node(model, other);
            }
            if other != index {
                // stale pins from an interrupted drag go too
                model.nodes[other].fixed_position = None;
            }
        }

        model.nodes[index].select_and_pin();
        let frontier = nodes_at_layer(model.adjacency(), index, self.exact_layer.depth);
        for &other in &frontier {
            model.nodes[other].select_and_pin();
        }
        tracing::debug!(
            source = %model.nodes[index].id,
            layer = self.exact_layer.depth,
            selected = frontier.len(),
            "exact layer selection"
        );
    }

    fn drag_start(&mut self, model: &mut GraphModel, index: usize) {
        let Some(node) = model.nodes.get_mut(index) else {
            tracing::warn!(node = index, "drag start on unknown node index");
            return;
        };
        node.select_and_pin();
        let start = node.fixed_position.unwrap_or(Vec2::ZERO);

        let group_starts = model
            .nodes
            .iter()
            .enumerate()
            .filter(|(other, node)| *other != index && node.selected)
            .filter_map(|(other, node)| {
                node.fixed_position
                    .or(node.position)
                    .map(|position| (other, position))
            })
            .collect();

        self.drag = Some(DragSession {
            node: index,
            start,
            group_starts,
        });
    }

    fn drag_move(&mut self, model: &mut GraphModel, index: usize, position: Vec2, group: bool) {
        let Some(drag) = self.drag.as_ref().filter(|drag| drag.node == index) else {
            return;
        };
        if index >= model.nodes.len() {
            return;
        }

        model.nodes[index].pin_at(position);
        if !group {
            return;
        }

        let delta = position - drag.start;
        for &(other, start) in &drag.group_starts {
            if let Some(node) = model.nodes.get_mut(other)
                && node.selected
            {
                node.pin_at(start + delta);
            }
        }
    }

    fn drag_end(&mut self, model: &mut GraphModel, index: usize, position: Vec2) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if drag.node != index {
            tracing::warn!(expected = drag.node, found = index, "drag ended on a different node");
        }
        if let Some(node) = model.nodes.get_mut(drag.node) {
            node.selected = true;
            node.pin_at(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use eframe::egui::vec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::graph::{GraphPayload, RawEdge, RawNode, bfs_layers};

    fn path_graph() -> GraphModel {
        let payload = GraphPayload {
            nodes: ["A", "B", "C", "D"]
                .into_iter()
                .map(|id| RawNode::new(id, id))
                .collect(),
            edges: vec![
                RawEdge::new("A", "B", "x"),
                RawEdge::new("B", "C", "x"),
                RawEdge::new("C", "D", "x"),
            ],
        };
        let mut model = GraphModel::build(&payload, None);
        for (index, node) in model.nodes.iter_mut().enumerate() {
            node.position = Some(vec2(index as f32 * 10.0, 0.0));
        }
        model
    }

    fn selected(model: &GraphModel) -> BTreeSet<String> {
        model
            .nodes
            .iter()
            .filter(|node| node.selected)
            .map(|node| node.id.clone())
            .collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn assert_pins_match_selection(model: &GraphModel) {
        for node in &model.nodes {
            assert_eq!(node.selected, node.is_pinned(), "node {} out of sync", node.id);
        }
    }

    fn click(node: usize, mode: ClickMode) -> Interaction {
        Interaction::ClickNode { node, mode }
    }

    #[test]
    fn plain_click_selects_and_pins_in_place() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();

        assert_eq!(selection.apply(&mut model, click(2, ClickMode::Plain)), None);

        assert!(model.nodes[2].selected);
        assert_eq!(model.nodes[2].fixed_position, Some(vec2(20.0, 0.0)));
    }

    #[test]
    fn repeated_neighborhood_clicks_grow_depth() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();

        let reheat = selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        assert_eq!(reheat, Some(Reheat::Gentle));
        assert_eq!(selected(&model), set(&["A", "B"]));
        assert_eq!(selection.neighborhood_anchor().depth, 1);

        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        assert_eq!(selected(&model), set(&["A", "B", "C"]));
        assert_eq!(selection.neighborhood_anchor().depth, 2);
        assert_pins_match_selection(&model);
    }

    #[test]
    fn neighborhood_resets_on_a_different_node() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();

        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        selection.apply(&mut model, click(3, ClickMode::Neighborhood));

        assert_eq!(selection.neighborhood_anchor().source.as_deref(), Some("D"));
        assert_eq!(selection.neighborhood_anchor().depth, 1);
    }

    #[test]
    fn neighborhood_keeps_existing_pins() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        model.nodes[1].position = Some(vec2(5.0, 5.0));
        model.nodes[1].select_and_pin();
        model.nodes[1].position = Some(vec2(99.0, 99.0));

        selection.apply(&mut model, click(0, ClickMode::Neighborhood));

        assert_eq!(model.nodes[1].fixed_position, Some(vec2(5.0, 5.0)));
    }

    #[test]
    fn neighborhood_expansion_is_monotone_and_adds_next_layer() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();

        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        let mut previous = selected(&model);
        for depth in 2..=4 {
            selection.apply(&mut model, click(0, ClickMode::Neighborhood));
            let current = selected(&model);
            assert!(previous.is_subset(&current));

            let layers = bfs_layers(model.adjacency(), 0, depth);
            let expected_new = layers
                .get(depth - 1)
                .map(|layer| {
                    layer
                        .iter()
                        .map(|&index| model.nodes[index].id.clone())
                        .collect::<BTreeSet<_>>()
                })
                .unwrap_or_default();
            let added = current.difference(&previous).cloned().collect::<BTreeSet<_>>();
            assert_eq!(added, expected_new);
            previous = current;
        }
    }

    #[test]
    fn exact_layer_selects_only_the_frontier() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(3, ClickMode::Plain));

        selection.apply(&mut model, click(0, ClickMode::ExactLayer));
        assert_eq!(selected(&model), set(&["A", "B"]));

        selection.apply(&mut model, click(0, ClickMode::ExactLayer));
        assert_eq!(selected(&model), set(&["A", "C"]));
        assert_eq!(selection.exact_layer_anchor().depth, 2);

        selection.apply(&mut model, click(0, ClickMode::ExactLayer));
        assert_eq!(selected(&model), set(&["A", "D"]));
        assert_pins_match_selection(&model);
    }

    #[test]
    fn shift_click_resets_the_anchor_it_deselects() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        selection.apply(&mut model, click(0, ClickMode::Neighborhood));

        let reheat = selection.apply(&mut model, click(0, ClickMode::Deselect));

        assert_eq!(reheat, Some(Reheat::Moderate));
        assert!(!model.nodes[0].selected);
        assert!(model.nodes[0].fixed_position.is_none());
        assert_eq!(selection.neighborhood_anchor().depth, 0);

        selection.apply(&mut model, click(0, ClickMode::Neighborhood));
        assert_eq!(selection.neighborhood_anchor().depth, 1);
    }

    #[test]
    fn shift_click_background_clears_everything() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(1, ClickMode::Neighborhood));
        selection.apply(&mut model, click(2, ClickMode::ExactLayer));

        let reheat = selection.apply(
            &mut model,
            Interaction::ClickBackground {
                mode: ClickMode::Deselect,
            },
        );

        assert_eq!(reheat, Some(Reheat::Major));
        assert!(selected(&model).is_empty());
        assert!(model.nodes.iter().all(|node| !node.is_pinned()));
        assert_eq!(selection.neighborhood_anchor(), &Anchor::default());
        assert_eq!(selection.exact_layer_anchor(), &Anchor::default());
    }

    #[test]
    fn plain_background_click_is_ignored() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(1, ClickMode::Plain));
        let reheat = selection.apply(
            &mut model,
            Interaction::ClickBackground {
                mode: ClickMode::Plain,
            },
        );
        assert_eq!(reheat, None);
        assert_eq!(selected(&model), set(&["B"]));
    }

    #[test]
    fn group_drag_applies_cumulative_offset_from_start() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(1, ClickMode::Plain));
        selection.apply(&mut model, click(3, ClickMode::Plain));

        selection.apply(&mut model, Interaction::DragStart { node: 0 });
        assert!(selection.is_dragging());
        for step in [vec2(3.0, 1.0), vec2(-40.0, 17.0), vec2(12.5, -6.0)] {
            selection.apply(
                &mut model,
                Interaction::DragMove {
                    node: 0,
                    position: step,
                    group: true,
                },
            );
        }
        selection.apply(
            &mut model,
            Interaction::DragEnd {
                node: 0,
                position: vec2(12.5, -6.0),
            },
        );

        let delta = vec2(12.5, -6.0) - vec2(0.0, 0.0);
        assert_eq!(model.nodes[0].fixed_position, Some(vec2(12.5, -6.0)));
        assert_eq!(model.nodes[1].fixed_position, Some(vec2(10.0, 0.0) + delta));
        assert_eq!(model.nodes[3].fixed_position, Some(vec2(30.0, 0.0) + delta));
        assert!(model.nodes[2].fixed_position.is_none());
        assert!(!selection.is_dragging());
        assert_pins_match_selection(&model);
    }

    #[test]
    fn drag_without_group_moves_only_the_dragged_node() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        selection.apply(&mut model, click(1, ClickMode::Plain));

        selection.apply(&mut model, Interaction::DragStart { node: 2 });
        selection.apply(
            &mut model,
            Interaction::DragMove {
                node: 2,
                position: vec2(50.0, 50.0),
                group: false,
            },
        );

        assert_eq!(model.nodes[1].fixed_position, Some(vec2(10.0, 0.0)));
        assert_eq!(model.nodes[2].fixed_position, Some(vec2(50.0, 50.0)));
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut model = path_graph();
        let mut selection = SelectionController::new();
        assert_eq!(selection.apply(&mut model, click(42, ClickMode::Neighborhood)), None);
        assert_eq!(selection.apply(&mut model, Interaction::DragStart { node: 42 }), None);
        assert!(!selection.is_dragging());
        assert!(selected(&model).is_empty());
    }

    #[test]
    fn pins_track_selection_under_random_interaction_sequences() {
        let mut rng = StdRng::seed_from_u64(0x5e1ec7);
        let payload = GraphPayload {
            nodes: (0..24).map(|i| RawNode::new(format!("n{i}"), "n")).collect(),
            edges: (0..40)
                .map(|i| RawEdge::new(format!("n{}", (i * 7) % 24), format!("n{}", (i * 5 + 3) % 24), "x"))
                .collect(),
        };
        let mut model = GraphModel::build(&payload, None);
        for (index, node) in model.nodes.iter_mut().enumerate() {
            node.position = Some(vec2(index as f32, (index * 3) as f32));
        }
        let mut selection = SelectionController::new();
        let modes = [
            ClickMode::Plain,
            ClickMode::Deselect,
            ClickMode::Neighborhood,
            ClickMode::ExactLayer,
        ];

        for _ in 0..2_000 {
            let node = rng.random_range(0..model.nodes.len());
            let mode = modes[rng.random_range(0..modes.len())];
            match rng.random_range(0..6) {
                0 => {
                    selection.apply(&mut model, Interaction::ClickBackground { mode });
                }
                1 => {
                    selection.apply(&mut model, Interaction::DragStart { node });
                    let target = vec2(rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0));
                    selection.apply(
                        &mut model,
                        Interaction::DragMove {
                            node,
                            position: target,
                            group: rng.random_bool(0.5),
                        },
                    );
                    selection.apply(&mut model, Interaction::DragEnd { node, position: target });
                }
                _ => {
                    selection.apply(&mut model, click(node, mode));
                }
            }
            assert_pins_match_selection(&model);
        }
    }
}
